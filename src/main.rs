//! `himono` server entry point: parses the CLI flags, opens the
//! log sink, binds the listener, and runs the accept loop until `quit`.

use anyhow::{Context, Result};
use clap::Parser;
use himono::logsink::LogSink;
use himono::persist;
use himono::server::{Config, Listener};
use std::path::PathBuf;

/// A networked in-memory document repository with a substring-search
/// index.
#[derive(Parser, Debug)]
#[command(name = "himono", about = "Networked in-memory document repository", disable_help_flag = true)]
struct Cli {
    /// Port the server listens on (0 = OS-assigned)
    #[arg(short = 'p', long = "port", default_value_t = 0)]
    port: u16,

    /// Length of the listen(2) backlog queue
    #[arg(short = 'q', long = "qlen", default_value_t = 1000)]
    qlen: i32,

    /// Log file; pass an empty string to disable logging
    #[arg(short = 'l', long = "log", default_value = "himono.log")]
    log: String,

    /// Directory used by `save`/`load`
    #[arg(short = 'd', long = "data-dir", default_value = "himono_data")]
    data_dir: PathBuf,

    /// Load persisted data from the data directory at startup
    #[arg(short = 'L', long = "load")]
    load: bool,

    /// Spawn one worker thread per connection instead of handling inline
    #[arg(short = 't', long = "thread", default_value_t = 0)]
    thread: u8,

    /// Print usage and exit
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("himono: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap's own help/version paths exit 0; anything else is a
            // usage error, exit 1.
            if e.exit_code() == 0 {
                print!("{e}");
                return Ok(0);
            }
            eprintln!("{e}");
            return Ok(1);
        }
    };

    if cli.help {
        print_usage();
        return Ok(0);
    }

    let log = std::sync::Arc::new(LogSink::open(&cli.log).context("opening log file")?);

    let config = Config {
        port: cli.port,
        backlog: cli.qlen,
        threaded: cli.thread != 0,
        data_dir: cli.data_dir.clone(),
    };

    let mut listener = Listener::bind(config, log.clone()).context("binding server socket")?;
    if cli.load {
        match persist::load(&cli.data_dir) {
            Ok(repo) => listener = listener.with_repository(repo),
            Err(e) => {
                eprintln!("himono: could not load data directory: {e}");
                return Ok(1);
            }
        }
    }

    eprintln!("server listening on port {}", listener.local_addr()?.port());
    listener.run();
    Ok(0)
}

fn print_usage() {
    eprintln!(
        "usage:\n\n\
         himono [options ...]\n\n\
         options:\n\
         \x20 -p PORT     : the port number the server listens to [0]\n\
         \x20 -q QLEN     : the length of the listen queue [1000]\n\
         \x20 -l LOG_FILE : log file. not generated if the empty string \"\" is given [himono.log]\n\
         \x20 -d DATA_DIR : directory used by save/load [himono_data]\n\
         \x20 -L          : load persisted data from DATA_DIR at startup\n\
         \x20 -t 0/1      : use a worker thread per connection or not [0]\n"
    );
}
