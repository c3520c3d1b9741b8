//! Append-only log sink: either a file opened in append mode, or a
//! disabled no-op when the configured path is empty. Writes are
//! best-effort, matching the C source's fire-and-forget `fprintf` calls
//! to `sv->log_wp` with no error checking.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

enum Sink {
    File(Mutex<File>),
    Disabled,
}

/// A line-oriented append-only log destination.
pub struct LogSink {
    sink: Sink,
}

impl LogSink {
    /// Opens `path` for appending. An empty path disables logging
    /// entirely (per the `-l ""` flag).
    pub fn open(path: &str) -> anyhow::Result<Self> {
        if path.is_empty() {
            return Ok(Self { sink: Sink::Disabled });
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(Path::new(path))?;
        Ok(Self {
            sink: Sink::File(Mutex::new(file)),
        })
    }

    /// A sink that discards everything, for tests and `-l ""`.
    pub fn disabled() -> Self {
        Self { sink: Sink::Disabled }
    }

    /// Appends one line. A write failure is swallowed: logging must
    /// never abort a request.
    pub fn log(&self, line: &str) {
        if let Sink::File(file) = &self.sink {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{line}");
                let _ = f.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_sink_never_panics() {
        let sink = LogSink::disabled();
        sink.log("this goes nowhere");
    }

    #[test]
    fn empty_path_disables_logging() {
        let sink = LogSink::open("").unwrap();
        sink.log("still nowhere");
    }

    #[test]
    fn writes_lines_to_an_append_mode_file() {
        let path = std::env::temp_dir().join(format!("himono-logsink-test-{}", std::process::id()));
        let path = path.to_string_lossy().to_string();
        let sink = LogSink::open(&path).unwrap();
        sink.log("first");
        sink.log("second");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
        let _ = std::fs::remove_file(&path);
    }
}
