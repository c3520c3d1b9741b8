//! Per-connection dispatch: one request/response cycle at a time
//! against a shared [`Repository`], grounded on `himono_server.c`'s
//! `server_process_connection`/`connection_handle_*`.

use crate::logsink::LogSink;
use crate::persist;
use crate::repo::Repository;
use crate::wire::framing::ProtocolError;
use crate::wire::request::{read_request, Request};
use crate::wire::response::{
    snippet_bounds, write_dump_record, write_get_record, write_ng, write_ok_count,
    write_stream_terminator,
};
use std::io::{BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Outcome of handling one connection, distinguishing an orderly `quit`
/// from every other way the loop ends.
pub struct ConnectionOutcome {
    pub quit_requested: bool,
}

/// Reads and dispatches requests from `stream` until the client
/// disconnects, sends `discon`, sends `quit`, or a protocol/I-O error
/// occurs.
pub fn handle_connection(
    stream: TcpStream,
    repo: &Arc<RwLock<Repository>>,
    log: &Arc<LogSink>,
    data_dir: &Path,
) -> ConnectionOutcome {
    let peer = stream.peer_addr().ok();
    if let Some(addr) = peer {
        log.log(&format!("accepted connection from {addr}"));
    }
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return ConnectionOutcome { quit_requested: false },
    });
    let mut writer = BufWriter::new(stream);
    let mut quit_requested = false;

    loop {
        match read_request(&mut reader) {
            Ok(req) => match dispatch(req, &mut writer, repo, log, data_dir) {
                Ok(Disposition::Continue) => {
                    if writer.flush().is_err() {
                        break;
                    }
                }
                Ok(Disposition::Stop) => break,
                Ok(Disposition::Quit) => {
                    quit_requested = true;
                    break;
                }
                Err(_io_err) => break, // I/O error: connection closed, server continues
            },
            Err(ProtocolError::Eof) => break, // clean client disconnect
            Err(e) => {
                log.log(&format!("protocol violation: {e}"));
                break; // no response, connection terminated
            }
        }
    }
    ConnectionOutcome { quit_requested }
}

enum Disposition {
    Continue,
    Stop,
    Quit,
}

fn dispatch<W: Write>(
    req: Request,
    w: &mut W,
    repo: &Arc<RwLock<Repository>>,
    log: &Arc<LogSink>,
    data_dir: &Path,
) -> std::io::Result<Disposition> {
    match req {
        Request::Put { label, data } => {
            log.log(&format!(
                "put label[{}]=[{}] data[{}]=[...]",
                label.len(),
                String::from_utf8_lossy(&label),
                data.len()
            ));
            match repo.write().expect("repository lock poisoned").add(&label, &data) {
                Ok(idx) => write_ok_count(w, idx).map_err(io_err)?,
                Err(e) => write_ng(w, &e.to_string()).map_err(io_err)?,
            }
            Ok(Disposition::Continue)
        }
        Request::Getc { pattern } => {
            log.log(&format!("getc query[{}]=[{}]", pattern.len(), String::from_utf8_lossy(&pattern)));
            let c = repo.read().expect("repository lock poisoned").count(&pattern);
            write_ok_count(w, c).map_err(io_err)?;
            Ok(Disposition::Continue)
        }
        Request::Get { pattern } => {
            log.log(&format!("get query[{}]=[{}]", pattern.len(), String::from_utf8_lossy(&pattern)));
            let guard = repo.read().expect("repository lock poisoned");
            let occurrences = guard.query(&pattern);
            write_ok_count(w, occurrences.len()).map_err(io_err)?;
            for occ in &occurrences {
                let label = guard.document_label(occ.doc_index);
                let doc_data = guard.document_data(occ.doc_index);
                let (start, end) = snippet_bounds(occ.offset, pattern.len(), doc_data.len() as u32);
                let snippet = &doc_data[start as usize..end as usize];
                write_get_record(w, label, occ.offset, snippet).map_err(io_err)?;
            }
            write_stream_terminator(w).map_err(io_err)?;
            Ok(Disposition::Continue)
        }
        Request::Dump => {
            log.log("dump");
            let guard = repo.read().expect("repository lock poisoned");
            let docs = guard.dump();
            write_ok_count(w, docs.len()).map_err(io_err)?;
            for (_idx, label, data) in &docs {
                write_dump_record(w, label, data).map_err(io_err)?;
            }
            write_stream_terminator(w).map_err(io_err)?;
            Ok(Disposition::Continue)
        }
        Request::Dumpc => {
            log.log("dumpc");
            let n = repo.read().expect("repository lock poisoned").n_docs();
            write_ok_count(w, n).map_err(io_err)?;
            Ok(Disposition::Continue)
        }
        Request::Save => {
            log.log("save");
            let guard = repo.read().expect("repository lock poisoned");
            match persist::save(&guard, data_dir) {
                Ok(()) => write_ok_count(w, 1).map_err(io_err)?,
                Err(e) => write_ng(w, &e.0).map_err(io_err)?,
            }
            Ok(Disposition::Continue)
        }
        Request::Discon => {
            log.log("discon");
            Ok(Disposition::Stop)
        }
        Request::Quit => {
            log.log("quit");
            Ok(Disposition::Quit)
        }
    }
}

fn io_err(e: ProtocolError) -> std::io::Error {
    match e {
        ProtocolError::Io(io) => io,
        other => std::io::Error::other(other.to_string()),
    }
}
