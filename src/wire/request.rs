//! Request parsing: the verb grammar.

use crate::wire::framing::{read_decimal, read_exact_bytes, read_until_whitespace, read_verb, ProtocolError};
use std::io::Read;

/// A fully-parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Put { label: Vec<u8>, data: Vec<u8> },
    Get { pattern: Vec<u8> },
    Getc { pattern: Vec<u8> },
    Dump,
    Dumpc,
    Save,
    Discon,
    Quit,
}

/// Reads one request off `stream`. `Err(ProtocolError::Eof)` signals a
/// clean client disconnect at a request boundary, not a violation.
pub fn read_request<R: Read>(stream: &mut R) -> Result<Request, ProtocolError> {
    let verb = read_verb(stream)?;
    match verb.as_str() {
        "put" => read_put(stream),
        "get" => Ok(Request::Get { pattern: read_length_prefixed(stream)? }),
        "getc" => Ok(Request::Getc { pattern: read_length_prefixed(stream)? }),
        "dump" => Ok(Request::Dump),
        "dumpc" => Ok(Request::Dumpc),
        "save" => Ok(Request::Save),
        "discon" => Ok(Request::Discon),
        "quit" => Ok(Request::Quit),
        other => Err(ProtocolError::InvalidVerb(other.to_string())),
    }
}

/// `LEN payload` where `LEN` is a decimal field and `payload` is exactly
/// `LEN` raw bytes (used by `get`/`getc`'s query and `put`'s label/data).
fn read_length_prefixed<R: Read>(stream: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let len = read_decimal(stream)?;
    read_exact_bytes(stream, len as usize)
}

fn read_put<R: Read>(stream: &mut R) -> Result<Request, ProtocolError> {
    let label = read_length_prefixed(stream)?;
    expect_whitespace(stream)?;
    let data = read_length_prefixed(stream)?;
    Ok(Request::Put { label, data })
}

/// The `put` grammar separates LABEL from DATA_LEN with exactly one
/// whitespace byte, read separately from the length-prefixed fields on
/// either side of it.
fn expect_whitespace<R: Read>(stream: &mut R) -> Result<(), ProtocolError> {
    let ws = read_until_whitespace(stream, 1)?;
    if ws.len() == 1 && ws[0].is_ascii_whitespace() {
        Ok(())
    } else {
        Err(ProtocolError::ExpectedWhitespace)
    }
}
