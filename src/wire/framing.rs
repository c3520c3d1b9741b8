//! Length-prefixed, binary-safe framing primitives, grounded on
//! `himono_server.c`'s `recv_bytes`/`recv_until_ws`/`recv_num` and
//! `send_bytes`/`send_num`.

use std::io::{self, Read, Write};

/// Maximum bytes read while scanning for a verb (`put`, `get`, ...).
pub const MAX_INST_LEN: usize = 20;
/// Maximum digits read while scanning a decimal length field.
pub const MAX_NUM_LEN: usize = 20;
/// Upper bound on any single length-prefixed payload. Every buffer
/// offset in `repo` is a `u32`, so a payload past this size could never
/// be addressed even if it were accepted; rejecting it here means a
/// client-supplied length never reaches an allocation attempt.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// A framing-level failure. Every variant except [`Eof`](Self::Eof)
/// corresponds to a protocol violation: the connection is
/// terminated without a response, and one log line is written.
#[derive(Debug)]
pub enum ProtocolError {
    /// Clean disconnect at a request boundary (zero bytes read before
    /// any data was consumed for this request). Not an error: the
    /// connection simply ended.
    Eof,
    /// A positive-length read came up short at EOF.
    UnexpectedEof,
    /// A verb or decimal field exceeded its maximum length without a
    /// terminating whitespace byte, or a payload length field named more
    /// bytes than the server will ever allocate for one field.
    TooLong,
    /// A decimal length field didn't parse as a non-negative integer.
    InvalidNumber,
    /// An unrecognized verb.
    InvalidVerb(String),
    /// A byte where whitespace was required.
    ExpectedWhitespace,
    Io(io::Error),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Eof => write!(f, "connection closed"),
            ProtocolError::UnexpectedEof => write!(f, "premature end of stream"),
            ProtocolError::TooLong => write!(f, "field exceeded maximum length"),
            ProtocolError::InvalidNumber => write!(f, "invalid decimal length field"),
            ProtocolError::InvalidVerb(v) => write!(f, "invalid command [{v}]"),
            ProtocolError::ExpectedWhitespace => write!(f, "expected a whitespace separator"),
            ProtocolError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        ProtocolError::Io(e)
    }
}

/// Reads one byte at a time until an ASCII-whitespace byte is seen or
/// `max` bytes have been consumed, whichever comes first. The returned
/// buffer includes the terminating whitespace byte.
pub fn read_until_whitespace<R: Read>(stream: &mut R, max: usize) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::with_capacity(max.min(64));
    let mut byte = [0u8; 1];
    while buf.len() < max {
        match stream.read(&mut byte) {
            Ok(0) => {
                return if buf.is_empty() {
                    Err(ProtocolError::Eof)
                } else {
                    Err(ProtocolError::UnexpectedEof)
                };
            }
            Ok(_) => {
                buf.push(byte[0]);
                if byte[0].is_ascii_whitespace() {
                    return Ok(buf);
                }
            }
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
    Err(ProtocolError::TooLong)
}

/// Reads exactly `len` bytes, looping over partial reads. A short read
/// at EOF (zero bytes returned before `len` is reached) is a protocol
/// violation: a positive length was already promised by the field that
/// preceded this payload.
///
/// `len` comes straight off the wire (`read_decimal` only checks that it
/// parses, not that it's reasonable), so this never allocates with the
/// panicking `vec![0u8; len]`: a length past [`MAX_PAYLOAD_LEN`] is
/// rejected outright, and the allocation itself goes through
/// `try_reserve_exact` so a length that passes that check but still
/// can't be satisfied comes back as an ordinary error instead of
/// aborting the process.
pub fn read_exact_bytes<R: Read>(stream: &mut R, len: usize) -> Result<Vec<u8>, ProtocolError> {
    if len > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::TooLong);
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| ProtocolError::TooLong)?;
    buf.resize(len, 0);
    let mut received = 0;
    while received < len {
        match stream.read(&mut buf[received..]) {
            Ok(0) => return Err(ProtocolError::UnexpectedEof),
            Ok(n) => received += n,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
    Ok(buf)
}

/// Reads a decimal ASCII length field terminated by one whitespace byte
/// (`recv_num` in the C source).
pub fn read_decimal<R: Read>(stream: &mut R) -> Result<u64, ProtocolError> {
    let raw = read_until_whitespace(stream, MAX_NUM_LEN)?;
    let digits = &raw[..raw.len() - 1];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(ProtocolError::InvalidNumber);
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or(ProtocolError::InvalidNumber)
}

/// Reads the verb token (`put`, `get`, ...), lowercased, with the
/// terminating whitespace stripped.
pub fn read_verb<R: Read>(stream: &mut R) -> Result<String, ProtocolError> {
    let raw = read_until_whitespace(stream, MAX_INST_LEN)?;
    let verb = &raw[..raw.len() - 1];
    Ok(String::from_utf8_lossy(verb).to_ascii_lowercase())
}

/// Sends all of `buf`, looping over partial writes.
pub fn write_all_bytes<W: Write>(stream: &mut W, buf: &[u8]) -> Result<(), ProtocolError> {
    stream.write_all(buf).map_err(ProtocolError::Io)
}
