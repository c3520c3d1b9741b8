//! Response encoding: success counts, `NG` failures, and the `get`/`dump`
//! record streams, grounded on `himono_server.c`'s `send_ok_and_num`/
//! `send_ng`/`connection_handle_get`/`connection_handle_dump`.

use crate::wire::framing::{write_all_bytes, ProtocolError};
use std::io::Write;

/// Bytes of context kept before/after a match in a `get` snippet.
pub const SNIPPET_MARGIN: usize = 12;

/// Writes `OK <n>\n`.
pub fn write_ok_count<W: Write>(w: &mut W, n: usize) -> Result<(), ProtocolError> {
    write_all_bytes(w, format!("OK {n}\n").as_bytes())
}

/// Writes `NG <reason>\n`.
pub fn write_ng<W: Write>(w: &mut W, reason: &str) -> Result<(), ProtocolError> {
    write_all_bytes(w, format!("NG {reason}\n").as_bytes())
}

/// One `get` result record: `LABEL_LEN LABEL <offset> SNIPPET_LEN
/// SNIPPET\n`.
pub fn write_get_record<W: Write>(
    w: &mut W,
    label: &[u8],
    offset: u32,
    snippet: &[u8],
) -> Result<(), ProtocolError> {
    write_all_bytes(w, format!("{} ", label.len()).as_bytes())?;
    write_all_bytes(w, label)?;
    write_all_bytes(w, format!(" {} {} ", offset, snippet.len()).as_bytes())?;
    write_all_bytes(w, snippet)?;
    write_all_bytes(w, b"\n")
}

/// One `dump` result record: `LABEL_LEN LABEL DATA_LEN DATA\n`.
pub fn write_dump_record<W: Write>(w: &mut W, label: &[u8], data: &[u8]) -> Result<(), ProtocolError> {
    write_all_bytes(w, format!("{} ", label.len()).as_bytes())?;
    write_all_bytes(w, label)?;
    write_all_bytes(w, format!(" {} ", data.len()).as_bytes())?;
    write_all_bytes(w, data)?;
    write_all_bytes(w, b"\n")
}

/// Terminator for a `get`/`dump` record stream.
pub fn write_stream_terminator<W: Write>(w: &mut W) -> Result<(), ProtocolError> {
    write_all_bytes(w, b"0\n")
}

/// Computes the `[start, end)` snippet window around a match at
/// `occurrence` of length `pattern_len` within a document of
/// `doc_len` bytes: `[max(0, occ-12), min(doc_len, occ+plen+12))`.
pub fn snippet_bounds(occurrence: u32, pattern_len: usize, doc_len: u32) -> (u32, u32) {
    let start = occurrence.saturating_sub(SNIPPET_MARGIN as u32);
    let end = (occurrence + pattern_len as u32 + SNIPPET_MARGIN as u32).min(doc_len);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_is_clipped_at_document_start() {
        let (start, end) = snippet_bounds(0, 3, 100);
        assert_eq!(start, 0);
        assert_eq!(end, 15);
    }

    #[test]
    fn snippet_is_clipped_at_document_end() {
        let (start, end) = snippet_bounds(95, 3, 100);
        assert_eq!(end, 100);
        assert_eq!(start, 83);
    }

    #[test]
    fn snippet_width_is_pattern_plus_24_when_unclipped() {
        let (start, end) = snippet_bounds(50, 3, 1000);
        assert_eq!(end - start, 3 + 24);
        assert_eq!(50 - start, 12);
    }

    #[test]
    fn get_record_round_trips_through_a_buffer() {
        let mut buf = Vec::new();
        write_get_record(&mut buf, b"lbl", 7, b"snip").unwrap();
        assert_eq!(buf, b"3 lbl 7 4 snip\n");
    }

    #[test]
    fn ok_count_and_ng_formatting() {
        let mut buf = Vec::new();
        write_ok_count(&mut buf, 3).unwrap();
        assert_eq!(buf, b"OK 3\n");
        buf.clear();
        write_ng(&mut buf, "out of memory").unwrap();
        assert_eq!(buf, b"NG out of memory\n");
    }
}
