//! End-to-end server tests: binds a real `Listener` on `127.0.0.1:0`,
//! drives it over an actual `TcpStream`, and exercises the end-to-end scenarios
//! plus the documented boundary cases.

use himono::logsink::LogSink;
use himono::server::{Config, Listener};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

fn start_server() -> (SocketAddr, std::thread::JoinHandle<()>) {
    let config = Config {
        port: 0,
        backlog: 128,
        threaded: false,
        data_dir: std::env::temp_dir(),
    };
    let listener = Listener::bind(config, Arc::new(LogSink::disabled())).unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || listener.run());
    (addr, handle)
}

fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream
}

fn send(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).unwrap();
}

fn recv_line(stream: &mut TcpStream) -> String {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).unwrap();
        assert_ne!(n, 0, "connection closed before a full line was read");
        out.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    String::from_utf8(out).unwrap()
}

fn recv_exact(stream: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    stream.read_exact(&mut buf).unwrap();
    buf
}

fn put(stream: &mut TcpStream, label: &[u8], data: &[u8]) -> usize {
    send(stream, b"put ");
    send(stream, label.len().to_string().as_bytes());
    send(stream, b" ");
    send(stream, label);
    send(stream, b" ");
    send(stream, data.len().to_string().as_bytes());
    send(stream, b" ");
    send(stream, data);
    let line = recv_line(stream);
    assert!(line.starts_with("OK "), "unexpected reply to put: {line}");
    line.trim_start_matches("OK ").trim().parse().unwrap()
}

fn getc(stream: &mut TcpStream, pattern: &[u8]) -> usize {
    send(stream, b"getc ");
    send(stream, pattern.len().to_string().as_bytes());
    send(stream, b" ");
    send(stream, pattern);
    let line = recv_line(stream);
    assert!(line.starts_with("OK "), "unexpected reply to getc: {line}");
    line.trim_start_matches("OK ").trim().parse().unwrap()
}

struct GetRecord {
    label: Vec<u8>,
    offset: u32,
    snippet: Vec<u8>,
}

fn get(stream: &mut TcpStream, pattern: &[u8]) -> Vec<GetRecord> {
    send(stream, b"get ");
    send(stream, pattern.len().to_string().as_bytes());
    send(stream, b" ");
    send(stream, pattern);
    let header = recv_line(stream);
    assert!(header.starts_with("OK "));
    let n: usize = header.trim_start_matches("OK ").trim().parse().unwrap();
    let mut records = Vec::new();
    for _ in 0..n {
        let label_len = read_decimal_field(stream);
        let label = recv_exact(stream, label_len);
        assert_eq!(recv_exact(stream, 1), b" ");
        let offset = read_decimal_field(stream) as u32;
        let snippet_len = read_decimal_field(stream);
        let snippet = recv_exact(stream, snippet_len);
        assert_eq!(recv_exact(stream, 1), b"\n");
        records.push(GetRecord { label, offset, snippet });
    }
    let terminator = recv_line(stream);
    assert_eq!(terminator, "0\n");
    records
}

fn read_decimal_field(stream: &mut TcpStream) -> usize {
    let mut digits = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).unwrap();
        if byte[0] == b' ' {
            break;
        }
        digits.push(byte[0]);
    }
    std::str::from_utf8(&digits).unwrap().parse().unwrap()
}

#[test]
fn scenario_1_bc_occurs_twice_in_abcabc() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    put(&mut c, b"a", b"abcabc");
    assert_eq!(getc(&mut c, b"bc"), 2);
    send(&mut c, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn scenario_2_token_start_rule_across_two_documents() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    put(&mut c, b"l1", b"foo bar");
    put(&mut c, b"l2", b"bar foo");
    assert_eq!(getc(&mut c, b"bar"), 2);
    send(&mut c, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn scenario_3_multibyte_utf8_leading_byte_is_selectable() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    put(&mut c, b"x", "野球".as_bytes());
    assert_eq!(getc(&mut c, "球".as_bytes()), 1);
    send(&mut c, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn scenario_4_patterns_never_cross_a_document_boundary() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    put(&mut c, b"", b"ab");
    put(&mut c, b"", b"cd");
    assert_eq!(getc(&mut c, b"bc"), 0);
    send(&mut c, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn scenario_5_dumpc_after_three_puts() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    put(&mut c, b"1", b"x");
    put(&mut c, b"2", b"y");
    put(&mut c, b"3", b"z");
    send(&mut c, b"dumpc\n");
    let line = recv_line(&mut c);
    assert_eq!(line, "OK 3\n");
    send(&mut c, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn scenario_6_get_snippet_window_and_match_position() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    let data = b"this is the prefix foo the suffix words here";
    put(&mut c, b"doc", data);
    let records = get(&mut c, b"foo");
    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!(rec.snippet.len(), 3 + 24);
    // the match starts 12 bytes into the snippet when not clipped
    assert_eq!(&rec.snippet[12..15], b"foo");
    send(&mut c, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn dump_lists_every_document_verbatim() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    put(&mut c, b"first", b"hello");
    put(&mut c, b"second", b"world");
    send(&mut c, b"dump\n");
    let header = recv_line(&mut c);
    assert_eq!(header, "OK 2\n");
    for (label, data) in [(&b"first"[..], &b"hello"[..]), (&b"second"[..], &b"world"[..])] {
        let label_len = read_decimal_field(&mut c);
        let got_label = recv_exact(&mut c, label_len);
        assert_eq!(got_label, label);
        assert_eq!(recv_exact(&mut c, 1), b" ");
        let data_len = read_decimal_field(&mut c);
        let got_data = recv_exact(&mut c, data_len);
        assert_eq!(got_data, data);
        assert_eq!(recv_exact(&mut c, 1), b"\n");
    }
    let terminator = recv_line(&mut c);
    assert_eq!(terminator, "0\n");
    send(&mut c, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn boundary_0xff_pattern_has_no_successor() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    put(&mut c, b"x", &[0xFFu8, 0xFF, 0xFF]);
    assert_eq!(getc(&mut c, &[0xFF]), 3);
    send(&mut c, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn boundary_zero_length_document_indexes_nothing() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    put(&mut c, b"empty", b"");
    assert_eq!(getc(&mut c, b"x"), 0);
    send(&mut c, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn discon_ends_the_connection_without_a_response() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    put(&mut c, b"a", b"hello");
    send(&mut c, b"discon ");
    let mut byte = [0u8; 1];
    let n = c.read(&mut byte).unwrap();
    assert_eq!(n, 0, "discon must not send a response");

    // a fresh connection still sees the document that was put earlier
    let mut c2 = connect(addr);
    assert_eq!(getc(&mut c2, b"hello"), 1);
    send(&mut c2, b"quit\n");
    handle.join().unwrap();
}

#[test]
fn unknown_verb_terminates_the_connection_without_a_response() {
    let (addr, handle) = start_server();
    let mut c = connect(addr);
    send(&mut c, b"bogus \n");
    let mut byte = [0u8; 1];
    let n = c.read(&mut byte).unwrap();
    assert_eq!(n, 0);

    let mut c2 = connect(addr);
    send(&mut c2, b"quit\n");
    handle.join().unwrap();
}
