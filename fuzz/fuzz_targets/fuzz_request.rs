#![no_main]

use himono::wire::request::read_request;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // The wire parser must never panic on arbitrary input; a malformed
    // request is always a protocol error, not undefined behavior.
    let mut cursor = Cursor::new(data.to_vec());
    let _ = read_request(&mut cursor);
});
