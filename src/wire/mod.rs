//! Wire protocol codec: binary-safe, length-prefixed, text-framed
//! request/response encoding over a byte stream.

pub mod framing;
pub mod request;
pub mod response;

pub use framing::ProtocolError;
pub use request::{read_request, Request};
