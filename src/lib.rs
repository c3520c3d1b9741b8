//! # himono - a networked in-memory document repository
//!
//! `himono` ingests labeled text documents over a line-oriented TCP
//! protocol and answers substring queries against them in sublinear time,
//! even as documents are appended online. The engineering weight of the
//! crate sits in two places:
//!
//! - [`repo`] - the online suffix-array index over a single concatenated
//!   text buffer (growable byte buffer, document table, suffix array,
//!   repository).
//! - [`server`] - the connection-concurrent TCP layer that drives the
//!   repository: accept loop, per-connection dispatch, worker-thread
//!   reaping via a self-pipe.
//!
//! [`wire`] is the codec between the two: a binary-safe, length-prefixed
//! text protocol (`put`/`get`/`getc`/`dump`/`dumpc`/`save`/`discon`/`quit`).
//!
//! [`logsink`] and [`persist`] are thin ambient collaborators: an
//! append-only log destination and a `save`/`load` stub contract.
//!
//! ## Quick start
//!
//! ```
//! use himono::repo::Repository;
//!
//! let mut repo = Repository::new();
//! repo.add(b"example", b"abcabc").unwrap();
//! assert_eq!(repo.count(b"bc"), 2);
//! ```

pub mod logsink;
pub mod persist;
pub mod repo;
pub mod server;
pub mod wire;
