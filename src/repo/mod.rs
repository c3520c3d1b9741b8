//! The document repository: growable byte buffers, the document
//! table, the online suffix-array index, and the repository
//! that composes them.

pub mod buffer;
pub mod documents;
pub mod repository;
pub mod suffix_array;

pub use documents::{Document, DocumentTable};
pub use repository::{Occurrence, RepoError, Repository};
pub use suffix_array::OnlineSuffixArray;
