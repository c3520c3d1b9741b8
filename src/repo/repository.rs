//! Repository: composes the growable buffers, document table, and
//! suffix array into `add`/`query`/`count`/`dump`.

use crate::repo::buffer::GrowableBuffer;
use crate::repo::documents::{Document, DocumentTable};
use crate::repo::suffix_array::OnlineSuffixArray;

/// An occurrence of a query pattern: the document it starts in, and the
/// byte offset within that document's data (not the global text buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub doc_index: usize,
    pub offset: u32,
}

/// Resource exhaustion: `add` failed to grow a buffer to fit the
/// new document. Surfaced to the request as `NG`; the connection and
/// the server continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoError {
    OutOfMemory,
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoError::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

impl std::error::Error for RepoError {}

/// The in-memory document store: label/text buffers, the document
/// table, and (when enabled) the online suffix-array index over all
/// token-start positions.
///
/// `add` requires exclusive access; every other method only reads.
/// Callers sharing a `Repository` across threads are expected to wrap it
/// in a reader-writer lock (see `server::connection`).
pub struct Repository {
    labels: GrowableBuffer,
    data: GrowableBuffer,
    docs: DocumentTable,
    suffix_array: OnlineSuffixArray,
    use_index: bool,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    /// Creates an empty repository with the suffix-array index enabled.
    pub fn new() -> Self {
        Self {
            labels: GrowableBuffer::new(),
            data: GrowableBuffer::new(),
            docs: DocumentTable::new(),
            suffix_array: OnlineSuffixArray::new(),
            use_index: true,
        }
    }

    /// Creates an empty repository in brute-force fallback mode, a
    /// reference/oracle used by differential tests.
    pub fn new_without_index() -> Self {
        Self {
            use_index: false,
            ..Self::new()
        }
    }

    /// Appends `label` and `data` as a new document and, when indexing
    /// is enabled, indexes its token-start suffixes. Returns the new
    /// document's index, or [`RepoError`] if a buffer could not be
    /// grown to fit it (the resource exhaustion case).
    pub fn add(&mut self, label: &[u8], data: &[u8]) -> Result<usize, RepoError> {
        let label_offset = self.labels.try_append(label).map_err(|_| RepoError::OutOfMemory)?;
        let data_offset = self.data.try_append(data).map_err(|_| RepoError::OutOfMemory)?;
        let idx = self.docs.push(Document {
            label_offset,
            label_length: label.len() as u32,
            data_offset,
            data_length: data.len() as u32,
        });
        if self.use_index {
            self.index_suffixes(data_offset, data.len() as u32);
        }
        Ok(idx)
    }

    /// The token-start rule, preserved verbatim from the source:
    /// a document-relative position `i` is an indexable suffix start iff
    /// `i == 0`, or the byte there is a multi-byte UTF-8 leading byte
    /// (top two bits `11`), or it is ASCII and the previous byte is
    /// ASCII whitespace.
    fn is_token_start(data: &[u8], i: usize) -> bool {
        if i == 0 {
            return true;
        }
        let byte = data[i];
        if byte >> 6 == 0b11 {
            return true;
        }
        byte >> 7 == 0 && data[i - 1].is_ascii_whitespace()
    }

    fn index_suffixes(&mut self, base: u32, len: u32) {
        let data = self.data.slice(base, len).to_vec();
        for i in 0..data.len() {
            if Self::is_token_start(&data, i) {
                self.suffix_array.insert(base + i as u32, &self.data, &self.docs);
            }
        }
    }

    /// Number of documents stored.
    pub fn n_docs(&self) -> usize {
        self.docs.len()
    }

    /// Returns every occurrence of `pattern`, in suffix-array order when
    /// indexed, or document order in fallback mode (the two modes
    /// agree as sets, not as sequences).
    pub fn query(&self, pattern: &[u8]) -> Vec<Occurrence> {
        if self.use_index {
            self.query_indexed(pattern)
        } else {
            self.query_fallback(pattern)
        }
    }

    /// Same occurrences as [`query`](Self::query), but only the count.
    pub fn count(&self, pattern: &[u8]) -> usize {
        self.query(pattern).len()
    }

    fn query_indexed(&self, pattern: &[u8]) -> Vec<Occurrence> {
        let (begin, end) = self.suffix_array.range(pattern, &self.data, &self.docs);
        let slots = &self.suffix_array.slots()[begin..end];
        let mut out = Vec::new();
        for (i, &offset) in slots.iter().enumerate() {
            if i > 0 && slots[i - 1] == offset {
                continue; // collapse duplicate runs
            }
            let (doc_index, doc) = self.docs.index_by_text_offset(offset);
            if offset + pattern.len() as u32 <= doc.data_offset + doc.data_length {
                out.push(Occurrence {
                    doc_index,
                    offset: offset - doc.data_offset,
                });
            }
        }
        out
    }

    /// Binary-safe brute-force substring search per document, advancing
    /// one byte past each match start so overlapping matches are found.
    /// This is the `use_index == false` oracle mode.
    fn query_fallback(&self, pattern: &[u8]) -> Vec<Occurrence> {
        let mut out = Vec::new();
        if pattern.is_empty() {
            // An empty pattern matches at every position; fallback mode
            // still only reports token-start positions so it agrees
            // with the indexed mode's set of occurrences.
            for (doc_index, doc) in self.docs.iter().enumerate() {
                let text = self.data.slice(doc.data_offset, doc.data_length);
                for i in 0..text.len() {
                    if Self::is_token_start(text, i) {
                        out.push(Occurrence {
                            doc_index,
                            offset: i as u32,
                        });
                    }
                }
            }
            return out;
        }
        for (doc_index, doc) in self.docs.iter().enumerate() {
            let text = self.data.slice(doc.data_offset, doc.data_length);
            let mut start = 0usize;
            while start < text.len() {
                match memchr::memmem::find(&text[start..], pattern) {
                    Some(rel) => {
                        let pos = start + rel;
                        let i = pos;
                        if Self::is_token_start(text, i) {
                            out.push(Occurrence {
                                doc_index,
                                offset: pos as u32,
                            });
                        }
                        start = pos + 1;
                    }
                    None => break,
                }
            }
        }
        out
    }

    /// Returns `(document_index, label, data)` for every document, in
    /// insertion order.
    pub fn dump(&self) -> Vec<(usize, &[u8], &[u8])> {
        self.docs
            .iter()
            .enumerate()
            .map(|(i, d)| {
                (
                    i,
                    self.labels.slice(d.label_offset, d.label_length),
                    self.data.slice(d.data_offset, d.data_length),
                )
            })
            .collect()
    }

    /// Returns the label and data slice of a single document.
    pub fn document_bytes(&self, idx: usize) -> (&[u8], &[u8]) {
        let d = self.docs.get(idx);
        (
            self.labels.slice(d.label_offset, d.label_length),
            self.data.slice(d.data_offset, d.data_length),
        )
    }

    /// The full data slice for document `doc_index`, used by the wire
    /// layer to carve snippets around an occurrence.
    pub fn document_data(&self, doc_index: usize) -> &[u8] {
        let d = self.docs.get(doc_index);
        self.data.slice(d.data_offset, d.data_length)
    }

    /// The label bytes for document `doc_index`.
    pub fn document_label(&self, doc_index: usize) -> &[u8] {
        let d = self.docs.get(doc_index);
        self.labels.slice(d.label_offset, d.label_length)
    }
}
