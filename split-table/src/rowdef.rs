//! The fixed row schema shared by every partition in one split table.
//!
//! All partitions in a split table agree on one [`RowDef`]: the total serialized size of a
//! row, the length of the primary key prefix, and the order used to compare keys (and, derived
//! from it, whole rows).

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A row, as stored on disk: a fixed-size byte string whose first `key_len` bytes are the
/// primary key. `Bytes` is used rather than `Vec<u8>` so that a shared row can be handed back
/// to callers without copying unless they ask for it (`get(key, force_copy)`).
pub type Row = bytes::Bytes;

/// A total order over primary keys, abstracted behind a trait object so callers can plug in a
/// domain-specific comparator (e.g. a numeric key stored big-endian) without touching the
/// dispatch or merge code.
pub trait KeyOrder: Send + Sync + fmt::Debug {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

/// Plain byte-lexicographic order; the default and by far the common case.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicographicOrder;

impl KeyOrder for LexicographicOrder {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

/// The fixed schema of every row in a split table.
#[derive(Clone)]
pub struct RowDef {
    /// Total serialized size of one row, in bytes.
    pub row_size: usize,
    /// Length, in bytes, of the primary key prefix of a row.
    pub key_len: usize,
    key_order: Arc<dyn KeyOrder>,
}

impl fmt::Debug for RowDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowDef")
            .field("row_size", &self.row_size)
            .field("key_len", &self.key_len)
            .finish()
    }
}

impl RowDef {
    pub fn new(row_size: usize, key_len: usize) -> Self {
        Self::with_key_order(row_size, key_len, Arc::new(LexicographicOrder))
    }

    pub fn with_key_order(row_size: usize, key_len: usize, key_order: Arc<dyn KeyOrder>) -> Self {
        assert!(
            key_len <= row_size,
            "key_len ({key_len}) cannot exceed row_size ({row_size})"
        );
        Self {
            row_size,
            key_len,
            key_order,
        }
    }

    /// The primary key prefix of `row`.
    ///
    /// # Panics
    /// If `row` is shorter than `key_len`.
    pub fn key_of<'a>(&self, row: &'a [u8]) -> &'a [u8] {
        &row[..self.key_len]
    }

    pub fn compare_keys(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.key_order.compare(a, b)
    }

    /// The row order derived from the key order: rows compare first by key, then by the
    /// remaining (non-key) bytes to produce a total order over whole entries.
    pub fn compare_rows(&self, a: &[u8], b: &[u8]) -> Ordering {
        match self.compare_keys(self.key_of(a), self.key_of(b)) {
            Ordering::Equal => a[self.key_len..].cmp(&b[self.key_len..]),
            other => other,
        }
    }
}
