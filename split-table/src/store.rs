//! The partition store contract: the per-partition ordered table this crate dispatches
//! to. The store itself is a pluggable collaborator, not part of this crate — it is consumed only
//! through these traits, abstracting over wherever partitions actually live rather than
//! hard-coding one on-disk format.
//!
//! A real, on-disk implementation ([`crate::fixed_row_store::FixedRowStore`]) is shipped so the
//! crate is usable and testable standalone.

use crate::error::StoreError;
use crate::rowdef::{Row, RowDef};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A clonable, ordered stream of primary keys. Clonable so two independent traversals of the
/// same logical cursor position can coexist.
pub trait CloneableKeyStream: Iterator<Item = Row> + Send {
    fn box_clone(&self) -> Box<dyn CloneableKeyStream>;
}

impl Clone for Box<dyn CloneableKeyStream> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// A clonable, ordered stream of whole rows.
pub trait CloneableRowStream: Iterator<Item = Row> + Send {
    fn box_clone(&self) -> Box<dyn CloneableRowStream>;
}

impl Clone for Box<dyn CloneableRowStream> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Parameters for [`PartitionStoreFactory::open`], gathering the positional parameters of
/// the store contract's `open(path, rowdef, bufferSize, initialCapacity, useTailCache, exceedLarge,
/// createNew)` into one struct.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    pub buffer_size: usize,
    pub initial_capacity: usize,
    pub use_tail_cache: bool,
    pub exceed_large_limit: bool,
    pub create_new: bool,
}

/// Opens Partition Stores and predicts their RAM footprint without opening them. Injected into
/// [`crate::split_table::SplitTable`] so the split table never hard-codes a concrete store
/// implementation.
pub trait PartitionStoreFactory: Send + Sync + fmt::Debug {
    /// Opens (or creates, if `options.create_new`) a partition store at `path`.
    ///
    /// Returns `Err(StoreError::CapacityExceeded)` if the store cannot fit its RAM index with
    /// `options.use_tail_cache` as given; the caller (Registry / Rollover) is responsible for
    /// the two-phase fallback described below.
    fn open(
        &self,
        path: &Path,
        rowdef: &RowDef,
        options: &OpenOptions,
    ) -> Result<Arc<dyn PartitionStore>, StoreError>;

    /// A pure function of file size and row schema: the RAM a store at `path` would need to
    /// open, without actually opening it (used to order warm-up).
    fn static_ram_index_need(&self, path: &Path, rowdef: &RowDef) -> Result<u64, StoreError>;
}

/// One open, ordered, primary-key-indexed on-disk partition.
pub trait PartitionStore: Send + Sync + fmt::Debug {
    fn has(&self, key: &[u8]) -> bool;
    fn get(&self, key: &[u8], force_copy: bool) -> Option<Row>;

    /// Returns `true` if the key was newly inserted, `false` if an existing row was updated.
    fn put(&self, row: Row) -> Result<bool, StoreError>;
    /// Returns the previous row, if any.
    fn replace(&self, row: Row) -> Result<Option<Row>, StoreError>;
    /// The caller guarantees the key is not already present.
    fn add_unique(&self, row: Row) -> Result<(), StoreError>;

    fn delete(&self, key: &[u8]) -> Result<bool, StoreError>;
    fn remove(&self, key: &[u8]) -> Result<Option<Row>, StoreError>;
    fn remove_one(&self) -> Result<Option<Row>, StoreError>;
    fn top(&self, n: usize) -> Result<Vec<Row>, StoreError>;
    /// Groups of rows that share a key within this partition (there cannot be any by
    /// construction of `put`/`replace`, but a store that was populated out-of-band might have
    /// them.
    fn remove_doubles(&self) -> Result<Vec<Vec<Row>>, StoreError>;

    fn size(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.size() == 0
    }
    /// Current RAM footprint of this store's index.
    fn mem(&self) -> u64;
    /// Bytes buffered but not yet flushed to disk; zero for stores with no write buffer.
    fn write_buffer_size(&self) -> u64 {
        0
    }
    /// Size, in bytes, of the on-disk file backing this partition — distinct from [`Self::mem`]
    /// (RAM index size); used by the rollover policy's `fileSize(p) >= sizeLimit` check.
    fn file_size(&self) -> u64;

    fn smallest_key(&self) -> Result<Option<Row>, StoreError>;
    fn largest_key(&self) -> Result<Option<Row>, StoreError>;

    fn keys(&self, ascending: bool, start_key: Option<&[u8]>) -> Box<dyn CloneableKeyStream>;
    fn rows(&self, ascending: bool, start_key: Option<&[u8]>) -> Box<dyn CloneableRowStream>;

    /// Idempotent; safe to run concurrently with `open`.
    fn warm_up(&self) -> Result<(), StoreError>;
    fn close(&self) -> Result<(), StoreError>;
    fn delete_on_exit(&self);
    fn filename(&self) -> &str;
}
