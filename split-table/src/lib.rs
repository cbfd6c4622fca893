//! A time-partitioned, primary-key-ordered key-value index.
//!
//! A [`split_table::SplitTable`] presents one logical, ordered table while storing its rows
//! across many on-disk partition files, each covering a bounded time window or size. Old
//! partitions stay read-only-ish (mutable in place, but never targeted by new-key writes) once
//! a fresh partition becomes active; this amortises compaction cost and lets cold partitions be
//! paged out cheaply.
//!
//! The per-partition on-disk format itself ([`store::PartitionStore`]) is a pluggable
//! collaborator, not part of this crate — [`fixed_row_store::FixedRowStore`] ships a real,
//! correct reference implementation so the crate is usable standalone.

pub mod error;
pub mod executor;
pub mod filename;
pub mod fixed_row_store;
pub mod merge;
pub mod registry;
pub mod rollover;
pub mod rowdef;
pub mod scanner;
pub mod split_table;
pub mod store;

pub use error::{FilenameError, SplitTableError, StoreError};
pub use fixed_row_store::{FixedRowStore, FixedRowStoreFactory};
pub use rowdef::{KeyOrder, LexicographicOrder, Row, RowDef};
pub use split_table::{SplitTable, SplitTableConfig};
pub use store::{CloneableKeyStream, CloneableRowStream, OpenOptions, PartitionStore, PartitionStoreFactory};
