//! Error types for the split table and for the `PartitionStore` contract it consumes.

use thiserror::Error;

/// Failure to interpret a directory entry as a partition filename.
#[derive(Error, Debug)]
pub enum FilenameError {
    #[error("filename {0:?} does not match the modern or legacy partition shape")]
    MalformedName(String),
}

/// Failure surface of the `PartitionStore` / `PartitionStoreFactory` contract.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store cannot fit its in-memory index in the requested configuration.
    #[error("partition store cannot fit its ram index in the requested configuration")]
    CapacityExceeded,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt partition file: {0}")]
    Corrupt(String),
}

/// Public error surface of [`crate::split_table::SplitTable`].
#[derive(Error, Debug)]
pub enum SplitTableError {
    /// A partition could not be opened even after the low-memory fallback retry.
    #[error("partition store cannot fit its ram index even with tail cache disabled")]
    Capacity,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed partition filename: {0}")]
    Filename(#[from] FilenameError),

    /// Raised by structural operations (`put`, `replace`, `add_unique`, `open`, `clear`) on a
    /// closed table. Read-only operations instead return the type's "not found" value, per
    /// the table's closed-read policy.
    #[error("split table is closed")]
    Closed,

    /// Raised by `get(keys)` when a worker probing a partition is interrupted; warm-up
    /// interruptions are swallowed instead.
    #[error("operation interrupted")]
    Interrupted,
}
