//! Storage layer error types.

use std::time::Duration;
use thiserror::Error;

use crate::storage::page::PageType;
use crate::storage::wal::LogState;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error(
        "Entry of {entry_size} bytes will not fit in page {page_number}: \
         {current_size} of {limit} bytes already used"
    )]
    EntryWillNotFit {
        page_number: u32,
        entry_size: usize,
        current_size: usize,
        limit: usize,
    },

    #[error("Entry kind does not match page type {page_type:?}")]
    EntryKindMismatch { page_type: PageType },

    #[error("Cannot move entries from page {page_number} into itself")]
    MoveFromSelf { page_number: u32 },

    #[error("{name} out of range: {value} (file length: {length})")]
    OutOfRange {
        name: &'static str,
        value: u64,
        length: u64,
    },

    #[error("Cannot extend file to {requested} bytes: current length is {current}")]
    InvalidExtend { requested: u64, current: u64 },

    #[error("Cannot shrink file to {requested} bytes")]
    InvalidShrink { requested: u64 },

    #[error("Invalid state to {operation}: current state is {state}")]
    InvalidLogState {
        operation: &'static str,
        state: LogState,
    },

    #[error("Transaction data has already been written to the log")]
    TransactionAlreadyLogged,

    #[error("Log file is shorter than its header: nothing was ever logged")]
    LogHeaderMissing,

    #[error("Unexpected entry kind {kind} in log at offset {offset}")]
    UnexpectedLogEntryKind { kind: u8, offset: u64 },

    #[error("Missing end-of-log marker")]
    MissingEndMarker,

    #[error("Bad magic marker in {file} file")]
    BadMagic { file: &'static str },

    #[error("Unsupported {file} file format version {version}")]
    UnsupportedVersion { file: &'static str, version: i32 },

    #[error("Header for page {page_number} was never cached")]
    HeaderNotCached { page_number: u32 },

    #[error("Page {page_number} is not part of the collection")]
    PageNotInCollection { page_number: u32 },

    #[error("Unable to allocate memory: no buffer freed within {waited:?} (probable buffer leak)")]
    BufferPoolExhausted { waited: Duration },

    #[error("Corrupted page data: {detail}")]
    CorruptPage { detail: String },

    #[error("Corrupted log data: {detail}")]
    CorruptLog { detail: String },

    #[error("Item {item_id} is not indexed")]
    ItemNotFound { item_id: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
