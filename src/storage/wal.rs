//! Write-ahead log of before-images.
//!
//! Before a transaction mutates the data file, the bytes it is about to
//! overwrite are appended to the log. Replaying the log restores the data
//! file to its pre-transaction state; that replay is driven by
//! [`crate::recovery`] when the store opens.

pub mod log_file;
pub mod transaction_log;

use std::fmt;

use crate::storage::error::{StorageError, StorageResult};

pub use log_file::LogFileAccessor;
pub use transaction_log::{AffectedLevel, TransactionLog};

pub const LOG_MAGIC: &[u8; 6] = b"TRIELG";
pub const LOG_FORMAT_VERSION: u8 = 1;

/// Magic (6) + version (1) + state (1) + original extent (4).
pub const LOG_HEADER_SIZE: u64 = 12;
pub const LOG_STATE_OFFSET: u64 = 7;
pub const ORIGINAL_EXTENT_OFFSET: u64 = 8;

/// Lifecycle of the log, stored as one patchable byte in its header.
///
/// `Incomplete` and `TransactionLogged` both roll back to `None` at
/// recovery time; `TransactionCommitted` is the durability point past
/// which the logged transaction must never be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    None,
    Incomplete,
    TransactionLogged,
    TransactionCommitted,
}

impl LogState {
    pub fn as_u8(self) -> u8 {
        match self {
            LogState::None => 0,
            LogState::Incomplete => 1,
            LogState::TransactionLogged => 2,
            LogState::TransactionCommitted => 3,
        }
    }

    pub fn from_u8(raw: u8) -> StorageResult<Self> {
        match raw {
            0 => Ok(LogState::None),
            1 => Ok(LogState::Incomplete),
            2 => Ok(LogState::TransactionLogged),
            3 => Ok(LogState::TransactionCommitted),
            other => Err(StorageError::CorruptLog {
                detail: format!("unknown log state {other}"),
            }),
        }
    }
}

impl fmt::Display for LogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogState::None => "None",
            LogState::Incomplete => "Incomplete",
            LogState::TransactionLogged => "TransactionLogged",
            LogState::TransactionCommitted => "TransactionCommitted",
        };
        f.write_str(name)
    }
}

/// Kinds of log records. The first three carry before-image data; the end
/// marker closes the entry stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEntryKind {
    PageManagerHeader,
    PageHeader,
    FullPage,
    EndOfLog,
}

impl LogEntryKind {
    pub fn as_u8(self) -> u8 {
        match self {
            LogEntryKind::PageManagerHeader => 1,
            LogEntryKind::PageHeader => 2,
            LogEntryKind::FullPage => 3,
            LogEntryKind::EndOfLog => 4,
        }
    }

    pub fn carries_data(self) -> bool {
        !matches!(self, LogEntryKind::EndOfLog)
    }
}
