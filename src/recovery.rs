//! Crash recovery: the rollback procedure run once when a store opens.
//!
//! The WAL state found on disk decides what happens, before any other
//! access to the store:
//!
//! | state found            | action                                    |
//! |------------------------|-------------------------------------------|
//! | `None`                 | nothing                                   |
//! | `TransactionCommitted` | nothing                                   |
//! | `Incomplete`           | trim the data file back to its original   |
//! |                        | extent if it grew                         |
//! | `TransactionLogged`    | replay every before-image, then trim      |
//!
//! An `Incomplete` log was never finished, so the data file cannot yet
//! hold partially applied new content; only a length grown by page
//! allocation needs undoing. A `TransactionLogged` log captured the full
//! before-image set, but the transaction's writes may have partially
//! reached the data file before the crash, so a byte-for-byte replay is
//! required before trimming.

use log::{debug, info};

use crate::storage::disk::FileAccessor;
use crate::storage::error::StorageResult;
use crate::storage::wal::{LogFileAccessor, LogState};

/// What [`run_rollback`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// No transaction was in flight.
    Clean,
    /// The last transaction committed; nothing to undo.
    Committed,
    /// An interrupted transaction was undone.
    RolledBack {
        images_restored: usize,
        truncated: bool,
    },
}

/// Restores the data file to a consistent state after an incomplete
/// transaction. Must run exactly once, when the store is opened, before
/// any other access.
pub fn run_rollback(
    wal: &mut LogFileAccessor,
    data: &FileAccessor,
) -> StorageResult<RollbackOutcome> {
    match wal.log_state() {
        LogState::None => {
            debug!("recovery: log is clean");
            Ok(RollbackOutcome::Clean)
        }
        LogState::TransactionCommitted => {
            debug!("recovery: last transaction committed, nothing to undo");
            Ok(RollbackOutcome::Committed)
        }
        LogState::Incomplete => {
            let truncated = trim_to_original_extent(wal, data)?;
            wal.set_log_state(LogState::None)?;
            info!(
                "recovery: discarded incomplete transaction log (truncated: {})",
                truncated
            );
            Ok(RollbackOutcome::RolledBack {
                images_restored: 0,
                truncated,
            })
        }
        LogState::TransactionLogged => {
            let images_restored = wal.rollback_data_to(data)?;
            let truncated = trim_to_original_extent(wal, data)?;
            wal.set_log_state(LogState::None)?;
            info!(
                "recovery: rolled back interrupted transaction ({} images, truncated: {})",
                images_restored, truncated
            );
            Ok(RollbackOutcome::RolledBack {
                images_restored,
                truncated,
            })
        }
    }
}

fn trim_to_original_extent(
    wal: &mut LogFileAccessor,
    data: &FileAccessor,
) -> StorageResult<bool> {
    let original_extent = wal.original_data_file_extent()? as u64;
    if data.len() > original_extent {
        data.shrink(original_extent)?;
        return Ok(true);
    }
    Ok(false)
}
