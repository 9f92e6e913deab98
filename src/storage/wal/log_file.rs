//! The log file itself: a fixed header block plus an append-only entry
//! stream.
//!
//! The two regions are addressed independently. Appends go through the
//! tracked append cursor; the one mutable header field (the state byte) is
//! patched in place without disturbing that cursor. This keeps the entry
//! stream strictly append-only while still allowing the cheap state
//! transitions the recovery protocol depends on.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use crate::storage::buffer::BufferPool;
use crate::storage::disk::FileAccessor;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::wal::{
    LogEntryKind, LogState, LOG_FORMAT_VERSION, LOG_HEADER_SIZE, LOG_MAGIC, LOG_STATE_OFFSET,
    ORIGINAL_EXTENT_OFFSET,
};

pub struct LogFileAccessor {
    file: File,
    /// Where the next entry is appended.
    append_pos: u64,
    length: u64,
    /// In-memory mirror of the state byte at [`LOG_STATE_OFFSET`].
    state: LogState,
    buffers: Arc<BufferPool>,
}

impl LogFileAccessor {
    /// Opens the log at `path`, creating an empty one when missing. An
    /// existing log has its header validated; a log shorter than its
    /// header counts as never written (state `None`).
    pub fn open(path: &Path, buffers: Arc<BufferPool>) -> StorageResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let length = file.metadata()?.len();

        let state = if length >= LOG_HEADER_SIZE {
            file.seek(SeekFrom::Start(0))?;
            let mut magic = [0u8; 6];
            file.read_exact(&mut magic)?;
            if &magic != LOG_MAGIC {
                return Err(StorageError::BadMagic { file: "log" });
            }
            let version = file.read_u8()?;
            if version != LOG_FORMAT_VERSION {
                return Err(StorageError::UnsupportedVersion {
                    file: "log",
                    version: version as i32,
                });
            }
            LogState::from_u8(file.read_u8()?)?
        } else {
            LogState::None
        };

        Ok(Self {
            file,
            append_pos: length,
            length,
            state,
            buffers,
        })
    }

    pub fn log_state(&self) -> LogState {
        self.state
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Truncates the log and writes a fresh header recording `data`'s
    /// current extent. The in-memory state is set directly rather than
    /// through [`set_log_state`](Self::set_log_state), since this is a
    /// full header rewrite, not a patch.
    pub fn initialize_new_log(&mut self, data: &FileAccessor) -> StorageResult<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(LOG_MAGIC)?;
        self.file.write_u8(LOG_FORMAT_VERSION)?;
        self.file.write_u8(LogState::Incomplete.as_u8())?;
        self.file.write_i32::<LittleEndian>(data.len() as i32)?;
        self.file.sync_all()?;

        self.append_pos = LOG_HEADER_SIZE;
        self.length = LOG_HEADER_SIZE;
        self.state = LogState::Incomplete;
        Ok(())
    }

    /// Patches the state byte in place. The append cursor and the rest of
    /// the log are untouched.
    pub fn set_log_state(&mut self, state: LogState) -> StorageResult<()> {
        if state == self.state {
            return Ok(());
        }
        self.file.seek(SeekFrom::Start(LOG_STATE_OFFSET))?;
        self.file.write_u8(state.as_u8())?;
        self.file.sync_all()?;
        self.file.seek(SeekFrom::Start(self.append_pos))?;
        self.state = state;
        Ok(())
    }

    /// Appends one before-image entry: the `length` bytes currently stored
    /// at `offset` in `data`.
    pub fn log_data_from(
        &mut self,
        kind: LogEntryKind,
        data: &FileAccessor,
        offset: u64,
        length: usize,
    ) -> StorageResult<()> {
        if self.state != LogState::Incomplete {
            return Err(StorageError::InvalidLogState {
                operation: "log data",
                state: self.state,
            });
        }

        let mut reader = data.get_reader(offset, length)?;
        let mut entry = self.buffers.allocate(9 + length)?;
        entry[0] = kind.as_u8();
        (&mut entry[1..5]).write_i32::<LittleEndian>(offset as i32)?;
        (&mut entry[5..9]).write_i32::<LittleEndian>(length as i32)?;
        reader.read_exact(&mut entry[9..])?;

        self.append(&entry)
    }

    /// Appends the end marker and moves the log to `TransactionLogged`.
    pub fn end_log(&mut self) -> StorageResult<()> {
        if self.state != LogState::Incomplete {
            return Err(StorageError::InvalidLogState {
                operation: "end log",
                state: self.state,
            });
        }
        self.append(&[LogEntryKind::EndOfLog.as_u8()])?;
        self.set_log_state(LogState::TransactionLogged)
    }

    /// The data file's length recorded when this log was initialized, read
    /// without disturbing the append cursor.
    pub fn original_data_file_extent(&mut self) -> StorageResult<i32> {
        if self.length < LOG_HEADER_SIZE {
            return Err(StorageError::LogHeaderMissing);
        }
        self.file.seek(SeekFrom::Start(ORIGINAL_EXTENT_OFFSET))?;
        let extent = self.file.read_i32::<LittleEndian>()?;
        self.file.seek(SeekFrom::Start(self.append_pos))?;
        Ok(extent)
    }

    /// Replays every logged before-image into `data`, stopping at the end
    /// marker. Returns the number of images written back.
    ///
    /// Only the data-bearing entry kinds and the end marker may appear in
    /// the stream; anything else is corruption. Bytes after the end marker
    /// are never processed.
    pub fn rollback_data_to(&mut self, data: &FileAccessor) -> StorageResult<usize> {
        match self.state {
            LogState::Incomplete | LogState::TransactionLogged => {}
            state => {
                return Err(StorageError::InvalidLogState {
                    operation: "roll back data",
                    state,
                });
            }
        }

        self.file.seek(SeekFrom::Start(LOG_HEADER_SIZE))?;
        let mut pos = LOG_HEADER_SIZE;
        let mut restored = 0usize;
        loop {
            if pos >= self.length {
                return Err(StorageError::MissingEndMarker);
            }
            let kind = self.file.read_u8()?;
            pos += 1;

            if kind == LogEntryKind::EndOfLog.as_u8() {
                break;
            }
            if kind != LogEntryKind::PageManagerHeader.as_u8()
                && kind != LogEntryKind::PageHeader.as_u8()
                && kind != LogEntryKind::FullPage.as_u8()
            {
                return Err(StorageError::UnexpectedLogEntryKind {
                    kind,
                    offset: pos - 1,
                });
            }

            let offset = self.file.read_i32::<LittleEndian>()?;
            let length = self.file.read_i32::<LittleEndian>()? as usize;
            pos += 8;

            let mut image = self.buffers.allocate(length)?;
            self.file.read_exact(&mut image)?;
            pos += length as u64;

            data.write(offset as u64, &image)?;
            restored += 1;
        }

        self.file.seek(SeekFrom::Start(self.append_pos))?;
        Ok(restored)
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<()> {
        self.file.seek(SeekFrom::Start(self.append_pos))?;
        self.file.write_all(bytes)?;
        self.file.sync_all()?;
        self.append_pos += bytes.len() as u64;
        self.length = self.length.max(self.append_pos);
        Ok(())
    }
}
