//! Offset-addressed access to the backing data file.
//!
//! [`FileAccessor`] is the only point of contact with the underlying storage
//! medium. All reads and writes are serialized under one internal mutex per
//! accessor instance; this is plain thread-safety within a single process,
//! not any kind of cross-process locking.

use parking_lot::Mutex;
use std::cmp;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use crate::storage::buffer::{BufferPool, PooledBuffer};
use crate::storage::error::{StorageError, StorageResult};

pub struct FileAccessor {
    inner: Mutex<FileInner>,
    newly_created: bool,
    buffers: Arc<BufferPool>,
}

struct FileInner {
    file: File,
    length: u64,
}

impl FileAccessor {
    /// Opens the file at `path`, creating it when missing.
    pub fn open(path: &Path, buffers: Arc<BufferPool>) -> StorageResult<Self> {
        let newly_created = !path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let length = file.metadata()?.len();

        Ok(Self {
            inner: Mutex::new(FileInner { file, length }),
            newly_created,
            buffers,
        })
    }

    /// Whether `open` created the file rather than finding an existing one.
    pub fn is_newly_created(&self) -> bool {
        self.newly_created
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().length
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads `len` bytes starting at `offset`.
    pub fn read(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        check_range(&inner, offset, len)?;

        inner.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        inner.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Writes `data` at `offset`. The target range must already lie within
    /// the file; writes never grow it.
    pub fn write(&self, offset: u64, data: &[u8]) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        check_range(&inner, offset, data.len())?;

        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(data)?;
        inner.file.sync_all()?;
        Ok(())
    }

    /// Grows the file to `required_len` bytes.
    pub fn extend(&self, required_len: u64) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        if required_len <= inner.length {
            return Err(StorageError::InvalidExtend {
                requested: required_len,
                current: inner.length,
            });
        }
        inner.file.set_len(required_len)?;
        inner.length = required_len;
        Ok(())
    }

    /// Truncates the file to `required_len` bytes.
    pub fn shrink(&self, required_len: u64) -> StorageResult<()> {
        if required_len == 0 {
            return Err(StorageError::InvalidShrink {
                requested: required_len,
            });
        }
        let mut inner = self.inner.lock();
        inner.file.set_len(required_len)?;
        inner.file.sync_all()?;
        inner.length = required_len;
        Ok(())
    }

    /// Returns a reader over the `len` bytes at `offset`, preloaded into a
    /// pooled buffer.
    pub fn get_reader(&self, offset: u64, len: usize) -> StorageResult<StoreReader> {
        let mut inner = self.inner.lock();
        check_range(&inner, offset, len)?;

        let mut buf = self.buffers.allocate(len)?;
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.read_exact(&mut buf)?;

        Ok(StoreReader { buf, pos: 0 })
    }

    /// Returns a writer for the `len` bytes at `offset`, backed by a pooled
    /// buffer. Nothing reaches the file until [`StoreWriter::commit`].
    pub fn get_writer(&self, offset: u64, len: usize) -> StorageResult<StoreWriter<'_>> {
        {
            let inner = self.inner.lock();
            check_range(&inner, offset, len)?;
        }
        let buf = self.buffers.allocate(len)?;

        Ok(StoreWriter {
            accessor: self,
            offset,
            buf,
            pos: 0,
        })
    }
}

fn check_range(inner: &FileInner, offset: u64, len: usize) -> StorageResult<()> {
    if offset >= inner.length {
        return Err(StorageError::OutOfRange {
            name: "offset",
            value: offset,
            length: inner.length,
        });
    }
    let end = offset + len as u64;
    if end > inner.length {
        return Err(StorageError::OutOfRange {
            name: "length",
            value: len as u64,
            length: inner.length,
        });
    }
    Ok(())
}

/// A cursor over bytes preloaded from the file into a pooled buffer.
///
/// Implements [`io::Read`], so `byteorder`'s typed reads are available on
/// it. The buffer goes back to the pool on drop.
pub struct StoreReader {
    buf: PooledBuffer,
    pos: usize,
}

impl StoreReader {
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

impl Read for StoreReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = cmp::min(out.len(), self.remaining());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// A cursor assembling bytes in a pooled buffer for a single write-back.
///
/// [`commit`](Self::commit) writes only the bytes actually produced, not
/// the buffer's full capacity. Dropping the writer without committing
/// discards everything.
pub struct StoreWriter<'a> {
    accessor: &'a FileAccessor,
    offset: u64,
    buf: PooledBuffer,
    pos: usize,
}

impl StoreWriter<'_> {
    pub fn bytes_written(&self) -> usize {
        self.pos
    }

    /// Writes the produced bytes back to the file at the writer's offset.
    pub fn commit(self) -> StorageResult<()> {
        self.accessor.write(self.offset, &self.buf[..self.pos])
    }
}

impl Write for StoreWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.pos + data.len() > self.buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "writer capacity exceeded",
            ));
        }
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
    use tempfile::tempdir;

    fn open_with_len(len: u64) -> (FileAccessor, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let accessor = FileAccessor::open(&dir.path().join("test.dat"), BufferPool::new()).unwrap();
        if len > 0 {
            accessor.extend(len).unwrap();
        }
        (accessor, dir)
    }

    #[test]
    fn test_newly_created_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.dat");

        {
            let accessor = FileAccessor::open(&path, BufferPool::new()).unwrap();
            assert!(accessor.is_newly_created());
            assert_eq!(accessor.len(), 0);
        }
        {
            let accessor = FileAccessor::open(&path, BufferPool::new()).unwrap();
            assert!(!accessor.is_newly_created());
        }
    }

    #[test]
    fn test_write_and_read() {
        let (accessor, _dir) = open_with_len(64);

        accessor.write(10, &[1, 2, 3, 4]).unwrap();
        assert_eq!(accessor.read(10, 4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(accessor.read(9, 1).unwrap(), vec![0]);
    }

    #[test]
    fn test_range_validation() {
        let (accessor, _dir) = open_with_len(16);

        assert!(matches!(
            accessor.read(16, 1),
            Err(StorageError::OutOfRange { name: "offset", .. })
        ));
        assert!(matches!(
            accessor.read(8, 9),
            Err(StorageError::OutOfRange { name: "length", .. })
        ));
        assert!(matches!(
            accessor.write(15, &[0, 0]),
            Err(StorageError::OutOfRange { name: "length", .. })
        ));
        assert!(accessor.read(15, 1).is_ok());
    }

    #[test]
    fn test_extend_requires_growth() {
        let (accessor, _dir) = open_with_len(16);

        assert!(matches!(
            accessor.extend(16),
            Err(StorageError::InvalidExtend { .. })
        ));
        assert!(matches!(
            accessor.extend(8),
            Err(StorageError::InvalidExtend { .. })
        ));

        accessor.extend(32).unwrap();
        assert_eq!(accessor.len(), 32);
    }

    #[test]
    fn test_shrink() {
        let (accessor, _dir) = open_with_len(32);

        accessor.shrink(16).unwrap();
        assert_eq!(accessor.len(), 16);

        assert!(matches!(
            accessor.shrink(0),
            Err(StorageError::InvalidShrink { .. })
        ));
    }

    #[test]
    fn test_reader_and_writer_round_trip() {
        let (accessor, _dir) = open_with_len(64);

        {
            let mut writer = accessor.get_writer(4, 10).unwrap();
            writer.write_u8(7).unwrap();
            writer.write_u32::<LittleEndian>(0xDEADBEEF).unwrap();
            writer.write_u16::<LittleEndian>(321).unwrap();
            assert_eq!(writer.bytes_written(), 7);
            writer.commit().unwrap();
        }

        let mut reader = accessor.get_reader(4, 7).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u32::<LittleEndian>().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_u16::<LittleEndian>().unwrap(), 321);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_writer_commits_only_produced_bytes() {
        let (accessor, _dir) = open_with_len(32);
        accessor.write(0, &[0xFF; 32]).unwrap();

        let mut writer = accessor.get_writer(0, 16).unwrap();
        writer.write_all(&[1, 2, 3]).unwrap();
        writer.commit().unwrap();

        // Bytes past the produced prefix keep their prior contents.
        assert_eq!(accessor.read(0, 4).unwrap(), vec![1, 2, 3, 0xFF]);
    }

    #[test]
    fn test_dropped_writer_writes_nothing() {
        let (accessor, _dir) = open_with_len(16);

        {
            let mut writer = accessor.get_writer(0, 8).unwrap();
            writer.write_all(&[9, 9, 9]).unwrap();
        }

        assert_eq!(accessor.read(0, 3).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_reader_releases_pooled_buffer() {
        let dir = tempdir().unwrap();
        let pool = BufferPool::new();
        let accessor = FileAccessor::open(&dir.path().join("test.dat"), Arc::clone(&pool)).unwrap();
        accessor.extend(16).unwrap();

        let reader = accessor.get_reader(0, 8).unwrap();
        assert_eq!(pool.outstanding(), 1);
        drop(reader);
        assert_eq!(pool.outstanding(), 0);
    }
}
