//! Size-bucketed buffer pool.
//!
//! Every reader and writer in the storage layer borrows its scratch buffer
//! from this pool instead of allocating per operation. Buffers are keyed by
//! size and recycled on release. Admission is gated by a counting limit of
//! [`MAX_OUTSTANDING_BUFFERS`]: an `allocate` call that cannot get a slot
//! within [`ALLOCATION_TIMEOUT`] fails with a fatal error, since that means
//! some reader or writer was never disposed.

use bytes::BytesMut;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::storage::error::{StorageError, StorageResult};

/// Maximum number of buffers handed out at any one time.
pub const MAX_OUTSTANDING_BUFFERS: usize = 20;

/// How long `allocate` waits for a free slot before reporting a leak.
pub const ALLOCATION_TIMEOUT: Duration = Duration::from_secs(1);

/// A pool of reusable byte buffers bucketed by size.
pub struct BufferPool {
    state: Mutex<PoolState>,
    slot_freed: Condvar,
}

struct PoolState {
    buckets: HashMap<usize, Vec<BytesMut>>,
    outstanding: usize,
}

impl BufferPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PoolState {
                buckets: HashMap::new(),
                outstanding: 0,
            }),
            slot_freed: Condvar::new(),
        })
    }

    /// Hands out a zeroed buffer of exactly `size` bytes, reusing a pooled
    /// one when available.
    ///
    /// Blocks up to [`ALLOCATION_TIMEOUT`] for an admission slot. A timeout
    /// is not transient contention: with 20 slots and short-lived readers
    /// and writers, hitting it means a buffer was leaked.
    pub fn allocate(self: &Arc<Self>, size: usize) -> StorageResult<PooledBuffer> {
        let mut state = self.state.lock();
        let deadline = Instant::now() + ALLOCATION_TIMEOUT;
        while state.outstanding >= MAX_OUTSTANDING_BUFFERS {
            if self.slot_freed.wait_until(&mut state, deadline).timed_out() {
                return Err(StorageError::BufferPoolExhausted {
                    waited: ALLOCATION_TIMEOUT,
                });
            }
        }
        state.outstanding += 1;

        let mut data = state
            .buckets
            .get_mut(&size)
            .and_then(|bucket| bucket.pop())
            .unwrap_or_else(|| BytesMut::with_capacity(size));
        // A recycled buffer still holds its previous contents.
        data.clear();
        data.resize(size, 0);

        Ok(PooledBuffer {
            pool: Arc::clone(self),
            data,
            size,
        })
    }

    fn release(&self, size: usize, data: BytesMut) {
        let mut state = self.state.lock();
        state.buckets.entry(size).or_default().push(data);
        state.outstanding -= 1;
        self.slot_freed.notify_one();
    }

    /// Number of buffers currently handed out.
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Number of idle buffers pooled for `size`.
    pub fn pooled(&self, size: usize) -> usize {
        self.state
            .lock()
            .buckets
            .get(&size)
            .map_or(0, |bucket| bucket.len())
    }
}

/// A buffer checked out of a [`BufferPool`]; returns itself to its size
/// bucket and frees its admission slot on drop.
pub struct PooledBuffer {
    pool: Arc<BufferPool>,
    data: BytesMut,
    size: usize,
}

impl PooledBuffer {
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.pool.release(self.size, data);
    }
}
