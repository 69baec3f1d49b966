use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, Weak};

/// Free-list of reusable payload buffers.
///
/// Interleaved payloads are rented from here by the frame reader and handed
/// to subscribers inside [`PooledBuffer`]; the storage returns to the pool
/// when the subscriber drops the buffer.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    free: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
}

impl BufferPool {
    /// Create a pool that keeps at most `max_idle` buffers around
    pub fn new(max_idle: usize) -> Self {
        BufferPool {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::new()),
                max_idle,
            }),
        }
    }

    /// Rent a buffer of exactly `len` bytes, zero-filled
    pub fn take(&self, len: usize) -> PooledBuffer {
        let mut data = match self.inner.free.lock() {
            Ok(mut free) => free.pop().unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        data.clear();
        data.resize(len, 0);

        PooledBuffer {
            data,
            pool: Arc::downgrade(&self.inner),
        }
    }

    /// Number of buffers currently idle in the pool
    pub fn idle_count(&self) -> usize {
        self.inner.free.lock().map(|free| free.len()).unwrap_or(0)
    }
}

/// Owned byte buffer that returns its storage to the pool on drop.
pub struct PooledBuffer {
    data: Vec<u8>,
    pool: Weak<PoolInner>,
}

impl PooledBuffer {
    /// Create a buffer that is not attached to any pool
    pub fn detached(data: Vec<u8>) -> Self {
        PooledBuffer {
            data,
            pool: Weak::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Detach from the pool, keeping the bytes
    pub fn into_vec(mut self) -> Vec<u8> {
        self.pool = Weak::new();
        std::mem::take(&mut self.data)
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
        if let Some(pool) = self.pool.upgrade() {
            if let Ok(mut free) = pool.free.lock() {
                if free.len() < pool.max_idle {
                    free.push(std::mem::take(&mut self.data));
                }
            }
        }
    }
}

impl Clone for PooledBuffer {
    // Clones are detached; only the original returns to the pool
    fn clone(&self) -> Self {
        PooledBuffer::detached(self.data.clone())
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}

impl PartialEq for PooledBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for PooledBuffer {}

impl From<Vec<u8>> for PooledBuffer {
    fn from(data: Vec<u8>) -> Self {
        PooledBuffer::detached(data)
    }
}
