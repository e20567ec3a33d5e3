//! Recycling pool for the byte buffers that carry compressed units and
//! copied-out pictures.
//!
//! A [`BufferPool`] is a cheap, cloneable handle. Sessions draw one buffer per
//! emitted unit or picture and give it back when that unit is closed, so a
//! steady-state encode loop stops allocating after the first few frames.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;

/// Default minimum capacity of a pooled buffer.
pub const DEFAULT_MIN_CAPACITY: usize = 4096;

/// Default number of idle buffers kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Configuration for a [`BufferPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Capacity of every newly allocated buffer.
    pub min_capacity: usize,
    /// Idle buffers beyond this count are dropped on release.
    pub max_idle: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            min_capacity: DEFAULT_MIN_CAPACITY,
            max_idle: DEFAULT_MAX_IDLE,
        }
    }
}

impl BufferPoolConfig {
    /// Set the minimum buffer capacity.
    #[must_use]
    pub fn min_capacity(mut self, capacity: usize) -> Self {
        self.min_capacity = capacity;
        self
    }

    /// Set the idle set bound.
    #[must_use]
    pub fn max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers created because the idle set was empty.
    pub allocations: u64,
    /// Acquisitions served from the idle set.
    pub reuses: u64,
    /// Buffers handed back.
    pub releases: u64,
    /// Buffers currently idle.
    pub idle: usize,
}

#[derive(Debug)]
struct PoolInner {
    config: BufferPoolConfig,
    idle: Mutex<Vec<BytesMut>>,
    allocations: AtomicU64,
    reuses: AtomicU64,
    releases: AtomicU64,
}

/// Thread-safe pool of reusable byte buffers.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(BufferPoolConfig::default())
    }
}

impl BufferPool {
    #[must_use]
    pub fn new(config: BufferPoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                idle: Mutex::new(Vec::with_capacity(config.max_idle.min(DEFAULT_MAX_IDLE))),
                allocations: AtomicU64::new(0),
                reuses: AtomicU64::new(0),
                releases: AtomicU64::new(0),
            }),
        }
    }

    /// Pool whose new buffers have at least `min_capacity` bytes.
    #[must_use]
    pub fn with_capacity(min_capacity: usize) -> Self {
        Self::new(BufferPoolConfig::default().min_capacity(min_capacity))
    }

    #[must_use]
    pub fn config(&self) -> BufferPoolConfig {
        self.inner.config
    }

    /// Takes an empty buffer, reusing an idle one when available.
    ///
    /// The returned buffer has length 0 and capacity of at least
    /// `min_capacity`.
    #[must_use]
    pub fn acquire(&self) -> PooledBuffer {
        let reused = self.inner.idle.lock().pop();
        let data = match reused {
            Some(mut buf) => {
                self.inner.reuses.fetch_add(1, Ordering::Relaxed);
                buf.clear();
                if buf.capacity() < self.inner.config.min_capacity {
                    buf.reserve(self.inner.config.min_capacity);
                }
                buf
            }
            None => {
                self.inner.allocations.fetch_add(1, Ordering::Relaxed);
                BytesMut::with_capacity(self.inner.config.min_capacity)
            }
        };
        PooledBuffer { data }
    }

    /// Hands a buffer back. Its length is reset, its capacity kept.
    pub fn release(&self, buffer: PooledBuffer) {
        let mut data = buffer.data;
        data.clear();
        self.inner.releases.fetch_add(1, Ordering::Relaxed);

        let mut idle = self.inner.idle.lock();
        if idle.len() < self.inner.config.max_idle {
            idle.push(data);
        }
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocations: self.inner.allocations.load(Ordering::Relaxed),
            reuses: self.inner.reuses.load(Ordering::Relaxed),
            releases: self.inner.releases.load(Ordering::Relaxed),
            idle: self.inner.idle.lock().len(),
        }
    }

    /// Returns true if both handles refer to the same pool.
    #[must_use]
    pub fn same_pool(&self, other: &BufferPool) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Byte buffer drawn from a [`BufferPool`].
///
/// Logical length (`len`) is tracked separately from capacity. Dropping a
/// `PooledBuffer` without releasing it simply frees the memory.
#[derive(Debug, Default)]
pub struct PooledBuffer {
    data: BytesMut,
}

impl PooledBuffer {
    /// Wraps an existing buffer, e.g. one that should join a pool on release.
    #[must_use]
    pub fn from_bytes(data: BytesMut) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn into_inner(self) -> BytesMut {
        self.data
    }
}

impl Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.data
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.data
    }
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_defaults() {
        let pool = BufferPool::default();
        let buf = pool.acquire();
        assert_eq!(buf.len(), 0);
        assert!(buf.capacity() >= DEFAULT_MIN_CAPACITY);
        assert_eq!(pool.stats().allocations, 1);
    }

    #[test]
    fn test_release_resets_length() {
        let pool = BufferPool::default();
        let mut buf = pool.acquire();
        buf.extend_from_slice(&[1, 2, 3, 4, 5]);
        let capacity = buf.capacity();
        pool.release(buf);

        let buf = pool.acquire();
        assert_eq!(buf.len(), 0);
        assert!(buf.capacity() >= capacity);

        let stats = pool.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reuses, 1);
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.idle, 0);
    }

    #[test]
    fn test_grown_capacity_is_kept() {
        let pool = BufferPool::with_capacity(16);
        let mut buf = pool.acquire();
        buf.extend_from_slice(&[0u8; 1000]);
        pool.release(buf);
        assert!(pool.acquire().capacity() >= 1000);
    }

    #[test]
    fn test_idle_set_is_bounded() {
        let pool = BufferPool::new(BufferPoolConfig::default().max_idle(2));
        let bufs: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        for buf in bufs {
            pool.release(buf);
        }
        let stats = pool.stats();
        assert_eq!(stats.idle, 2);
        assert_eq!(stats.releases, 5);
    }

    #[test]
    fn test_clones_share_pool() {
        let pool = BufferPool::default();
        let other = pool.clone();
        other.release(pool.acquire());
        assert!(pool.same_pool(&other));
        assert_eq!(pool.stats().idle, 1);
        assert!(!pool.same_pool(&BufferPool::default()));
    }
}
