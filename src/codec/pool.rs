//! Reusable encode buffers
//!
//! A buffer is checked out for exactly one encode and goes back to the pool
//! when its guard is dropped, so two in-flight encodes never share one.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use parking_lot::Mutex;

/// Pool of scratch buffers for the encoder.
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
    buffer_capacity: usize,
    max_pooled: usize,
}

impl BufferPool {
    /// Creates a pool that keeps at most `max_idle` buffers, each starting at
    /// `buffer_capacity` bytes. Buffers that grew past `max_pooled` are
    /// dropped instead of being kept.
    pub fn new(max_idle: usize, buffer_capacity: usize, max_pooled: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            buffer_capacity,
            max_pooled,
        }
    }

    /// Checks out an empty buffer.
    pub fn get(&self) -> PooledBuffer<'_> {
        let buf = self
            .idle
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.buffer_capacity));
        PooledBuffer { buf, pool: self }
    }

    /// Returns the number of idle buffers
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn put(&self, mut buf: Vec<u8>) {
        if buf.capacity() > self.max_pooled {
            return;
        }
        buf.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle_count())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// A buffer checked out from a [`BufferPool`].
pub struct PooledBuffer<'p> {
    buf: Vec<u8>,
    pool: &'p BufferPool,
}

impl PooledBuffer<'_> {
    /// Mutable access for writing
    pub fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Copies the contents into a standalone `Bytes`
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl fmt::Debug for PooledBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer").field("len", &self.buf.len()).finish()
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        if buf.capacity() > 0 {
            self.pool.put(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_returns_on_drop() {
        let pool = BufferPool::new(2, 16, 1024);
        {
            let mut buf = pool.get();
            buf.as_mut_vec().extend_from_slice(b"abc");
            assert_eq!(&*buf, b"abc");
            assert_eq!(pool.idle_count(), 0);
        }
        assert_eq!(pool.idle_count(), 1);

        let buf = pool.get();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_concurrent_checkouts_are_distinct() {
        let pool = BufferPool::new(4, 16, 1024);
        let mut a = pool.get();
        let mut b = pool.get();
        a.as_mut_vec().push(1);
        b.as_mut_vec().push(2);
        assert_eq!(&*a, &[1]);
        assert_eq!(&*b, &[2]);
    }

    #[test]
    fn test_oversized_buffer_not_kept() {
        let pool = BufferPool::new(2, 16, 32);
        {
            let mut buf = pool.get();
            buf.as_mut_vec().resize(1024, 0);
        }
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_idle_limit() {
        let pool = BufferPool::new(1, 16, 1024);
        let a = pool.get();
        let b = pool.get();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }
}
