//! Single-stream timestamp-indexed buffer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::config::BufferConfig;
use crate::error::{BufferError, Result};
use crate::ring_buffer::RingBuffer;
use crate::timestamp::{Timestamp, find_by_timestamp};
use crate::wait::wait_ready;

/// A thread-safe buffer of timestamped entries for one stream.
///
/// `TimedBuffer<T, Ts>` keeps the most recent `(timestamp, value)` pairs in a
/// [`RingBuffer`] behind a mutex. Producers never block; consumers wait with
/// an explicit timeout, either for the oldest entry or for the first entry
/// at or after a given timestamp.
///
/// # Semantics
///
/// - **Push**: Never blocks, overwrites the oldest entry when full
/// - **Pop**: Blocks until an entry is available or the timeout elapses
/// - **Pop by timestamp**: Discards every entry older than the match
/// - **Get by timestamp**: Returns a copy of the match, discards nothing
///
/// Timestamps must be pushed in non-decreasing order.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use timesync_buffer::TimedBuffer;
///
/// let buf = TimedBuffer::<&str>::new(4);
/// buf.push_force(1, "a");
/// buf.push_force(3, "b");
/// buf.push_force(5, "c");
///
/// // First entry at or after 2 is the one at 3; the entry at 1 is dropped
/// let (ts, value) = buf.pop_by_timestamp(Duration::ZERO, 2).unwrap();
/// assert_eq!((ts, value), (3, "b"));
/// assert_eq!(buf.len(), 1);
/// ```
pub struct TimedBuffer<T, Ts = u64> {
    inner: Arc<TimedBufferInner<T, Ts>>,
}

struct TimedBufferInner<T, Ts> {
    state: Mutex<RingBuffer<(Ts, T)>>,
    notify: Condvar,
}

impl<T, Ts> Clone for TimedBuffer<T, Ts> {
    fn clone(&self) -> Self {
        TimedBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, Ts: Timestamp> Default for TimedBuffer<T, Ts> {
    fn default() -> Self {
        Self::with_config(&BufferConfig::default())
    }
}

impl<T, Ts: Timestamp> TimedBuffer<T, Ts> {
    /// Creates a new TimedBuffer with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        TimedBuffer {
            inner: Arc::new(TimedBufferInner {
                state: Mutex::new(RingBuffer::new(capacity)),
                notify: Condvar::new(),
            }),
        }
    }

    /// Creates a new TimedBuffer using the configured capacity.
    ///
    /// # Panics
    ///
    /// Panics if `config.capacity` is 0.
    pub fn with_config(config: &BufferConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Returns the number of entries currently retained.
    pub fn len(&self) -> usize {
        self.inner.state.lock().len()
    }

    /// Returns true if no entries are retained.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().is_empty()
    }

    /// Returns the buffer capacity.
    pub fn capacity(&self) -> usize {
        self.inner.state.lock().capacity()
    }

    /// Changes the capacity if the retained entries still fit.
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        self.inner.state.lock().set_capacity(capacity)
    }

    /// Appends an entry, overwriting the oldest one if the buffer is full.
    ///
    /// Never blocks. Wakes waiting consumers.
    pub fn push_force(&self, timestamp: Ts, item: T) {
        let mut ring = self.inner.state.lock();
        if let Some((dropped, _)) = ring.push((timestamp, item)) {
            trace!("timed buffer full, overwrote entry at {:?}", dropped);
        }
        drop(ring);
        self.inner.notify.notify_all();
    }

    /// Removes and returns the oldest entry.
    ///
    /// Blocks until an entry is available or `timeout` elapses.
    pub fn pop(&self, timeout: Duration) -> Result<(Ts, T)> {
        let mut ring = self.inner.state.lock();
        let found = wait_ready(&self.inner.notify, &mut ring, timeout, |ring| {
            (!ring.is_empty()).then(|| ring.pop())
        });
        drop(ring);

        match found {
            Some(entry) => {
                self.inner.notify.notify_all();
                Ok(entry)
            }
            None => {
                debug!("timed buffer pop timed out after {:?}", timeout);
                Err(BufferError::Timeout(timeout))
            }
        }
    }

    /// Removes and returns the first entry at or after `timestamp`.
    ///
    /// Blocks until such an entry exists or `timeout` elapses. On success
    /// every entry older than the match is discarded as well. A timeout
    /// leaves the buffer untouched.
    pub fn pop_by_timestamp(&self, timeout: Duration, timestamp: Ts) -> Result<(Ts, T)> {
        let mut ring = self.inner.state.lock();
        let found = wait_ready(&self.inner.notify, &mut ring, timeout, |ring| {
            let cursor = find_by_timestamp(ring, timestamp)?;
            let dropped = ring.remove_up_to(cursor).ok()?;
            Some((dropped, ring.pop()))
        });
        drop(ring);

        match found {
            Some((dropped, entry)) => {
                if dropped > 0 {
                    trace!("discarded {} entries older than {:?}", dropped, entry.0);
                }
                self.inner.notify.notify_all();
                Ok(entry)
            }
            None => {
                debug!(
                    "timed buffer pop at {:?} timed out after {:?}",
                    timestamp, timeout
                );
                Err(BufferError::Timeout(timeout))
            }
        }
    }
}

impl<T: Clone, Ts: Timestamp> TimedBuffer<T, Ts> {
    /// Returns a copy of the first entry at or after `timestamp` without
    /// waiting.
    ///
    /// Returns `None` if every retained entry is older.
    pub fn find_by_timestamp(&self, timestamp: Ts) -> Option<(Ts, T)> {
        let ring = self.inner.state.lock();
        let cursor = find_by_timestamp(&ring, timestamp)?;
        ring.get(cursor).ok().cloned()
    }

    /// Returns a copy of the first entry at or after `timestamp`.
    ///
    /// Blocks like [`pop_by_timestamp`](Self::pop_by_timestamp) but never
    /// removes anything, including the matched entry.
    pub fn get_by_timestamp(&self, timeout: Duration, timestamp: Ts) -> Result<(Ts, T)> {
        let mut ring = self.inner.state.lock();
        let found = wait_ready(&self.inner.notify, &mut ring, timeout, |ring| {
            let cursor = find_by_timestamp(ring, timestamp)?;
            ring.get(cursor).ok().cloned()
        });
        drop(ring);

        found.ok_or_else(|| {
            debug!(
                "timed buffer get at {:?} timed out after {:?}",
                timestamp, timeout
            );
            BufferError::Timeout(timeout)
        })
    }
}
