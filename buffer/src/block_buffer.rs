//! Fixed-size blocking hand-off buffer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::error::{BufferError, PushTimeout, Result};
use crate::ring_buffer::RingBuffer;
use crate::wait::wait_ready;

/// Default capacity of a [`BlockBuffer`].
pub const DEFAULT_BLOCK_CAPACITY: usize = 3;

/// A thread-safe fixed-size blocking buffer.
///
/// `BlockBuffer<T>` hands items from producers to consumers in FIFO order.
/// [`push`](Self::push) waits for space and [`pop`](Self::pop) waits for
/// data, each bounded by a timeout. [`push_force`](Self::push_force) never
/// waits and overwrites the oldest item instead.
///
/// # Semantics
///
/// - **Pop**: Blocks when empty until data arrives or the timeout elapses
/// - **Push**: Blocks when full until space frees up or the timeout elapses
/// - **Push force**: Never blocks, overwrites oldest data when full
///
/// # Example
///
/// ```
/// use std::thread;
/// use std::time::Duration;
/// use timesync_buffer::BlockBuffer;
///
/// let buf = BlockBuffer::<i32>::new(2);
/// let producer = buf.clone();
///
/// let handle = thread::spawn(move || {
///     for i in 0..5 {
///         producer.push(i, Duration::from_secs(5)).unwrap();
///     }
/// });
///
/// let mut items = Vec::new();
/// while items.len() < 5 {
///     if let Ok(item) = buf.pop(Duration::from_millis(50)) {
///         items.push(item);
///     }
/// }
/// handle.join().unwrap();
/// assert_eq!(items, vec![0, 1, 2, 3, 4]);
/// ```
pub struct BlockBuffer<T> {
    inner: Arc<BlockBufferInner<T>>,
}

struct BlockBufferInner<T> {
    state: Mutex<RingBuffer<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> Clone for BlockBuffer<T> {
    fn clone(&self) -> Self {
        BlockBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for BlockBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_CAPACITY)
    }
}

impl<T> BlockBuffer<T> {
    /// Creates a new BlockBuffer with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        BlockBuffer {
            inner: Arc::new(BlockBufferInner {
                state: Mutex::new(RingBuffer::new(capacity)),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            }),
        }
    }

    /// Returns the number of items currently in the buffer.
    pub fn len(&self) -> usize {
        self.inner.state.lock().len()
    }

    /// Returns the buffer capacity.
    pub fn capacity(&self) -> usize {
        self.inner.state.lock().capacity()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().is_empty()
    }

    /// Returns true if the buffer is full.
    pub fn is_full(&self) -> bool {
        self.inner.state.lock().is_full()
    }

    /// Adds an item, waiting up to `timeout` for space.
    ///
    /// On timeout the item is handed back inside [`PushTimeout`].
    pub fn push(&self, item: T, timeout: Duration) -> std::result::Result<(), PushTimeout<T>> {
        let mut ring = self.inner.state.lock();
        let has_space = wait_ready(&self.inner.not_full, &mut ring, timeout, |ring| {
            (!ring.is_full()).then_some(())
        });
        if has_space.is_none() {
            debug!("block buffer push timed out after {:?}", timeout);
            return Err(PushTimeout(item));
        }

        ring.push(item);
        drop(ring);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Adds an item without waiting, overwriting the oldest item if the
    /// buffer is full.
    pub fn push_force(&self, item: T) {
        let mut ring = self.inner.state.lock();
        if ring.push(item).is_some() {
            trace!("block buffer full, overwrote oldest item");
        }
        drop(ring);
        self.inner.not_empty.notify_one();
    }

    /// Removes and returns the oldest item, waiting up to `timeout` for one
    /// to arrive.
    pub fn pop(&self, timeout: Duration) -> Result<T> {
        let mut ring = self.inner.state.lock();
        let found = wait_ready(&self.inner.not_empty, &mut ring, timeout, |ring| {
            (!ring.is_empty()).then(|| ring.pop())
        });
        drop(ring);

        match found {
            Some(item) => {
                self.inner.not_full.notify_one();
                Ok(item)
            }
            None => {
                debug!("block buffer pop timed out after {:?}", timeout);
                Err(BufferError::Timeout(timeout))
            }
        }
    }
}
