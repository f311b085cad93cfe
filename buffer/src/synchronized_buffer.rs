//! Multi-stream timestamp alignment.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::config::BufferConfig;
use crate::error::{BufferError, Result};
use crate::policy::{AllMatch, SyncPolicy};
use crate::ring_buffer::Cursor;
use crate::streams::{StreamAt, StreamSet};
use crate::timestamp::Timestamp;
use crate::wait::wait_ready;

/// A thread-safe set of typed streams aligned by timestamp.
///
/// `SynchronizedBuffer<S, Ts>` holds one bounded ring of `(Ts, Ti)` per
/// stream of the tuple `S = (T1, ..., Tn)`. Producers push to individual
/// streams without blocking; consumers pop one value from every stream at a
/// timestamp all streams agree on.
///
/// All streams share a single mutex and condition variable, so a push to
/// any stream re-evaluates every waiting consumer and each alignment sees a
/// consistent snapshot of all streams.
///
/// # Alignment
///
/// - [`pop_available`](Self::pop_available) returns the oldest timestamp
///   present in every stream. Each attempt drops entries that can no longer
///   align, even if the attempt then times out.
/// - [`pop_by_timestamp`](Self::pop_by_timestamp) waits for a caller-given
///   timestamp and fires when a [`SyncPolicy`] accepts the per-stream match
///   flags. A timed-out attempt drops nothing.
///
/// The two differ on purpose: a pinned search may still be answered later,
/// while entries older than every stream's oldest entry never will be.
///
/// Dropping a prefix of a stream is O(1) and does not run the entries'
/// destructors; their values are released once later pushes reuse the
/// slots. A stream emptied entirely releases its values immediately.
///
/// Concurrent consumers race for the same aligned reading; exactly one of
/// them receives it.
///
/// # Example
///
/// ```
/// use timesync_buffer::SynchronizedBuffer;
///
/// let buf = SynchronizedBuffer::<(&str, i32)>::new();
/// buf.push_force::<0>(0, "1+1=");
/// buf.push_force::<0>(1, "2+1=");
/// buf.push_force::<1>(1, 3);
///
/// // Stream 1 has nothing at 0, so the readings align at 1
/// let (ts, (question, answer)) = buf.pop_available().unwrap();
/// assert_eq!((ts, question, answer), (1, "2+1=", 3));
/// ```
pub struct SynchronizedBuffer<S, Ts = u64>
where
    S: StreamSet<Ts>,
    Ts: Timestamp,
{
    inner: Arc<SyncInner<S, Ts>>,
}

struct SyncInner<S, Ts>
where
    S: StreamSet<Ts>,
    Ts: Timestamp,
{
    state: Mutex<S::Rings>,
    notify: Condvar,
    timeout: Duration,
}

impl<S, Ts> Clone for SynchronizedBuffer<S, Ts>
where
    S: StreamSet<Ts>,
    Ts: Timestamp,
{
    fn clone(&self) -> Self {
        SynchronizedBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, Ts> Default for SynchronizedBuffer<S, Ts>
where
    S: StreamSet<Ts>,
    Ts: Timestamp,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, Ts> SynchronizedBuffer<S, Ts>
where
    S: StreamSet<Ts>,
    Ts: Timestamp,
{
    /// Creates a buffer with the default capacity and wait budget.
    pub fn new() -> Self {
        Self::with_config(&BufferConfig::default())
    }

    /// Creates a buffer whose streams all use the configured capacity and
    /// whose pops wait for the configured timeout.
    ///
    /// # Panics
    ///
    /// Panics if `config.capacity` is 0.
    pub fn with_config(config: &BufferConfig) -> Self {
        SynchronizedBuffer {
            inner: Arc::new(SyncInner {
                state: Mutex::new(S::new_rings(config.capacity)),
                notify: Condvar::new(),
                timeout: config.timeout(),
            }),
        }
    }

    /// Returns the number of streams.
    pub fn stream_count(&self) -> usize {
        S::LEN
    }

    /// Returns the default wait budget of the pop operations.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Returns the number of entries retained by stream `I`.
    pub fn len<const I: usize>(&self) -> usize
    where
        S: StreamAt<Ts, I>,
    {
        <S as StreamAt<Ts, I>>::ring(&self.inner.state.lock()).len()
    }

    /// Returns true if every stream is empty.
    pub fn is_empty(&self) -> bool {
        let rings = self.inner.state.lock();
        let mut empty = true;
        S::for_each_slot(&rings, |_, slot| empty &= slot.is_empty());
        empty
    }

    /// Returns the capacity of stream `I`.
    pub fn capacity<const I: usize>(&self) -> usize
    where
        S: StreamAt<Ts, I>,
    {
        <S as StreamAt<Ts, I>>::ring(&self.inner.state.lock()).capacity()
    }

    /// Changes the capacity of stream `I` if its retained entries still fit.
    pub fn set_capacity<const I: usize>(&self, capacity: usize) -> Result<()>
    where
        S: StreamAt<Ts, I>,
    {
        <S as StreamAt<Ts, I>>::ring_mut(&mut self.inner.state.lock()).set_capacity(capacity)
    }

    /// Appends an entry to stream `I`, overwriting that stream's oldest
    /// entry if it is full.
    ///
    /// Never blocks. Wakes waiting consumers.
    pub fn push_force<const I: usize>(&self, timestamp: Ts, item: <S as StreamAt<Ts, I>>::Item)
    where
        S: StreamAt<Ts, I>,
    {
        let mut rings = self.inner.state.lock();
        let ring = <S as StreamAt<Ts, I>>::ring_mut(&mut rings);
        if let Some((dropped, _)) = ring.push((timestamp, item)) {
            trace!("stream {} full, overwrote entry at {:?}", I, dropped);
        }
        drop(rings);
        self.inner.notify.notify_all();
    }

    /// Pops the oldest reading available in every stream, waiting for the
    /// default budget.
    pub fn pop_available(&self) -> Result<(Ts, S)> {
        self.pop_available_timeout(self.inner.timeout)
    }

    /// Pops the oldest reading available in every stream.
    ///
    /// The candidate timestamp is the newest of the streams' oldest entries:
    /// no earlier timestamp can be present in all of them. Every stream
    /// drops its entries older than the candidate; the pop succeeds once
    /// every stream holds an entry at exactly the candidate. Dropped entries
    /// stay dropped when the call times out.
    pub fn pop_available_timeout(&self, timeout: Duration) -> Result<(Ts, S)> {
        let mut rings = self.inner.state.lock();
        let found = wait_ready(&self.inner.notify, &mut rings, timeout, |rings| {
            Self::align_available(rings)
        });
        drop(rings);

        match found {
            Some(reading) => {
                self.inner.notify.notify_all();
                Ok(reading)
            }
            None => {
                debug!("pop_available timed out after {:?}", timeout);
                Err(BufferError::Timeout(timeout))
            }
        }
    }

    /// Pops the reading at `timestamp` once `policy` accepts it, waiting for
    /// the default budget.
    pub fn pop_by_timestamp<P>(&self, policy: P, timestamp: Ts) -> Result<S>
    where
        P: SyncPolicy,
    {
        self.pop_by_timestamp_timeout(policy, timestamp, self.inner.timeout)
    }

    /// Pops the reading at `timestamp` once `policy` accepts it.
    ///
    /// A stream's match flag is set when its first entry at or after
    /// `timestamp` sits exactly at `timestamp`. The pop fires when `policy`
    /// accepts the flags and every stream holds some entry at or after
    /// `timestamp`; it then drops each stream's older entries and returns
    /// one value per stream, in stream order. Streams whose flag is false
    /// contribute their first later entry.
    ///
    /// A timeout leaves every stream untouched.
    pub fn pop_by_timestamp_timeout<P>(&self, policy: P, timestamp: Ts, timeout: Duration) -> Result<S>
    where
        P: SyncPolicy,
    {
        let mut rings = self.inner.state.lock();
        let found = wait_ready(&self.inner.notify, &mut rings, timeout, |rings| {
            Self::align_at(rings, &policy, timestamp)
        });
        drop(rings);

        match found {
            Some(values) => {
                self.inner.notify.notify_all();
                Ok(values)
            }
            None => {
                debug!(
                    "pop_by_timestamp at {:?} timed out after {:?}",
                    timestamp, timeout
                );
                Err(BufferError::Timeout(timeout))
            }
        }
    }

    fn align_available(rings: &mut S::Rings) -> Option<(Ts, S)> {
        let mut target: Option<Ts> = None;
        S::for_each_slot(rings, |_, slot| {
            if let Some(front) = slot.front_timestamp() {
                target = Some(target.map_or(front, |t| t.max(front)));
            }
        });
        // Every stream is empty
        let target = target?;

        let mut flags = vec![false; S::LEN];
        S::for_each_slot_mut(rings, |i, slot| {
            let found = slot.find(target);
            let dropped = slot.evict_before(found.map(|(cursor, _)| cursor));
            if dropped > 0 {
                trace!("stream {} dropped {} entries older than {:?}", i, dropped, target);
            }
            flags[i] = matches!(found, Some((_, ts)) if ts == target);
        });

        if !AllMatch.ready(&flags) {
            return None;
        }
        Some((target, S::pop_fronts(rings)))
    }

    fn align_at<P>(rings: &mut S::Rings, policy: &P, target: Ts) -> Option<S>
    where
        P: SyncPolicy,
    {
        let mut flags = vec![false; S::LEN];
        let mut cursors: Vec<Option<Cursor>> = vec![None; S::LEN];
        S::for_each_slot(rings, |i, slot| {
            let found = slot.find(target);
            flags[i] = matches!(found, Some((_, ts)) if ts == target);
            cursors[i] = found.map(|(cursor, _)| cursor);
        });

        if !policy.ready(&flags) || cursors.iter().any(Option::is_none) {
            return None;
        }

        S::for_each_slot_mut(rings, |i, slot| {
            let dropped = slot.evict_before(cursors[i]);
            if dropped > 0 {
                trace!("stream {} dropped {} entries older than {:?}", i, dropped, target);
            }
        });
        Some(S::pop_fronts(rings))
    }
}
