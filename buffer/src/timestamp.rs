//! Timestamp domain shared by all streams of a buffer.

use std::fmt;

use crate::ring_buffer::{Cursor, RingBuffer};

/// An ordered, commensurable timestamp.
///
/// Any `Copy + Ord` type works; the buffers default to `u64`, a logical
/// counter rather than wall-clock time. Producers must push timestamps in
/// non-decreasing order per stream. Searches do not sort.
pub trait Timestamp: Copy + Ord + fmt::Debug + Send + Sync + 'static {}

impl<T> Timestamp for T where T: Copy + Ord + fmt::Debug + Send + Sync + 'static {}

/// Returns a cursor at the first entry whose timestamp is `>= target`.
///
/// Returns `None` when the newest retained entry is still older than
/// `target`.
pub fn find_by_timestamp<Ts, T>(ring: &RingBuffer<(Ts, T)>, target: Ts) -> Option<Cursor>
where
    Ts: Timestamp,
{
    ring.position(|(ts, _)| *ts >= target)
}
