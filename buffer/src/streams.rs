//! Per-stream slot plumbing for [`SynchronizedBuffer`](crate::SynchronizedBuffer).
//!
//! A synchronized buffer over `(T1, ..., Tn)` stores one
//! `RingBuffer<(Ts, Ti)>` per stream in a tuple. The alignment algorithms
//! only look at timestamps, so each ring is visited through the
//! type-erased [`Slot`] view, one stream index at a time, with
//! [`StreamSet::for_each_slot`]. Typed access to a single stream goes
//! through [`StreamAt`].
//!
//! Implementations exist for tuples of 1 to 8 streams.

use crate::ring_buffer::{Cursor, RingBuffer};
use crate::timestamp::{Timestamp, find_by_timestamp};

/// Timestamp-only view of one stream's ring.
pub trait Slot<Ts> {
    /// Returns the number of entries retained by this stream.
    fn len(&self) -> usize;

    /// Returns true if this stream retains nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the timestamp of the oldest retained entry.
    fn front_timestamp(&self) -> Option<Ts>;

    /// Returns the first entry at or after `target` and its timestamp.
    fn find(&self, target: Ts) -> Option<(Cursor, Ts)>;

    /// Drops every entry older than `cursor`, or every entry at all when
    /// `cursor` is `None`. Returns the number of entries dropped.
    fn evict_before(&mut self, cursor: Option<Cursor>) -> usize;
}

impl<Ts: Timestamp, T> Slot<Ts> for RingBuffer<(Ts, T)> {
    fn len(&self) -> usize {
        RingBuffer::len(self)
    }

    fn front_timestamp(&self) -> Option<Ts> {
        self.front().map(|(ts, _)| *ts)
    }

    fn find(&self, target: Ts) -> Option<(Cursor, Ts)> {
        let cursor = find_by_timestamp(self, target)?;
        let (ts, _) = self.get(cursor).ok()?;
        Some((cursor, *ts))
    }

    fn evict_before(&mut self, cursor: Option<Cursor>) -> usize {
        match cursor {
            Some(cursor) => self.remove_up_to(cursor).unwrap_or(0),
            None => self.clear(),
        }
    }
}

/// A fixed set of typed streams sharing one timestamp domain.
///
/// Implemented for tuples `(T1, ..., Tn)`; the tuple is also the shape of
/// one aligned reading.
pub trait StreamSet<Ts: Timestamp>: Sized {
    /// Number of streams.
    const LEN: usize;

    /// One ring of `(Ts, Ti)` per stream.
    type Rings;

    /// Creates the rings, each with `capacity`.
    fn new_rings(capacity: usize) -> Self::Rings;

    /// Applies `op` to every stream slot, in stream order.
    fn for_each_slot<Op>(rings: &Self::Rings, op: Op)
    where
        Op: FnMut(usize, &dyn Slot<Ts>);

    /// Applies `op` to every stream slot mutably, in stream order.
    fn for_each_slot_mut<Op>(rings: &mut Self::Rings, op: Op)
    where
        Op: FnMut(usize, &mut dyn Slot<Ts>);

    /// Pops the oldest entry of every stream and returns the values.
    ///
    /// # Panics
    ///
    /// Panics if any stream is empty.
    fn pop_fronts(rings: &mut Self::Rings) -> Self;
}

/// Typed access to stream `I` of a [`StreamSet`].
pub trait StreamAt<Ts: Timestamp, const I: usize>: StreamSet<Ts> {
    /// Value type of stream `I`.
    type Item;

    /// Returns the ring of stream `I`.
    fn ring(rings: &Self::Rings) -> &RingBuffer<(Ts, Self::Item)>;

    /// Returns the ring of stream `I` mutably.
    fn ring_mut(rings: &mut Self::Rings) -> &mut RingBuffer<(Ts, Self::Item)>;
}

macro_rules! stream_set {
    (@at $all:tt; $($idx:tt => $T:ident),+) => {
        $(stream_set!(@one $all; $idx => $T);)+
    };
    (@one [$($All:ident),+]; $idx:tt => $T:ident) => {
        impl<Ts: Timestamp, $($All),+> StreamAt<Ts, $idx> for ($($All,)+) {
            type Item = $T;

            fn ring(rings: &Self::Rings) -> &RingBuffer<(Ts, $T)> {
                &rings.$idx
            }

            fn ring_mut(rings: &mut Self::Rings) -> &mut RingBuffer<(Ts, $T)> {
                &mut rings.$idx
            }
        }
    };
    ($len:literal; $($idx:tt => $T:ident),+) => {
        impl<Ts: Timestamp, $($T),+> StreamSet<Ts> for ($($T,)+) {
            const LEN: usize = $len;

            type Rings = ($(RingBuffer<(Ts, $T)>,)+);

            fn new_rings(capacity: usize) -> Self::Rings {
                ($(RingBuffer::<(Ts, $T)>::new(capacity),)+)
            }

            fn for_each_slot<Op>(rings: &Self::Rings, mut op: Op)
            where
                Op: FnMut(usize, &dyn Slot<Ts>),
            {
                $(op($idx, &rings.$idx);)+
            }

            fn for_each_slot_mut<Op>(rings: &mut Self::Rings, mut op: Op)
            where
                Op: FnMut(usize, &mut dyn Slot<Ts>),
            {
                $(op($idx, &mut rings.$idx);)+
            }

            fn pop_fronts(rings: &mut Self::Rings) -> Self {
                ($(rings.$idx.pop().1,)+)
            }
        }

        stream_set!(@at [$($T),+]; $($idx => $T),+);
    };
}

stream_set!(1; 0 => A);
stream_set!(2; 0 => A, 1 => B);
stream_set!(3; 0 => A, 1 => B, 2 => C);
stream_set!(4; 0 => A, 1 => B, 2 => C, 3 => D);
stream_set!(5; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
stream_set!(6; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
stream_set!(7; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G);
stream_set!(8; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G, 7 => H);
