//! Fixed-capacity ring buffer with overwrite-oldest eviction.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::DEFAULT_CAPACITY;
use crate::error::{BufferError, Result};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// A position inside a [`RingBuffer`].
///
/// A cursor names one retained element of one buffer as it was when the
/// cursor was handed out. Every mutation of the buffer bumps its write
/// generation, so a cursor held across a push, pop or eviction is rejected
/// with [`BufferError::StaleCursor`] instead of silently aliasing a reused
/// slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    buffer: u64,
    generation: u64,
    slot: usize,
}

/// A single-threaded circular buffer with a fixed capacity.
///
/// `RingBuffer<T>` keeps at most `capacity` elements. Pushing into a full
/// buffer drops the oldest element first, so the buffer always holds the most
/// recent data in push order. It performs no locking; the timed and
/// synchronized buffers wrap it behind their own mutex.
///
/// # Semantics
///
/// - **Push**: Never fails, evicts the oldest element when full
/// - **Pop**: Removes the oldest element, panics when empty
/// - **Prefix eviction**: [`remove_up_to`](Self::remove_up_to) drops every
///   element older than a cursor in O(1)
///
/// # Example
///
/// ```
/// use timesync_buffer::RingBuffer;
///
/// let mut ring = RingBuffer::new(3);
/// for i in 1..=4 {
///     ring.push(i);
/// }
/// assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
///
/// let cursor = ring.position(|&x| x > 2).unwrap();
/// assert_eq!(ring.remove_up_to(cursor).unwrap(), 1);
/// assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
/// ```
pub struct RingBuffer<T> {
    // One slot more than the capacity so that full (head + 1 == tail) and
    // empty (head == tail) stay distinguishable. Slots in [tail, head) are
    // always occupied.
    slots: Vec<Option<T>>,
    head: usize, // next write position
    tail: usize, // oldest retained element
    id: u64,
    generation: u64,
}

impl<T> RingBuffer<T> {
    /// Creates a new RingBuffer with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.resize_with(capacity + 1, || None);

        RingBuffer {
            slots,
            head: 0,
            tail: 0,
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
        }
    }

    fn next_slot(&self, slot: usize) -> usize {
        (slot + 1) % self.slots.len()
    }

    fn prev_slot(&self, slot: usize) -> usize {
        (slot + self.slots.len() - 1) % self.slots.len()
    }

    fn distance(&self, from: usize, to: usize) -> usize {
        (to + self.slots.len() - from) % self.slots.len()
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Returns the number of elements currently retained.
    pub fn len(&self) -> usize {
        self.distance(self.tail, self.head)
    }

    /// Returns the maximum number of retained elements.
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Returns true if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Returns true if the next push will evict the oldest element.
    pub fn is_full(&self) -> bool {
        self.next_slot(self.head) == self.tail
    }

    /// Appends an element, evicting the oldest one if the buffer is full.
    ///
    /// Returns the evicted element, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            let oldest = self.slots[self.tail].take();
            self.tail = self.next_slot(self.tail);
            oldest
        } else {
            None
        };

        self.slots[self.head] = Some(item);
        self.head = self.next_slot(self.head);
        self.bump();
        evicted
    }

    /// Removes and returns the oldest element.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is empty.
    pub fn pop(&mut self) -> T {
        assert!(!self.is_empty(), "pop on an empty ring buffer");

        let Some(item) = self.slots[self.tail].take() else {
            unreachable!("retained slot {} is vacant", self.tail);
        };
        self.tail = self.next_slot(self.tail);
        self.bump();
        item
    }

    /// Returns the oldest element without removing it.
    pub fn front(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.tail].as_ref()
    }

    /// Returns the newest element without removing it.
    pub fn back(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.prev_slot(self.head)].as_ref()
    }

    /// Drops every retained element.
    ///
    /// Unlike [`remove_up_to`](Self::remove_up_to) this visits every slot,
    /// so the elements are released immediately, together with any left
    /// behind by earlier prefix evictions. Returns the number of retained
    /// elements dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.len();
        self.slots.iter_mut().for_each(|slot| *slot = None);
        if dropped > 0 {
            self.tail = self.head;
            self.bump();
        }
        dropped
    }

    /// Returns an iterator over the retained elements, oldest first.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ring: self,
            slot: self.tail,
            remaining: self.len(),
        }
    }

    fn cursor(&self, slot: usize) -> Cursor {
        Cursor {
            buffer: self.id,
            generation: self.generation,
            slot,
        }
    }

    fn validate(&self, cursor: Cursor) -> Result<usize> {
        if cursor.buffer != self.id || cursor.generation != self.generation {
            return Err(BufferError::StaleCursor);
        }
        if self.distance(self.tail, cursor.slot) >= self.len() {
            return Err(BufferError::StaleCursor);
        }
        Ok(cursor.slot)
    }

    /// Returns a cursor at the oldest element, or `None` if empty.
    pub fn cursor_front(&self) -> Option<Cursor> {
        if self.is_empty() {
            return None;
        }
        Some(self.cursor(self.tail))
    }

    /// Moves a cursor one element towards the newest end.
    ///
    /// Returns `Ok(None)` when the cursor already points at the newest
    /// element.
    pub fn next_cursor(&self, cursor: Cursor) -> Result<Option<Cursor>> {
        let slot = self.next_slot(self.validate(cursor)?);
        if slot == self.head {
            return Ok(None);
        }
        Ok(Some(self.cursor(slot)))
    }

    /// Returns a cursor at the first element, oldest first, that satisfies
    /// `predicate`.
    pub fn position<P>(&self, mut predicate: P) -> Option<Cursor>
    where
        P: FnMut(&T) -> bool,
    {
        let mut slot = self.tail;
        while slot != self.head {
            if let Some(item) = self.slots[slot].as_ref() {
                if predicate(item) {
                    return Some(self.cursor(slot));
                }
            }
            slot = self.next_slot(slot);
        }
        None
    }

    /// Returns the element a cursor points at.
    pub fn get(&self, cursor: Cursor) -> Result<&T> {
        let slot = self.validate(cursor)?;
        self.slots[slot].as_ref().ok_or(BufferError::StaleCursor)
    }

    /// Drops every element older than `cursor` in O(1).
    ///
    /// The element under the cursor becomes the oldest retained element.
    /// Dropped elements are not visited: their values stay in their slots
    /// and are only released once a later push reuses the slot, or on
    /// [`clear`](Self::clear) or [`set_capacity`](Self::set_capacity).
    /// Returns the number of elements dropped.
    pub fn remove_up_to(&mut self, cursor: Cursor) -> Result<usize> {
        let slot = self.validate(cursor)?;
        let dropped = self.distance(self.tail, slot);
        if dropped > 0 {
            self.tail = slot;
            self.bump();
        }
        Ok(dropped)
    }

    /// Changes the capacity, keeping every retained element.
    ///
    /// Fails without touching the buffer if `capacity` is 0 or smaller than
    /// the number of retained elements.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }
        let len = self.len();
        if len > capacity {
            return Err(BufferError::CapacityTooSmall {
                len,
                requested: capacity,
            });
        }

        let mut slots = Vec::with_capacity(capacity + 1);
        let mut slot = self.tail;
        while slot != self.head {
            slots.push(self.slots[slot].take());
            slot = self.next_slot(slot);
        }
        slots.resize_with(capacity + 1, || None);

        self.slots = slots;
        self.tail = 0;
        self.head = len;
        self.bump();
        Ok(())
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T: fmt::Debug> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Forward iterator over a [`RingBuffer`], oldest first.
pub struct Iter<'a, T> {
    ring: &'a RingBuffer<T>,
    slot: usize,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.ring.slots[self.slot].as_ref();
        self.slot = self.ring.next_slot(self.slot);
        self.remaining -= 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn contents(ring: &RingBuffer<i32>) -> Vec<i32> {
        ring.iter().copied().collect()
    }

    #[test]
    fn test_push_pop() {
        let mut ring = RingBuffer::new(4);
        ring.push(1);
        ring.push(2);
        ring.push(3);

        assert_eq!(ring.pop(), 1);
        assert_eq!(ring.pop(), 2);
        assert_eq!(ring.pop(), 3);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_capacity_invariant() {
        let mut ring = RingBuffer::new(3);
        for i in 0..10 {
            ring.push(i);
            assert!(ring.len() <= ring.capacity());
            assert_eq!(ring.is_full(), ring.len() == ring.capacity());
            if i % 3 == 0 {
                ring.pop();
                assert!(ring.len() <= ring.capacity());
            }
        }
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut ring = RingBuffer::new(3);
        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert_eq!(ring.push(3), None);
        assert!(ring.is_full());

        // Full: the oldest element is handed back
        assert_eq!(ring.push(4), Some(1));
        assert_eq!(ring.push(5), Some(2));
        assert_eq!(ring.len(), 3);
        assert_eq!(contents(&ring), vec![3, 4, 5]);
    }

    #[test]
    fn test_sliding_window() {
        let mut ring = RingBuffer::new(5);
        for i in 0..20 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 5);
        assert_eq!(contents(&ring), vec![15, 16, 17, 18, 19]);
    }

    #[test]
    fn test_len_after_wrap() {
        let mut ring = RingBuffer::new(4);
        for i in 0..6 {
            ring.push(i);
        }
        ring.pop();
        ring.pop();
        ring.push(6);
        // head has wrapped behind tail in slot order
        assert_eq!(ring.len(), 3);
        assert_eq!(contents(&ring), vec![4, 5, 6]);
    }

    #[test]
    fn test_front_back() {
        let mut ring = RingBuffer::new(3);
        assert_eq!(ring.front(), None);
        assert_eq!(ring.back(), None);

        ring.push(1);
        ring.push(2);
        assert_eq!(ring.front(), Some(&1));
        assert_eq!(ring.back(), Some(&2));

        ring.push(3);
        ring.push(4);
        assert_eq!(ring.front(), Some(&2));
        assert_eq!(ring.back(), Some(&4));
    }

    #[test]
    #[should_panic(expected = "pop on an empty ring buffer")]
    fn test_pop_empty_panics() {
        let mut ring = RingBuffer::<i32>::new(2);
        ring.pop();
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        let _ = RingBuffer::<i32>::new(0);
    }

    #[test]
    fn test_remove_up_to() {
        let mut ring = RingBuffer::new(3);
        for i in 1..=4 {
            ring.push(i);
        }

        let cursor = ring.position(|&x| x > 2).unwrap();
        assert_eq!(*ring.get(cursor).unwrap(), 3);

        assert_eq!(ring.remove_up_to(cursor).unwrap(), 1);
        assert_eq!(contents(&ring), vec![3, 4]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_remove_up_to_front_is_noop() {
        let mut ring = RingBuffer::new(3);
        ring.push(1);
        ring.push(2);

        let cursor = ring.cursor_front().unwrap();
        assert_eq!(ring.remove_up_to(cursor).unwrap(), 0);
        assert_eq!(contents(&ring), vec![1, 2]);

        // Nothing changed, so the cursor is still usable
        assert_eq!(*ring.get(cursor).unwrap(), 1);
    }

    #[test]
    fn test_remove_up_to_then_push_reuses_slots() {
        let mut ring = RingBuffer::new(4);
        for i in 0..4 {
            ring.push(i);
        }
        let cursor = ring.position(|&x| x == 3).unwrap();
        assert_eq!(ring.remove_up_to(cursor).unwrap(), 3);

        for i in 4..7 {
            ring.push(i);
        }
        assert_eq!(contents(&ring), vec![3, 4, 5, 6]);
        assert!(ring.is_full());
    }

    #[test]
    fn test_stale_cursor_rejected() {
        let mut ring = RingBuffer::new(2);
        ring.push(1);
        ring.push(2);

        let cursor = ring.position(|&x| x == 2).unwrap();
        ring.push(3);

        assert_eq!(ring.get(cursor), Err(BufferError::StaleCursor));
        assert_eq!(ring.remove_up_to(cursor), Err(BufferError::StaleCursor));
        assert_eq!(contents(&ring).len(), 2);
    }

    #[test]
    fn test_cursor_from_other_buffer_rejected() {
        let mut a = RingBuffer::new(2);
        let mut b = RingBuffer::new(2);
        a.push(1);
        b.push(1);

        let cursor = a.cursor_front().unwrap();
        assert_eq!(b.get(cursor), Err(BufferError::StaleCursor));
        assert!(a.get(cursor).is_ok());
    }

    #[test]
    fn test_walk_cursors() {
        let mut ring = RingBuffer::new(3);
        for i in 0..5 {
            ring.push(i);
        }

        let mut seen = Vec::new();
        let mut cursor = ring.cursor_front();
        while let Some(c) = cursor {
            seen.push(*ring.get(c).unwrap());
            cursor = ring.next_cursor(c).unwrap();
        }
        assert_eq!(seen, vec![2, 3, 4]);
    }

    #[test]
    fn test_position_not_found() {
        let mut ring = RingBuffer::new(3);
        ring.push(1);
        assert!(ring.position(|&x| x > 5).is_none());
        assert!(RingBuffer::<i32>::new(1).cursor_front().is_none());
    }

    #[test]
    fn test_clear() {
        let mut ring = RingBuffer::new(3);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.clear(), 2);
        assert!(ring.is_empty());
        assert_eq!(ring.clear(), 0);

        ring.push(3);
        assert_eq!(contents(&ring), vec![3]);
    }

    #[test]
    fn test_clear_releases_elements() {
        let shared = Arc::new(());
        let mut ring = RingBuffer::new(4);
        for i in 0..3 {
            ring.push((i, Arc::clone(&shared)));
        }

        let cursor = ring.position(|(i, _)| *i == 2).unwrap();
        assert_eq!(ring.remove_up_to(cursor).unwrap(), 2);
        assert_eq!(ring.len(), 1);
        // Prefix eviction leaves the values in place until their slots are reused
        assert_eq!(Arc::strong_count(&shared), 4);

        assert_eq!(ring.clear(), 1);
        assert!(ring.is_empty());
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn test_set_capacity_releases_evicted_elements() {
        let shared = Arc::new(());
        let mut ring = RingBuffer::new(3);
        for i in 0..3 {
            ring.push((i, Arc::clone(&shared)));
        }
        let cursor = ring.position(|(i, _)| *i == 2).unwrap();
        ring.remove_up_to(cursor).unwrap();

        ring.set_capacity(3).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(Arc::strong_count(&shared), 2);
    }

    #[test]
    fn test_set_capacity() {
        let mut ring = RingBuffer::new(5);
        ring.push(1);
        ring.push(2);
        ring.push(3);

        // Too small: rejected, nothing changes
        assert_eq!(
            ring.set_capacity(2),
            Err(BufferError::CapacityTooSmall { len: 3, requested: 2 })
        );
        assert_eq!(ring.capacity(), 5);
        assert_eq!(contents(&ring), vec![1, 2, 3]);

        // Fits: narrowed, contents kept in order
        ring.set_capacity(3).unwrap();
        assert_eq!(ring.capacity(), 3);
        assert!(ring.is_full());
        assert_eq!(contents(&ring), vec![1, 2, 3]);

        ring.push(4);
        assert_eq!(contents(&ring), vec![2, 3, 4]);

        assert_eq!(ring.set_capacity(0), Err(BufferError::ZeroCapacity));
    }

    #[test]
    fn test_set_capacity_after_wrap() {
        let mut ring = RingBuffer::new(3);
        for i in 0..5 {
            ring.push(i);
        }
        ring.set_capacity(6).unwrap();
        assert_eq!(contents(&ring), vec![2, 3, 4]);
        for i in 5..8 {
            ring.push(i);
        }
        assert_eq!(contents(&ring), vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_iter_is_exact_size() {
        let mut ring = RingBuffer::new(4);
        for i in 0..6 {
            ring.push(i);
        }
        let iter = ring.iter();
        assert_eq!(iter.len(), 4);

        let mut total = 0;
        for x in &ring {
            total += x;
        }
        assert_eq!(total, 2 + 3 + 4 + 5);
    }

    #[test]
    fn test_debug_lists_contents() {
        let mut ring = RingBuffer::new(2);
        ring.push(7);
        ring.push(8);
        ring.push(9);
        assert_eq!(format!("{:?}", ring), "[8, 9]");
    }

    #[test]
    fn test_default_capacity() {
        let ring = RingBuffer::<i32>::default();
        assert_eq!(ring.capacity(), DEFAULT_CAPACITY);
    }
}
