//! Bounded, timestamp-aligned buffers for concurrent streams.
//!
//! This crate buffers data produced by independent producer threads (sensor
//! readings, decoded frames, messages) and lets consumers retrieve either the
//! newest reading every stream has in common or a reading pinned to a
//! specific timestamp. Memory is bounded by per-stream capacities and every
//! blocking call is bounded by a timeout.
//!
//! - [`RingBuffer<T>`]: A single-threaded fixed-size buffer that overwrites
//!   its oldest element when full, with O(1) prefix eviction
//! - [`TimedBuffer<T, Ts>`]: A thread-safe single-stream buffer indexed by
//!   timestamp
//! - [`SynchronizedBuffer<S, Ts>`]: A thread-safe set of typed streams
//!   aligned by timestamp
//! - [`BlockBuffer<T>`]: A thread-safe fixed-size FIFO that blocks producers
//!   when full
//!
//! # Synchronizing Streams
//!
//! ```
//! use std::thread;
//! use std::time::Duration;
//! use timesync_buffer::{AllMatch, SynchronizedBuffer};
//!
//! let buf = SynchronizedBuffer::<(String, i32)>::new();
//! let producer = buf.clone();
//!
//! let handle = thread::spawn(move || {
//!     for ts in 0..4u64 {
//!         producer.push_force::<0>(ts, format!("frame {}", ts));
//!         producer.push_force::<1>(ts, ts as i32 * 10);
//!         thread::sleep(Duration::from_millis(5));
//!     }
//! });
//!
//! // Timeouts are ordinary outcomes: retry until the streams line up
//! let (ts, (frame, depth)) = loop {
//!     if let Ok(reading) = buf.pop_available() {
//!         break reading;
//!     }
//! };
//! assert_eq!(frame, format!("frame {}", ts));
//! assert_eq!(depth, ts as i32 * 10);
//!
//! let (frame, depth) = loop {
//!     if let Ok(values) = buf.pop_by_timestamp(AllMatch, 3) {
//!         break values;
//!     }
//! };
//! assert_eq!((frame.as_str(), depth), ("frame 3", 30));
//! handle.join().unwrap();
//! ```
//!
//! # Timeouts
//!
//! Blocking operations return [`BufferError::Timeout`] when their wait budget
//! elapses. A zero timeout tries once without waiting. Callers are expected
//! to loop; nothing is retried internally.
//!
//! # Eviction
//!
//! Pushing into a full stream silently drops that stream's oldest entry.
//! This is the documented behavior of a bounded buffer, not an error.
//!
//! # Thread Safety
//!
//! The timed, synchronized and blocking buffers are `Send + Sync` when their
//! value types are `Send`, and share their state between clones via `Arc`.

mod block_buffer;
mod config;
mod error;
mod policy;
mod ring_buffer;
mod streams;
mod synchronized_buffer;
mod timed_buffer;
mod timestamp;
mod wait;

pub use block_buffer::{BlockBuffer, DEFAULT_BLOCK_CAPACITY};
pub use config::{BufferConfig, DEFAULT_CAPACITY, DEFAULT_TIMEOUT_MS};
pub use error::{BufferError, PushTimeout, Result};
pub use policy::{AllMatch, AnyMatch, Quorum, SyncPolicy, reduce};
pub use ring_buffer::{Cursor, Iter, RingBuffer};
pub use streams::{Slot, StreamAt, StreamSet};
pub use synchronized_buffer::SynchronizedBuffer;
pub use timed_buffer::TimedBuffer;
pub use timestamp::{Timestamp, find_by_timestamp};
