//! Error types for buffer operations.

use std::fmt;
use std::time::Duration;

/// Result type alias for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;

/// Buffer operation error.
///
/// Blocking operations only ever fail with [`BufferError::Timeout`]; a
/// timeout is an expected outcome and callers are meant to retry in a loop.
/// The remaining variants report misuse of cursors and capacities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// The wait budget elapsed before the operation could complete.
    #[error("buffer: timed out after {0:?}")]
    Timeout(Duration),

    /// The cursor was taken before the buffer was last mutated, or belongs
    /// to a different buffer.
    #[error("buffer: stale cursor")]
    StaleCursor,

    /// The requested capacity cannot hold the elements currently retained.
    #[error("buffer: capacity {requested} cannot hold {len} retained elements")]
    CapacityTooSmall { len: usize, requested: usize },

    /// A capacity of zero was requested.
    #[error("buffer: capacity must be greater than 0")]
    ZeroCapacity,
}

impl BufferError {
    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BufferError::Timeout(_))
    }
}

/// Returned by [`BlockBuffer::push`](crate::BlockBuffer::push) when the
/// buffer stayed full for the whole wait budget.
///
/// The rejected item is handed back to the caller.
#[derive(Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("buffer: push timed out")]
pub struct PushTimeout<T>(pub T);

impl<T> PushTimeout<T> {
    /// Returns the item that could not be pushed.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for PushTimeout<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushTimeout").finish_non_exhaustive()
    }
}
