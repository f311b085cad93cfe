//! Match policies for pinned-timestamp alignment.
//!
//! When [`SynchronizedBuffer::pop_by_timestamp`](crate::SynchronizedBuffer::pop_by_timestamp)
//! evaluates its wait predicate it computes one flag per stream: true when
//! that stream holds an entry at exactly the requested timestamp. A
//! [`SyncPolicy`] reduces those flags to a single go/no-go decision.
//!
//! Any `Fn(&[bool]) -> bool` closure is a policy:
//!
//! ```
//! use timesync_buffer::SyncPolicy;
//!
//! // Fire once the first stream has matched, whatever the others hold
//! let leader = |flags: &[bool]| flags[0];
//! assert!(leader.ready(&[true, false]));
//! ```

/// Decides whether a set of per-stream match flags is good enough to fire.
///
/// Policies gate when a pinned-timestamp pop succeeds; they never choose
/// which streams are consumed.
pub trait SyncPolicy {
    /// Returns true if the alignment should fire for these flags.
    ///
    /// `flags` holds one entry per stream, in stream order.
    fn ready(&self, flags: &[bool]) -> bool;
}

impl<F> SyncPolicy for F
where
    F: Fn(&[bool]) -> bool,
{
    fn ready(&self, flags: &[bool]) -> bool {
        self(flags)
    }
}

/// Folds the match flags with `op`, starting from `init`.
pub fn reduce<F>(flags: &[bool], init: bool, op: F) -> bool
where
    F: Fn(bool, bool) -> bool,
{
    flags.iter().fold(init, |acc, &flag| op(acc, flag))
}

/// Fires only when every stream matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllMatch;

impl SyncPolicy for AllMatch {
    fn ready(&self, flags: &[bool]) -> bool {
        reduce(flags, true, |acc, flag| acc && flag)
    }
}

/// Fires when at least one stream matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyMatch;

impl SyncPolicy for AnyMatch {
    fn ready(&self, flags: &[bool]) -> bool {
        reduce(flags, false, |acc, flag| acc || flag)
    }
}

/// Fires when at least `n` streams matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quorum(pub usize);

impl SyncPolicy for Quorum {
    fn ready(&self, flags: &[bool]) -> bool {
        flags.iter().filter(|&&flag| flag).count() >= self.0
    }
}
