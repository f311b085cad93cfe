//! Deadline-bounded condition waits.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, MutexGuard};

/// Waits on `cond` until `ready` yields a value or `timeout` elapses.
///
/// `ready` runs under the lock before the first wait, after every wake
/// (notified or spurious) and once more when the deadline passes. It may
/// mutate the guarded state. A zero timeout evaluates `ready` exactly once.
pub(crate) fn wait_ready<T, R, F>(
    cond: &Condvar,
    guard: &mut MutexGuard<'_, T>,
    timeout: Duration,
    mut ready: F,
) -> Option<R>
where
    F: FnMut(&mut T) -> Option<R>,
{
    if let Some(found) = ready(&mut **guard) {
        return Some(found);
    }
    if timeout.is_zero() {
        return None;
    }

    let Some(deadline) = Instant::now().checked_add(timeout) else {
        // Too far out to represent: wait without a deadline
        loop {
            cond.wait(guard);
            if let Some(found) = ready(&mut **guard) {
                return Some(found);
            }
        }
    };

    loop {
        let timed_out = cond.wait_until(guard, deadline).timed_out();
        if let Some(found) = ready(&mut **guard) {
            return Some(found);
        }
        if timed_out {
            return None;
        }
    }
}
