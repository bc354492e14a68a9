/*!
 * Wait Deadlines
 *
 * Timeout bookkeeping shared by every blocking wait. A deadline is fixed
 * once when the wait starts so repeated spurious wakeups never extend it.
 */

use std::time::{Duration, Instant};
use thiserror::Error;

/// Result type for wait operations
pub type WaitResult<T> = Result<T, WaitError>;

/// Wait operation errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    #[error("Wait operation timed out")]
    Timeout,

    /// The waiters were interrupted while this one slept
    #[error("Wait was cancelled")]
    Cancelled,
}

/// Absolute point after which a wait gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    Never,
    At(Instant),
}

impl Deadline {
    /// Deadline `timeout` from now; `None` never expires
    pub fn after(timeout: Option<Duration>) -> Self {
        match timeout {
            // An overflowing deadline is indistinguishable from no deadline
            Some(t) => Instant::now()
                .checked_add(t)
                .map_or(Deadline::Never, Deadline::At),
            None => Deadline::Never,
        }
    }

    #[inline]
    pub fn has_expired(&self) -> bool {
        match self {
            Deadline::Never => false,
            Deadline::At(at) => Instant::now() >= *at,
        }
    }
}
