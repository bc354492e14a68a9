/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::sync::WaitError;
use super::types::RangeValue;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for arbiter operations
pub type ArbiterResult<T> = Result<T, ArbiterError>;

/// Arbiter errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ArbiterError {
    #[error("Invalid arbiter state: {0}")]
    #[diagnostic(
        code(arbiter::invalid_state),
        help("Only interval domains are supported, and a torn-down arbiter accepts no further requests.")
    )]
    InvalidState(String),

    #[error("Out of interval nodes: {needed} more needed, {in_use} in use")]
    #[diagnostic(
        code(arbiter::out_of_memory),
        help("The arbiter was left unchanged. Release resources or raise max_intervals.")
    )]
    OutOfMemory { needed: usize, in_use: usize },

    #[error("No span of {count} in [{start:#x}, {end:#x}] satisfies the request")]
    #[diagnostic(
        code(arbiter::not_found),
        help("Widen the window, relax alignment/boundary, or request sharing.")
    )]
    NotFound {
        start: RangeValue,
        end: RangeValue,
        count: RangeValue,
    },

    #[error("Resource busy: {0}")]
    #[diagnostic(
        code(arbiter::busy),
        help("Another holder is active or allocations are outstanding. Wait or release first.")
    )]
    Busy(String),

    #[error("Timed out waiting for activation")]
    #[diagnostic(
        code(arbiter::timeout),
        help("The time-share sibling holding the span did not deactivate in time.")
    )]
    Timeout,

    #[error("Wait for activation was interrupted")]
    #[diagnostic(code(arbiter::interrupted))]
    Interrupted,

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(arbiter::invalid_argument))]
    InvalidArgument(String),

    #[error("Span [{start:#x}, {end:#x}] overlaps an already managed interval")]
    #[diagnostic(
        code(arbiter::overlap),
        help("Seeded spans must be disjoint when the checked trust policy is enabled.")
    )]
    Overlap { start: RangeValue, end: RangeValue },

    #[error("Span [{start:#x}, {end:#x}] is outside the managed domain")]
    #[diagnostic(code(arbiter::not_managed))]
    NotManaged { start: RangeValue, end: RangeValue },

    #[error("Resource handle no longer refers to a live interval")]
    #[diagnostic(code(arbiter::stale_handle))]
    StaleHandle,
}

impl ArbiterError {
    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ArbiterError::Busy(_)
                | ArbiterError::NotFound { .. }
                | ArbiterError::OutOfMemory { .. }
                | ArbiterError::Timeout
                | ArbiterError::Interrupted
        )
    }
}

impl From<WaitError> for ArbiterError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout => ArbiterError::Timeout,
            WaitError::Cancelled => ArbiterError::Interrupted,
        }
    }
}
