/*!
 * System Limits and Constants
 *
 * Centralized location for arbiter-wide limits and defaults.
 */

use std::time::Duration;

// =============================================================================
// RESERVATION LIMITS
// =============================================================================

/// Largest alignment exponent a request may carry (2^63)
pub const MAX_ALIGNMENT_EXPONENT: u8 = 63;

/// Bit position of the alignment exponent inside `ResourceFlags`
pub const ALIGNMENT_SHIFT: u32 = 10;

/// Mask of the alignment exponent once shifted down
pub const ALIGNMENT_MASK: u32 = 0x3f;

// =============================================================================
// WAIT CHANNELS
// =============================================================================

/// Default number of condvar slots per arbiter
/// [PERF] Power of 2 so the slot index is a mask, not a modulo
pub const DEFAULT_WAIT_SLOTS: usize = 64;

/// Upper bound on configurable condvar slots
pub const MAX_WAIT_SLOTS: usize = 4096;

/// Default timeout used by `await_default`
pub const DEFAULT_AWAIT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// ENVIRONMENT
// =============================================================================

pub const ENV_TRUST: &str = "ARBITER_TRUST";
pub const ENV_AWAIT_TIMEOUT_MS: &str = "ARBITER_AWAIT_TIMEOUT_MS";
pub const ENV_WAIT_SLOTS: &str = "ARBITER_WAIT_SLOTS";
pub const ENV_MAX_INTERVALS: &str = "ARBITER_MAX_INTERVALS";
pub const ENV_TRACE_JSON: &str = "ARBITER_TRACE_JSON";
