/*!
 * Synchronization Primitives
 *
 * Keyed wait channels for blocking activation.
 *
 * # Architecture
 *
 * A `KeyedCondvar` is a fixed, sharded array of condition variables that
 * all pair with one external mutex (the arbiter's interval lock). Waiters
 * pass in the guard they already hold, so the predicate check and the
 * enqueue-for-wakeup happen in the same critical section.
 *
 * Several keys may hash to the same slot. Waiters must re-check their
 * predicate after every wake; spurious wakeups are part of the contract.
 */

mod condvar;
mod traits;
mod wait;

pub use condvar::KeyedCondvar;
pub use traits::WakeResult;
pub use wait::{Deadline, WaitError, WaitResult};
