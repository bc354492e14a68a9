/*!
 * ID Generation System
 * Type-safe identifiers for arbiters, intervals and share groups
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Type-Safe ID Wrappers
// ============================================================================

/// Arbiter identity within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArbiterId(pub u64);

/// Identity of one interval record (free node or allocation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalId(pub u64);

/// Identity of a share group; also the key of its wait channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for ArbiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arbiter#{}", self.0)
    }
}

impl fmt::Display for IntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interval#{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

impl From<u64> for ArbiterId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<u64> for IntervalId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<u64> for GroupId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

// ============================================================================
// Atomic Counter Generator
// ============================================================================

/// Lock-free monotonically increasing id source
///
/// Ids are never recycled: a released interval's id must not alias a later one.
#[repr(C, align(64))]
pub struct AtomicGenerator<T> {
    counter: AtomicU64,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: From<u64>> AtomicGenerator<T> {
    /// Create new generator starting at given value
    #[inline]
    pub const fn new(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
            _marker: std::marker::PhantomData,
        }
    }

    #[inline]
    pub fn next(&self) -> T {
        T::from(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

static ARBITER_IDS: AtomicGenerator<ArbiterId> = AtomicGenerator::new(1);
static INTERVAL_IDS: AtomicGenerator<IntervalId> = AtomicGenerator::new(1);
static GROUP_IDS: AtomicGenerator<GroupId> = AtomicGenerator::new(1);

#[inline]
pub(crate) fn next_arbiter_id() -> ArbiterId {
    ARBITER_IDS.next()
}

#[inline]
pub(crate) fn next_interval_id() -> IntervalId {
    INTERVAL_IDS.next()
}

#[inline]
pub(crate) fn next_group_id() -> GroupId {
    GROUP_IDS.next()
}

// ============================================================================
// Tests
// ============================================================================
