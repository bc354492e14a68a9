/*!
 * Core Types
 * Common types used across the arbiter
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in a managed numeric domain (address, port, line number...)
pub type RangeValue = u64;

/// Length of a span in a managed domain
pub type Size = u64;

/// Wait priority passed through to blocking activation (0-255, higher is more important)
pub type Priority = u8;

/// Opaque consumer handle (device, driver instance, client...)
///
/// The arbiter never interprets the value; it only stores and reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

/// Inclusive `[start, end]` span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: RangeValue,
    pub end: RangeValue,
}

impl Span {
    pub const fn new(start: RangeValue, end: RangeValue) -> Self {
        Self { start, end }
    }

    /// Number of points covered, saturating at `u64::MAX` for the full domain
    #[inline]
    pub fn len(&self) -> Size {
        (self.end - self.start).saturating_add(1)
    }

    #[inline]
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x}]", self.start, self.end)
    }
}
