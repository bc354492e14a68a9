/*!
 * Arbiter Types
 * Flags, requests, interval records and read-only views
 */

use crate::core::id::{GroupId, IntervalId};
use crate::core::limits::{ALIGNMENT_MASK, ALIGNMENT_SHIFT, MAX_ALIGNMENT_EXPONENT};
use crate::core::types::{OwnerId, RangeValue, Size, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Kind of resource a domain holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    /// Countable points allocated as contiguous intervals
    Interval,
    /// Fungible quantity; declared but not supported
    Gauge,
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DomainKind::Interval => write!(f, "INTERVAL"),
            DomainKind::Gauge => write!(f, "GAUGE"),
        }
    }
}

// =============================================================================
// FLAGS
// =============================================================================

/// Resource flag set with an embedded alignment exponent
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceFlags(u32);

impl ResourceFlags {
    pub const NONE: Self = Self(0);
    /// Interval is allocated (derived; never stored)
    pub const ALLOCATED: Self = Self(0x0001);
    pub const ACTIVE: Self = Self(0x0002);
    pub const SHAREABLE: Self = Self(0x0004);
    pub const TIMESHARE: Self = Self(0x0008);
    /// A blocked sibling wants this holder to deactivate
    pub const WANTED: Self = Self(0x0010);
    /// Share group member visible in the ordered list (derived; never stored)
    pub const FIRSTSHARE: Self = Self(0x0020);
    pub const PREFETCHABLE: Self = Self(0x0040);

    const ALIGNMENT_BITS: u32 = ALIGNMENT_MASK << ALIGNMENT_SHIFT;
    const SHARE_BITS: u32 = Self::SHAREABLE.0 | Self::TIMESHARE.0;

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Flags with the given alignment exponent (clamped to 63)
    pub const fn alignment(exponent: u8) -> Self {
        let exp = if exponent > MAX_ALIGNMENT_EXPONENT {
            MAX_ALIGNMENT_EXPONENT
        } else {
            exponent
        };
        Self((exp as u32) << ALIGNMENT_SHIFT)
    }

    #[inline]
    pub const fn alignment_exponent(self) -> u8 {
        ((self.0 >> ALIGNMENT_SHIFT) & ALIGNMENT_MASK) as u8
    }

    pub fn with_alignment(self, exponent: u8) -> Self {
        Self(self.0 & !Self::ALIGNMENT_BITS) | Self::alignment(exponent)
    }

    /// Just the sharing mode bits
    #[inline]
    pub const fn share_mode(self) -> Self {
        Self(self.0 & Self::SHARE_BITS)
    }

    #[inline]
    pub const fn is_shareable(self) -> bool {
        self.intersects(Self(Self::SHARE_BITS))
    }
}

impl BitOr for ResourceFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ResourceFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ResourceFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ResourceFlags {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for ResourceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ResourceFlags, &str); 7] = [
            (ResourceFlags::ALLOCATED, "ALLOCATED"),
            (ResourceFlags::ACTIVE, "ACTIVE"),
            (ResourceFlags::SHAREABLE, "SHAREABLE"),
            (ResourceFlags::TIMESHARE, "TIMESHARE"),
            (ResourceFlags::WANTED, "WANTED"),
            (ResourceFlags::FIRSTSHARE, "FIRSTSHARE"),
            (ResourceFlags::PREFETCHABLE, "PREFETCHABLE"),
        ];
        let mut parts: Vec<String> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| name.to_string())
            .collect();
        if self.alignment_exponent() > 0 {
            parts.push(format!("ALIGN(2^{})", self.alignment_exponent()));
        }
        if parts.is_empty() {
            write!(f, "ResourceFlags(NONE)")
        } else {
            write!(f, "ResourceFlags({})", parts.join(" | "))
        }
    }
}

/// Alignment flags for the smallest power of two that is >= `size`
///
/// Sizes 0 and 1 need no alignment.
pub fn make_alignment_flags(size: Size) -> ResourceFlags {
    let exponent = if size <= 1 {
        0
    } else {
        // ceil(log2(size))
        (Size::BITS - (size - 1).leading_zeros()).min(MAX_ALIGNMENT_EXPONENT as u32) as u8
    };
    ResourceFlags::alignment(exponent)
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Reservation request
///
/// # Example
///
/// ```
/// use interval_arbiter::rman::ReserveRequest;
///
/// // 16 ports somewhere in [0x100, 0x1ff], 16-aligned, never straddling 0x80
/// let req = ReserveRequest::new(16)
///     .within(0x100, 0x1ff)
///     .with_alignment(4)
///     .with_boundary(0x80)
///     .shareable();
/// assert_eq!(req.count, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveRequest {
    pub start: RangeValue,
    pub end: RangeValue,
    pub count: Size,
    /// Power-of-two window the span may not straddle; 0 for none
    pub boundary: Size,
    /// Sharing mode, alignment exponent and `ACTIVE` for immediate activation
    pub flags: ResourceFlags,
    pub owner: Option<OwnerId>,
}

impl ReserveRequest {
    /// `count` points anywhere in the domain
    pub fn new(count: Size) -> Self {
        Self {
            start: 0,
            end: RangeValue::MAX,
            count,
            boundary: 0,
            flags: ResourceFlags::NONE,
            owner: None,
        }
    }

    /// `count` points starting exactly at `start`
    pub fn at(start: RangeValue, count: Size) -> Self {
        Self::new(count).within(start, start.saturating_add(count.saturating_sub(1)))
    }

    pub fn within(mut self, start: RangeValue, end: RangeValue) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_boundary(mut self, boundary: Size) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_alignment(mut self, exponent: u8) -> Self {
        self.flags = self.flags.with_alignment(exponent);
        self
    }

    pub fn with_flags(mut self, flags: ResourceFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn shareable(mut self) -> Self {
        self.flags |= ResourceFlags::SHAREABLE;
        self
    }

    pub fn timeshare(mut self) -> Self {
        self.flags |= ResourceFlags::TIMESHARE;
        self
    }

    /// Activate atomically with the reservation
    pub fn active(mut self) -> Self {
        self.flags |= ResourceFlags::ACTIVE;
        self
    }

    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[inline]
    pub fn wants_activation(&self) -> bool {
        self.flags.contains(ResourceFlags::ACTIVE)
    }
}

// =============================================================================
// INTERVAL RECORDS
// =============================================================================

/// Who holds an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tenancy", content = "group", rename_all = "snake_case")]
pub enum Tenancy {
    Free,
    Exclusive,
    Shared(GroupId),
}

/// One node: a free sub-range, or one allocation record over a sub-range
#[derive(Debug, Clone)]
pub(crate) struct IntervalRecord {
    pub id: IntervalId,
    pub span: Span,
    pub tenancy: Tenancy,
    /// Stored flags; `ALLOCATED` and `FIRSTSHARE` are derived on read
    pub flags: ResourceFlags,
    pub owner: Option<OwnerId>,
    pub rid: u32,
    pub mapped: Option<usize>,
}

impl IntervalRecord {
    pub fn free(id: IntervalId, span: Span) -> Self {
        Self {
            id,
            span,
            tenancy: Tenancy::Free,
            flags: ResourceFlags::NONE,
            owner: None,
            rid: 0,
            mapped: None,
        }
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        !matches!(self.tenancy, Tenancy::Free)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.flags.contains(ResourceFlags::ACTIVE)
    }

    #[inline]
    pub fn group(&self) -> Option<GroupId> {
        match self.tenancy {
            Tenancy::Shared(group) => Some(group),
            _ => None,
        }
    }

    /// Turn back into a free node, dropping every allocation attribute
    pub fn clear(&mut self) {
        self.tenancy = Tenancy::Free;
        self.flags = ResourceFlags::NONE;
        self.owner = None;
        self.rid = 0;
        self.mapped = None;
    }
}

/// Allocation records that denote the same physical sub-range
#[derive(Debug, Clone)]
pub(crate) struct ShareGroup {
    pub id: GroupId,
    pub span: Span,
    /// Unordered; newest member last
    pub members: Vec<IntervalId>,
    /// Member visible in the ordered list
    pub first: IntervalId,
    /// A sibling is blocked waiting for activation
    pub wanted: bool,
}

impl ShareGroup {
    pub fn new(id: GroupId, span: Span, first: IntervalId) -> Self {
        Self {
            id,
            span,
            members: vec![first],
            first,
            wanted: false,
        }
    }
}

// =============================================================================
// READ-ONLY VIEWS
// =============================================================================

/// Point-in-time view of one interval record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalInfo {
    pub id: IntervalId,
    pub start: RangeValue,
    pub end: RangeValue,
    pub flags: ResourceFlags,
    pub tenancy: Tenancy,
    pub owner: Option<OwnerId>,
    /// Records sharing this span (1 when unshared or free)
    pub sharers: usize,
}

impl IntervalInfo {
    #[inline]
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.flags.contains(ResourceFlags::ALLOCATED)
    }
}

/// Point-in-time view of an arbiter for introspection walkers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterSnapshot {
    pub id: crate::core::id::ArbiterId,
    pub description: String,
    pub kind: DomainKind,
    pub domain: Span,
    /// Ordered list, share groups represented by their visible member
    pub intervals: Vec<IntervalInfo>,
}

/// Arbiter occupancy statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterStats {
    pub free_intervals: usize,
    pub allocated_intervals: usize,
    pub share_groups: usize,
    /// Allocation records, counting every share group member
    pub allocation_records: usize,
    pub free_length: Size,
    pub allocated_length: Size,
}
