/*!
 * Reservation
 *
 * Two-pass first-fit search over the ordered interval list:
 *
 * 1. **Exclusive-first**: take the first free node that can hold an
 *    aligned, boundary-respecting span of `count`, splitting it as needed.
 * 2. **Shared fallback**: only for shareable requests. Join the first
 *    allocated node with compatible sharing flags whose bounds already
 *    match the request exactly. Nodes are never split to share.
 *
 * Nodes needed for a split or a new share record are reserved before any
 * existing node is modified, so a failed reservation changes nothing.
 */

use super::interval::IntervalList;
use super::types::{IntervalRecord, ReserveRequest, ResourceFlags, ShareGroup, Tenancy};
use crate::core::errors::{ArbiterError, ArbiterResult};
use crate::core::id::{next_group_id, IntervalId};
use crate::core::types::{RangeValue, Size, Span};
use tracing::debug;

/// Flags a caller may have stored on an allocation record
const STORABLE: ResourceFlags = ResourceFlags::from_bits(
    ResourceFlags::SHAREABLE.bits()
        | ResourceFlags::TIMESHARE.bits()
        | ResourceFlags::PREFETCHABLE.bits()
        | ResourceFlags::alignment(63).bits(),
);

/// Alignment and boundary masks for one request
#[derive(Debug, Clone, Copy)]
struct Placement {
    /// Last offset of the span (`count - 1`)
    last: Size,
    /// Low bits that must be zero in the start
    amask: RangeValue,
    /// High bits that must agree between first and last point; 0 for no boundary
    bmask: RangeValue,
    boundary: Size,
}

impl Placement {
    fn new(req: &ReserveRequest) -> Self {
        let exp = u32::from(req.flags.alignment_exponent());
        Self {
            last: req.count - 1,
            amask: (1u64 << exp) - 1,
            // boundary 0 yields an all-zero mask
            bmask: !req.boundary.wrapping_sub(1),
            boundary: req.boundary,
        }
    }

    #[inline]
    fn aligned(&self, start: RangeValue) -> bool {
        start & self.amask == 0
    }

    #[inline]
    fn crosses(&self, first: RangeValue, last: RangeValue) -> bool {
        (first ^ last) & self.bmask != 0
    }

    /// Lowest acceptable start inside `span` for a window ending at `end`
    ///
    /// Rounds up to the alignment, hops to the next boundary when the span
    /// would straddle one, and repeats until stable or out of range.
    fn fit(&self, span: Span, start: RangeValue, end: RangeValue) -> Option<RangeValue> {
        let mut rstart = span.start.max(start);
        loop {
            rstart = rstart.checked_add(self.amask)? & !self.amask;
            if self.crosses(rstart, rstart.checked_add(self.last)?) {
                rstart = rstart.checked_add(self.boundary - (rstart & !self.bmask))?;
            }
            if self.aligned(rstart) || rstart >= end || rstart >= span.end {
                break;
            }
        }

        let rlast = rstart.checked_add(self.last)?;
        if !self.aligned(rstart) || self.crosses(rstart, rlast) {
            return None;
        }
        // A span may run past the window end while the free node holds it
        let rend = span.end.min(rlast.max(end));
        if rstart > rend || rend - rstart < self.last {
            return None;
        }
        Some(rstart)
    }
}

impl IntervalList {
    /// Reserve per `req`, activating atomically when it asks for `ACTIVE`
    pub fn reserve(&mut self, req: &ReserveRequest) -> ArbiterResult<IntervalId> {
        self.ensure_live()?;
        validate(req)?;

        let id = self.search(req)?;

        if req.wants_activation() {
            if let Err(e) = self.activate(id) {
                // Fresh record, never active: releasing it wakes nobody
                self.release(id)?;
                return Err(e);
            }
        }
        Ok(id)
    }

    fn search(&mut self, req: &ReserveRequest) -> ArbiterResult<IntervalId> {
        let not_found = ArbiterError::NotFound {
            start: req.start,
            end: req.end,
            count: req.count,
        };
        let placement = Placement::new(req);

        // Nothing ending before the smallest possible span end can hold it
        let min_end = req.start.saturating_add(placement.last);
        let Some(first) = self
            .order
            .iter()
            .position(|id| self.records.get(id).is_some_and(|r| r.span.end >= min_end))
        else {
            return Err(not_found);
        };

        // Pass 1: exclusive-first
        for idx in first..self.order.len() {
            let Some(candidate) = self.at(idx) else {
                continue;
            };
            if candidate.span.start > req.end
                || candidate.span.start > RangeValue::MAX - placement.amask
            {
                break;
            }
            if candidate.is_allocated() {
                continue;
            }
            if let Some(rstart) = placement.fit(candidate.span, req.start, req.end) {
                let span = Span::new(rstart, rstart + placement.last);
                return self.carve(idx, span, req);
            }
        }

        // Pass 2: join an existing allocation of identical extent
        if !req.flags.is_shareable() {
            return Err(not_found);
        }
        let wanted = req.flags.share_mode();
        for idx in first..self.order.len() {
            let Some(candidate) = self.at(idx) else {
                continue;
            };
            if candidate.span.end > req.end {
                break;
            }
            let span = candidate.span;
            if candidate.is_allocated()
                && candidate.flags.contains(wanted)
                && span.start >= req.start
                && span.end - span.start == placement.last
                && placement.aligned(span.start)
                && !placement.crosses(span.start, span.end)
            {
                let host = candidate.id;
                return self.join(host, req);
            }
        }

        Err(not_found)
    }

    /// Allocate `span` out of the free node at `order[idx]`
    fn carve(&mut self, idx: usize, span: Span, req: &ReserveRequest) -> ArbiterResult<IntervalId> {
        let free = self.at(idx).map(|r| (r.id, r.span)).ok_or(ArbiterError::StaleHandle)?;
        let (free_id, free_span) = free;
        let flags = req.flags & STORABLE;

        if free_span == span {
            let record = self.record_mut(free_id)?;
            record.tenancy = Tenancy::Exclusive;
            record.flags = flags;
            record.owner = req.owner;
            debug!(interval = %free_id, span = %span, "Allocated whole free node");
            return Ok(free_id);
        }

        let leftover_before = free_span.start < span.start;
        let leftover_after = free_span.end > span.end;
        self.ensure_capacity(if leftover_before && leftover_after { 2 } else { 1 })?;

        let mut allocated = IntervalRecord::free(IntervalId(0), span);
        allocated.tenancy = Tenancy::Exclusive;
        allocated.flags = flags;
        allocated.owner = req.owner;
        let new_id = self.insert_record(allocated);

        if leftover_before && leftover_after {
            let right = self.insert_record(IntervalRecord::free(
                IntervalId(0),
                Span::new(span.end + 1, free_span.end),
            ));
            self.record_mut(free_id)?.span.end = span.start - 1;
            self.order.insert(idx + 1, new_id);
            self.order.insert(idx + 2, right);
            debug!(interval = %new_id, span = %span, from = %free_span, "Split free node in three");
        } else if leftover_after {
            self.record_mut(free_id)?.span.start = span.end + 1;
            self.order.insert(idx, new_id);
            debug!(interval = %new_id, span = %span, from = %free_span, "Took head of free node");
        } else {
            self.record_mut(free_id)?.span.end = span.start - 1;
            self.order.insert(idx + 1, new_id);
            debug!(interval = %new_id, span = %span, from = %free_span, "Took tail of free node");
        }
        Ok(new_id)
    }

    /// Add a new sharer to the allocation `host`
    fn join(&mut self, host: IntervalId, req: &ReserveRequest) -> ArbiterResult<IntervalId> {
        let (span, flags, tenancy) = {
            let record = self.record(host)?;
            (record.span, record.flags, record.tenancy)
        };

        self.ensure_capacity(1)?;
        let group = match tenancy {
            Tenancy::Shared(group) => group,
            Tenancy::Exclusive => {
                self.groups.try_reserve(1).map_err(|_| ArbiterError::OutOfMemory {
                    needed: 1,
                    in_use: self.records.len(),
                })?;
                let group = next_group_id();
                self.groups.insert(group, ShareGroup::new(group, span, host));
                self.record_mut(host)?.tenancy = Tenancy::Shared(group);
                debug!(interval = %host, group = %group, "Created share group");
                group
            }
            Tenancy::Free => return Err(ArbiterError::StaleHandle),
        };

        let mut sharer = IntervalRecord::free(IntervalId(0), span);
        sharer.tenancy = Tenancy::Shared(group);
        sharer.flags = flags & STORABLE;
        sharer.owner = req.owner;
        let id = self.insert_record(sharer);
        self.group_mut(group)?.members.push(id);

        debug!(interval = %id, group = %group, span = %span, "Joined share group");
        Ok(id)
    }
}

fn validate(req: &ReserveRequest) -> ArbiterResult<()> {
    if req.count == 0 {
        return Err(ArbiterError::InvalidArgument("count must be positive".into()));
    }
    if req.start > req.end {
        return Err(ArbiterError::InvalidArgument(format!(
            "inverted window [{:#x}, {:#x}]",
            req.start, req.end
        )));
    }
    if req.boundary != 0 {
        if !req.boundary.is_power_of_two() {
            return Err(ArbiterError::InvalidArgument(format!(
                "boundary {:#x} is not a power of two",
                req.boundary
            )));
        }
        if req.count > req.boundary {
            return Err(ArbiterError::InvalidArgument(format!(
                "count {:#x} cannot fit under boundary {:#x}",
                req.count, req.boundary
            )));
        }
    }
    Ok(())
}
