/*!
 * Interval List
 *
 * The state guarded by an arbiter's lock: the ordered list of visible
 * intervals, the record arena they index into, and the share groups.
 *
 * ## Representation
 *
 * - `order` holds the ids of visible nodes sorted by start. A share group
 *   contributes exactly one entry: its `first` member.
 * - `records` owns every node, visible or not, keyed by `IntervalId`.
 * - `groups` owns every share group; members point at it through
 *   `Tenancy::Shared(GroupId)` rather than embedding sibling links.
 *
 * Lookups by position are linear, matching first-fit's ascending scan.
 */

use super::types::{
    ArbiterStats, IntervalInfo, IntervalRecord, ResourceFlags, ShareGroup, Tenancy,
};
use crate::core::errors::{ArbiterError, ArbiterResult};
use crate::core::id::{next_interval_id, GroupId, IntervalId};
use crate::core::types::{RangeValue, Span};
use ahash::RandomState;
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct IntervalList {
    pub(super) order: Vec<IntervalId>,
    pub(super) records: HashMap<IntervalId, IntervalRecord, RandomState>,
    pub(super) groups: HashMap<GroupId, ShareGroup, RandomState>,
    /// Node budget; `None` is bounded only by the allocator
    pub(super) max_records: Option<usize>,
    /// Bumped by `interrupt_waiters`; sleepers compare against their copy
    pub(super) interrupt_epoch: u64,
    /// Set once the arbiter has been torn down
    pub(super) retired: bool,
}

impl IntervalList {
    pub fn new(max_records: Option<usize>) -> Self {
        Self {
            order: Vec::new(),
            records: HashMap::with_hasher(RandomState::new()),
            groups: HashMap::with_hasher(RandomState::new()),
            max_records,
            interrupt_epoch: 0,
            retired: false,
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    #[inline]
    pub fn record(&self, id: IntervalId) -> ArbiterResult<&IntervalRecord> {
        self.records.get(&id).ok_or(ArbiterError::StaleHandle)
    }

    #[inline]
    pub fn record_mut(&mut self, id: IntervalId) -> ArbiterResult<&mut IntervalRecord> {
        self.records.get_mut(&id).ok_or(ArbiterError::StaleHandle)
    }

    #[inline]
    pub fn group(&self, id: GroupId) -> ArbiterResult<&ShareGroup> {
        self.groups.get(&id).ok_or(ArbiterError::StaleHandle)
    }

    #[inline]
    pub fn group_mut(&mut self, id: GroupId) -> ArbiterResult<&mut ShareGroup> {
        self.groups.get_mut(&id).ok_or(ArbiterError::StaleHandle)
    }

    /// Index of a visible node in `order`
    pub fn position(&self, id: IntervalId) -> ArbiterResult<usize> {
        self.order
            .iter()
            .position(|candidate| *candidate == id)
            .ok_or(ArbiterError::StaleHandle)
    }

    /// Record at `order[idx]`
    #[inline]
    pub fn at(&self, idx: usize) -> Option<&IntervalRecord> {
        self.order.get(idx).and_then(|id| self.records.get(id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn ensure_live(&self) -> ArbiterResult<()> {
        if self.retired {
            return Err(ArbiterError::InvalidState("arbiter has been torn down".into()));
        }
        Ok(())
    }

    /// Any allocation record outstanding
    pub fn has_allocations(&self) -> bool {
        self.records.values().any(IntervalRecord::is_allocated)
    }

    // =========================================================================
    // Node allocation
    // =========================================================================

    /// Make room for `nodes` new records before touching any existing one
    ///
    /// Failure leaves the list exactly as it was.
    pub fn ensure_capacity(&mut self, nodes: usize) -> ArbiterResult<()> {
        let in_use = self.records.len();
        if let Some(max) = self.max_records {
            if in_use + nodes > max {
                return Err(ArbiterError::OutOfMemory {
                    needed: nodes,
                    in_use,
                });
            }
        }
        self.records
            .try_reserve(nodes)
            .map_err(|_| ArbiterError::OutOfMemory {
                needed: nodes,
                in_use,
            })?;
        self.order
            .try_reserve(nodes)
            .map_err(|_| ArbiterError::OutOfMemory {
                needed: nodes,
                in_use,
            })?;
        Ok(())
    }

    /// Store a new record and return its id; caller places it in `order`
    pub fn insert_record(&mut self, mut record: IntervalRecord) -> IntervalId {
        let id = next_interval_id();
        record.id = id;
        self.records.insert(id, record);
        id
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Insert a free node before the first node whose end exceeds `span.start`
    pub fn seed(&mut self, span: Span, checked: bool) -> ArbiterResult<IntervalId> {
        self.ensure_live()?;
        if checked {
            let clash = self
                .order
                .iter()
                .filter_map(|id| self.records.get(id))
                .any(|r| r.span.overlaps(&span));
            if clash {
                return Err(ArbiterError::Overlap {
                    start: span.start,
                    end: span.end,
                });
            }
        }

        self.ensure_capacity(1)?;
        let idx = self
            .order
            .iter()
            .position(|id| self.records.get(id).is_some_and(|r| r.span.end > span.start))
            .unwrap_or(self.order.len());
        let id = self.insert_record(IntervalRecord::free(IntervalId(0), span));
        self.order.insert(idx, id);
        Ok(id)
    }

    // =========================================================================
    // Free-region queries
    // =========================================================================

    pub fn first_free(&self) -> Option<Span> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .find(|r| !r.is_allocated())
            .map(|r| r.span)
    }

    pub fn last_free(&self) -> Option<Span> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.records.get(id))
            .find(|r| !r.is_allocated())
            .map(|r| r.span)
    }

    /// `[start, end]` lies inside one run of exactly adjacent nodes
    pub fn covers(&self, start: RangeValue, end: RangeValue) -> bool {
        if start > end {
            return false;
        }
        let mut cursor = start;
        for record in self.order.iter().filter_map(|id| self.records.get(id)) {
            if record.span.end < cursor {
                continue;
            }
            if record.span.start > cursor {
                return false;
            }
            if record.span.end >= end {
                return true;
            }
            cursor = record.span.end + 1;
        }
        false
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Flags as callers see them, with derived bits filled in
    pub fn public_flags(&self, record: &IntervalRecord) -> ResourceFlags {
        let mut flags = record.flags;
        match record.tenancy {
            Tenancy::Free => {}
            Tenancy::Exclusive => flags.insert(ResourceFlags::ALLOCATED),
            Tenancy::Shared(group) => {
                flags.insert(ResourceFlags::ALLOCATED);
                if self.groups.get(&group).is_some_and(|g| g.first == record.id) {
                    flags.insert(ResourceFlags::FIRSTSHARE);
                }
            }
        }
        flags
    }

    pub fn info(&self, record: &IntervalRecord) -> IntervalInfo {
        let sharers = record
            .group()
            .and_then(|g| self.groups.get(&g))
            .map_or(1, |g| g.members.len());
        IntervalInfo {
            id: record.id,
            start: record.span.start,
            end: record.span.end,
            flags: self.public_flags(record),
            tenancy: record.tenancy,
            owner: record.owner,
            sharers,
        }
    }

    pub fn infos(&self) -> Vec<IntervalInfo> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(|r| self.info(r))
            .collect()
    }

    pub fn stats(&self) -> ArbiterStats {
        let mut stats = ArbiterStats {
            share_groups: self.groups.len(),
            allocation_records: self.records.values().filter(|r| r.is_allocated()).count(),
            ..Default::default()
        };
        for record in self.order.iter().filter_map(|id| self.records.get(id)) {
            if record.is_allocated() {
                stats.allocated_intervals += 1;
                stats.allocated_length = stats.allocated_length.saturating_add(record.span.len());
            } else {
                stats.free_intervals += 1;
                stats.free_length = stats.free_length.saturating_add(record.span.len());
            }
        }
        stats
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Check ordering, disjointness and share-group consistency
    pub fn verify(&self) -> Result<(), String> {
        let mut prev: Option<&IntervalRecord> = None;
        for id in &self.order {
            let record = self
                .records
                .get(id)
                .ok_or_else(|| format!("{} listed but not stored", id))?;
            if record.span.start > record.span.end {
                return Err(format!("{} has inverted span {}", id, record.span));
            }
            if let Some(prev) = prev {
                if prev.span.end >= record.span.start {
                    return Err(format!(
                        "{} {} overlaps or precedes {} {}",
                        record.id, record.span, prev.id, prev.span
                    ));
                }
            }
            if let Tenancy::Shared(group) = record.tenancy {
                let group = self
                    .groups
                    .get(&group)
                    .ok_or_else(|| format!("{} in missing {}", id, group))?;
                if group.first != record.id {
                    return Err(format!("{} listed but {} is first", id, group.first));
                }
            }
            prev = Some(record);
        }

        for group in self.groups.values() {
            if group.members.len() < 2 {
                return Err(format!("{} has {} members", group.id, group.members.len()));
            }
            let mut active = 0;
            let mut timeshare = false;
            for member in &group.members {
                let record = self
                    .records
                    .get(member)
                    .ok_or_else(|| format!("{} member {} not stored", group.id, member))?;
                if record.tenancy != Tenancy::Shared(group.id) || record.span != group.span {
                    return Err(format!("{} member {} disagrees", group.id, member));
                }
                active += usize::from(record.is_active());
                timeshare |= record.flags.contains(ResourceFlags::TIMESHARE);
            }
            if timeshare && active > 1 {
                return Err(format!("{} has {} active time-share members", group.id, active));
            }
        }

        let listed = self.order.len();
        let hidden: usize = self.groups.values().map(|g| g.members.len() - 1).sum();
        if listed + hidden != self.records.len() {
            return Err(format!(
                "{} records stored but {} listed and {} hidden",
                self.records.len(),
                listed,
                hidden
            ));
        }
        Ok(())
    }

    /// Drop every node; caller has checked nothing is allocated
    pub fn clear(&mut self) {
        self.order.clear();
        self.records.clear();
        self.groups.clear();
    }
}
