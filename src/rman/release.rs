/*!
 * Release, Coalescing and Adjustment
 *
 * Releasing a share group member only unlinks it; the span stays allocated
 * for the remaining sharers. Releasing an unshared allocation merges it
 * with exactly adjacent free neighbours, reusing an existing node for the
 * result so that coalescing never needs to allocate.
 */

use super::interval::IntervalList;
use super::types::{IntervalRecord, ResourceFlags, Tenancy};
use crate::core::errors::{ArbiterError, ArbiterResult};
use crate::core::id::{GroupId, IntervalId};
use crate::core::types::{RangeValue, Span};
use tracing::debug;

impl IntervalList {
    /// Release an allocation record
    ///
    /// Returns the group whose waiters must be woken when the record was an
    /// active time-share holder that others were blocked behind.
    pub fn release(&mut self, id: IntervalId) -> ArbiterResult<Option<GroupId>> {
        let record = self.record(id)?;
        if !record.is_allocated() {
            return Err(ArbiterError::StaleHandle);
        }
        let group = record.group();
        let wake = if record.is_active() {
            self.deactivate(id)?
        } else {
            None
        };

        match group {
            Some(group) => self.leave_group(id, group)?,
            None => {
                self.coalesce(id)?;
            }
        }
        Ok(wake)
    }

    /// Unlink `id` from `group`, promoting or dissolving as needed
    fn leave_group(&mut self, id: IntervalId, group_id: GroupId) -> ArbiterResult<()> {
        let group = self.group_mut(group_id)?;
        group.members.retain(|m| *m != id);
        let Some(&successor) = group.members.first() else {
            return Err(ArbiterError::InvalidState(format!("{} has no members left", group_id)));
        };

        if group.first == id {
            group.first = successor;
            let idx = self.position(id)?;
            self.order[idx] = successor;
            debug!(interval = %successor, group = %group_id, "Promoted sharer to list");
        }

        let remaining = self.group(group_id)?.members.len();
        if remaining == 1 {
            self.groups.remove(&group_id);
            let last = self.record_mut(successor)?;
            last.tenancy = Tenancy::Exclusive;
            last.flags.remove(ResourceFlags::WANTED);
            debug!(interval = %successor, group = %group_id, "Dissolved share group");
        }

        self.records.remove(&id);
        Ok(())
    }

    /// Merge `id` into its free, exactly adjacent neighbours
    ///
    /// Returns the resulting free span.
    fn coalesce(&mut self, id: IntervalId) -> ArbiterResult<Span> {
        let idx = self.position(id)?;
        let span = self.record(id)?.span;

        let prev = idx
            .checked_sub(1)
            .and_then(|i| self.at(i))
            .filter(|p| !p.is_allocated() && p.span.end.checked_add(1) == Some(span.start))
            .map(|p| p.id);
        let next = self
            .at(idx + 1)
            .filter(|n| !n.is_allocated() && span.end.checked_add(1) == Some(n.span.start))
            .map(|n| n.id);

        let merged = match (prev, next) {
            (Some(prev), Some(next)) => {
                let next_end = self.record(next)?.span.end;
                let survivor = self.record_mut(prev)?;
                survivor.span.end = next_end;
                let merged = survivor.span;
                self.order.remove(idx + 1);
                self.order.remove(idx);
                self.records.remove(&id);
                self.records.remove(&next);
                merged
            }
            (Some(prev), None) => {
                let survivor = self.record_mut(prev)?;
                survivor.span.end = span.end;
                let merged = survivor.span;
                self.order.remove(idx);
                self.records.remove(&id);
                merged
            }
            (None, Some(next)) => {
                let survivor = self.record_mut(next)?;
                survivor.span.start = span.start;
                let merged = survivor.span;
                self.order.remove(idx);
                self.records.remove(&id);
                merged
            }
            (None, None) => {
                self.record_mut(id)?.clear();
                span
            }
        };

        debug!(interval = %id, span = %span, merged = %merged, "Released interval");
        Ok(merged)
    }

    /// Grow or shrink an unshared allocation in place
    ///
    /// Growth may only consume free space from the immediately adjacent
    /// nodes; space given up returns to the adjacent free node or becomes a
    /// new free node.
    pub fn adjust(&mut self, id: IntervalId, start: RangeValue, end: RangeValue) -> ArbiterResult<()> {
        self.ensure_live()?;
        if start > end {
            return Err(ArbiterError::InvalidArgument(format!(
                "inverted span [{:#x}, {:#x}]",
                start, end
            )));
        }
        let record = self.record(id)?;
        if !record.is_allocated() {
            return Err(ArbiterError::StaleHandle);
        }
        if record.group().is_some() {
            return Err(ArbiterError::InvalidArgument(
                "shared resources cannot be adjusted".into(),
            ));
        }
        let old = record.span;
        let new = Span::new(start, end);
        if old == new {
            return Ok(());
        }
        if !old.overlaps(&new) {
            return Err(ArbiterError::InvalidArgument(format!(
                "{} does not overlap current {}",
                new, old
            )));
        }

        let mut idx = self.position(id)?;
        let prev = idx
            .checked_sub(1)
            .and_then(|i| self.at(i))
            .filter(|p| !p.is_allocated() && p.span.end.checked_add(1) == Some(old.start))
            .map(|p| (p.id, p.span));
        let next = self
            .at(idx + 1)
            .filter(|n| !n.is_allocated() && old.end.checked_add(1) == Some(n.span.start))
            .map(|n| (n.id, n.span));

        if start < old.start && !prev.is_some_and(|(_, p)| p.start <= start) {
            return Err(ArbiterError::Busy(format!(
                "space below {} is not free",
                old
            )));
        }
        if end > old.end && !next.is_some_and(|(_, n)| n.end >= end) {
            return Err(ArbiterError::Busy(format!(
                "space above {} is not free",
                old
            )));
        }

        let needed = usize::from(start > old.start && prev.is_none())
            + usize::from(end < old.end && next.is_none());
        self.ensure_capacity(needed)?;

        // Low side
        if start < old.start {
            if let Some((prev_id, prev_span)) = prev {
                if prev_span.start == start {
                    self.order.remove(idx - 1);
                    self.records.remove(&prev_id);
                    idx -= 1;
                } else {
                    self.record_mut(prev_id)?.span.end = start - 1;
                }
            }
        } else if start > old.start {
            match prev {
                Some((prev_id, _)) => self.record_mut(prev_id)?.span.end = start - 1,
                None => {
                    let freed = self.insert_record(IntervalRecord::free(
                        IntervalId(0),
                        Span::new(old.start, start - 1),
                    ));
                    self.order.insert(idx, freed);
                    idx += 1;
                }
            }
        }

        // High side
        if end > old.end {
            if let Some((next_id, next_span)) = next {
                if next_span.end == end {
                    self.order.remove(idx + 1);
                    self.records.remove(&next_id);
                } else {
                    self.record_mut(next_id)?.span.start = end + 1;
                }
            }
        } else if end < old.end {
            match next {
                Some((next_id, _)) => self.record_mut(next_id)?.span.start = end + 1,
                None => {
                    let freed = self.insert_record(IntervalRecord::free(
                        IntervalId(0),
                        Span::new(end + 1, old.end),
                    ));
                    self.order.insert(idx + 1, freed);
                }
            }
        }

        self.record_mut(id)?.span = new;
        debug!(interval = %id, from = %old, to = %new, "Adjusted interval");
        Ok(())
    }
}
