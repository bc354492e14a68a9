/*!
 * Activation State Machine
 *
 * `Inactive -> Active`, cleared by deactivate or release. Time-share groups
 * admit at most one active member; everything else activates freely.
 */

use super::interval::IntervalList;
use super::types::ResourceFlags;
use crate::core::errors::{ArbiterError, ArbiterResult};
use crate::core::id::{GroupId, IntervalId};

/// Outcome of a non-blocking activation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Contention {
    /// The interval is now active
    Clear,
    /// A time-share sibling is active
    HeldBy { holder: IntervalId, group: GroupId },
}

impl IntervalList {
    /// Activate unless a time-share sibling holds the span
    ///
    /// On contention the interval's own flags are left untouched.
    pub fn try_activate(&mut self, id: IntervalId) -> ArbiterResult<Contention> {
        let record = self.record(id)?;
        if !record.is_allocated() {
            return Err(ArbiterError::StaleHandle);
        }

        if let Some(group) = record.group() {
            let members = &self.group(group)?.members;
            let timeshared = members.iter().any(|m| {
                self.records
                    .get(m)
                    .is_some_and(|r| r.flags.contains(ResourceFlags::TIMESHARE))
            });
            if timeshared {
                let holder = members.iter().copied().find(|m| {
                    *m != id && self.records.get(m).is_some_and(|r| r.is_active())
                });
                if let Some(holder) = holder {
                    return Ok(Contention::HeldBy { holder, group });
                }
            }
        }

        self.record_mut(id)?.flags.insert(ResourceFlags::ACTIVE);
        Ok(Contention::Clear)
    }

    pub fn activate(&mut self, id: IntervalId) -> ArbiterResult<()> {
        match self.try_activate(id)? {
            Contention::Clear => Ok(()),
            Contention::HeldBy { holder, group } => Err(ArbiterError::Busy(format!(
                "{} in {} is held by active sibling {}",
                id, group, holder
            ))),
        }
    }

    /// Clear `ACTIVE`; returns the group whose waiters must be woken
    pub fn deactivate(&mut self, id: IntervalId) -> ArbiterResult<Option<GroupId>> {
        let record = self.record_mut(id)?;
        record.flags.remove(ResourceFlags::ACTIVE);
        let was_wanted = record.flags.contains(ResourceFlags::WANTED);
        record.flags.remove(ResourceFlags::WANTED);

        let Some(group) = record.group() else {
            return Ok(None);
        };
        let group = self.group_mut(group)?;
        if group.wanted || was_wanted {
            group.wanted = false;
            return Ok(Some(group.id));
        }
        Ok(None)
    }

    /// Record that a sibling is blocked behind `holder`
    pub fn mark_wanted(&mut self, holder: IntervalId, group: GroupId) -> ArbiterResult<()> {
        self.record_mut(holder)?.flags.insert(ResourceFlags::WANTED);
        self.group_mut(group)?.wanted = true;
        Ok(())
    }
}
