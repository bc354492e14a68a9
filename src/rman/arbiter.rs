/*!
 * Arbiter
 *
 * One numeric resource domain: an interval list behind a private lock plus
 * the wait channels `await` sleeps on.
 *
 * ## Locking
 *
 * Every search, split, merge, activation and release runs with the
 * arbiter's mutex held. Blocking only happens in `await_activation`, which
 * parks on a condvar slot keyed by the share group while handing the same
 * guard back to the mutex, so the busy check and the enqueue are a single
 * critical section.
 */

use super::activation::Contention;
use super::interval::IntervalList;
use super::resource::Resource;
use super::types::{
    ArbiterSnapshot, ArbiterStats, DomainKind, IntervalInfo, IntervalRecord, ReserveRequest,
    ResourceFlags,
};
use crate::core::config::{ArbiterConfig, TrustPolicy};
use crate::core::errors::{ArbiterError, ArbiterResult};
use crate::core::id::{next_arbiter_id, ArbiterId, GroupId, IntervalId};
use crate::core::sync::{Deadline, KeyedCondvar, WaitError};
use crate::core::types::{OwnerId, Priority, RangeValue, Size, Span};
use crate::monitoring::{span_operation, OperationSpan};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Manager for one numeric resource domain
pub struct Arbiter {
    id: ArbiterId,
    kind: DomainKind,
    description: String,
    domain: Span,
    config: ArbiterConfig,
    intervals: Mutex<IntervalList>,
    waiters: KeyedCondvar<GroupId>,
}

impl Arbiter {
    /// Build an arbiter with an empty interval list
    ///
    /// Only `DomainKind::Interval` is supported; `Gauge` fails with
    /// `InvalidState`.
    pub(crate) fn new(
        description: impl Into<String>,
        kind: DomainKind,
        domain: Span,
        config: ArbiterConfig,
    ) -> ArbiterResult<Self> {
        if kind != DomainKind::Interval {
            return Err(ArbiterError::InvalidState(format!(
                "{} domains are not supported",
                kind
            )));
        }
        if domain.start > domain.end {
            return Err(ArbiterError::InvalidArgument(format!(
                "inverted domain [{:#x}, {:#x}]",
                domain.start, domain.end
            )));
        }
        config.validate()?;

        let arbiter = Self {
            id: next_arbiter_id(),
            kind,
            description: description.into(),
            domain,
            intervals: Mutex::new(IntervalList::new(config.max_intervals)),
            waiters: KeyedCondvar::new(config.wait_slots),
            config,
        };
        info!(
            arbiter = %arbiter.id,
            description = %arbiter.description,
            domain = %arbiter.domain,
            trust = ?arbiter.config.trust,
            "Arbiter initialized"
        );
        Ok(arbiter)
    }

    // =========================================================================
    // Identity
    // =========================================================================

    #[inline]
    pub fn id(&self) -> ArbiterId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> DomainKind {
        self.kind
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Range of values this arbiter may manage
    #[inline]
    pub fn domain(&self) -> Span {
        self.domain
    }

    #[inline]
    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    // =========================================================================
    // Seeding and queries
    // =========================================================================

    /// Add `[start, end]` as a free interval
    ///
    /// Under `TrustPolicy::Trusted` overlap with earlier seeds is not
    /// checked; the caller guarantees disjoint spans.
    pub fn seed(&self, start: RangeValue, end: RangeValue) -> ArbiterResult<()> {
        if start > end {
            return Err(ArbiterError::InvalidArgument(format!(
                "inverted span [{:#x}, {:#x}]",
                start, end
            )));
        }
        let span = Span::new(start, end);
        if !self.domain.contains(&span) {
            return Err(ArbiterError::NotManaged { start, end });
        }

        let mut list = self.intervals.lock();
        let id = list.seed(span, self.checked())?;
        debug!(arbiter = %self.id, interval = %id, span = %span, "Seeded free interval");
        self.verify(&list, "seed");
        Ok(())
    }

    /// `[start, end]` lies within one run of contiguous seeded intervals
    pub fn is_region_managed(&self, start: RangeValue, end: RangeValue) -> bool {
        self.intervals.lock().covers(start, end)
    }

    /// The handle was reserved from this arbiter
    pub fn is_region_manager(&self, resource: &Resource) -> bool {
        std::ptr::eq(resource.arbiter().as_ref(), self)
    }

    pub fn first_free_region(&self) -> ArbiterResult<Span> {
        self.intervals.lock().first_free().ok_or_else(|| self.no_free_region())
    }

    pub fn last_free_region(&self) -> ArbiterResult<Span> {
        self.intervals.lock().last_free().ok_or_else(|| self.no_free_region())
    }

    fn no_free_region(&self) -> ArbiterError {
        ArbiterError::NotFound {
            start: self.domain.start,
            end: self.domain.end,
            count: 1,
        }
    }

    /// Ordered view of every visible interval
    pub fn snapshot(&self) -> ArbiterSnapshot {
        let intervals = self.intervals.lock().infos();
        ArbiterSnapshot {
            id: self.id,
            description: self.description.clone(),
            kind: self.kind,
            domain: self.domain,
            intervals,
        }
    }

    pub fn stats(&self) -> ArbiterStats {
        self.intervals.lock().stats()
    }

    /// Any allocation record outstanding
    pub fn has_allocations(&self) -> bool {
        self.intervals.lock().has_allocations()
    }

    // =========================================================================
    // Reservation
    // =========================================================================

    /// Reserve an interval per `req`
    ///
    /// When `req` carries `ACTIVE` the reservation is activated atomically;
    /// if activation fails nothing is left reserved.
    pub fn reserve(self: &Arc<Self>, req: ReserveRequest) -> ArbiterResult<Resource> {
        let op = span_operation("reserve", self.id);
        let _entered = op.enter();
        let mut list = self.intervals.lock();
        let result = list.reserve(&req);
        op.record_result(result.is_ok());
        match result {
            Ok(id) => {
                let (span, flags) = list.record(id).map(|r| (r.span, r.flags))?;
                if self.config.log_operations {
                    debug!(
                        arbiter = %self.id,
                        interval = %id,
                        span = %span,
                        flags = ?flags,
                        owner = ?req.owner,
                        "Reserved interval"
                    );
                }
                self.verify(&list, "reserve");
                drop(list);
                Ok(Resource::new(Arc::clone(self), id, span))
            }
            Err(e) => {
                if !e.is_transient() {
                    warn!(arbiter = %self.id, error = %e, "Reservation rejected");
                } else if self.config.log_operations {
                    debug!(
                        arbiter = %self.id,
                        start = req.start,
                        end = req.end,
                        count = req.count,
                        error = %e,
                        "Reservation failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Reserve `count` points anywhere in the domain
    pub fn reserve_any(
        self: &Arc<Self>,
        count: Size,
        flags: ResourceFlags,
        owner: Option<OwnerId>,
    ) -> ArbiterResult<Resource> {
        let mut req = ReserveRequest::new(count)
            .within(self.domain.start, self.domain.end)
            .with_flags(flags);
        req.owner = owner;
        self.reserve(req)
    }

    // =========================================================================
    // Handle operations
    // =========================================================================

    pub(crate) fn activate(&self, id: IntervalId) -> ArbiterResult<()> {
        let mut list = self.intervals.lock();
        let result = list.activate(id);
        if let Err(ArbiterError::Busy(ref reason)) = result {
            warn!(arbiter = %self.id, interval = %id, %reason, "Activation contended");
        }
        self.verify(&list, "activate");
        result
    }

    pub(crate) fn deactivate(&self, id: IntervalId) -> ArbiterResult<()> {
        let mut list = self.intervals.lock();
        let wake = list.deactivate(id)?;
        self.wake(wake);
        self.verify(&list, "deactivate");
        Ok(())
    }

    /// Activate, sleeping while a time-share sibling holds the span
    ///
    /// `timeout` of `None` waits until activation succeeds or the arbiter's
    /// waiters are interrupted. A timed-out or interrupted wait leaves the
    /// interval inactive.
    pub(crate) fn await_activation(
        &self,
        id: IntervalId,
        priority: Priority,
        timeout: Option<Duration>,
    ) -> ArbiterResult<()> {
        let op = OperationSpan::blocking("await", self.id);
        let _entered = op.enter();
        let deadline = Deadline::after(timeout);
        let mut list = self.intervals.lock();
        let epoch = list.interrupt_epoch;

        loop {
            let (holder, group) = match list.try_activate(id)? {
                Contention::Clear => {
                    self.verify(&list, "await");
                    return Ok(());
                }
                Contention::HeldBy { holder, group } => (holder, group),
            };
            list.mark_wanted(holder, group)?;
            debug!(
                arbiter = %self.id,
                interval = %id,
                holder = %holder,
                group = %group,
                priority,
                "Waiting for time-share sibling"
            );

            let waited = self.waiters.wait(group, &mut list, deadline);
            // An interrupt outranks a timeout that raced with it
            let waited = if list.interrupt_epoch == epoch {
                waited
            } else {
                Err(WaitError::Cancelled)
            };
            match waited {
                Ok(()) => {}
                // The holder may have let go right at the deadline
                Err(WaitError::Timeout) => {
                    return match list.try_activate(id)? {
                        Contention::Clear => {
                            self.verify(&list, "await");
                            Ok(())
                        }
                        Contention::HeldBy { .. } => {
                            warn!(arbiter = %self.id, interval = %id, "Activation wait timed out");
                            op.record_result(false);
                            Err(ArbiterError::Timeout)
                        }
                    };
                }
                Err(cancelled) => {
                    op.record_result(false);
                    return Err(cancelled.into());
                }
            }
        }
    }

    /// Wake every sleeper in `await_activation` with `Interrupted`
    pub fn interrupt_waiters(&self) -> usize {
        let mut list = self.intervals.lock();
        list.interrupt_epoch = list.interrupt_epoch.wrapping_add(1);
        let woken = self.waiters.wake_everyone().count();
        drop(list);
        info!(arbiter = %self.id, woken, "Interrupted waiters");
        woken
    }

    pub(crate) fn release(&self, id: IntervalId) -> ArbiterResult<()> {
        let op = span_operation("release", self.id);
        let _entered = op.enter();
        let mut list = self.intervals.lock();
        let span = list.record(id)?.span;
        let wake = list.release(id)?;
        self.wake(wake);
        if self.config.log_operations {
            debug!(arbiter = %self.id, interval = %id, span = %span, "Released interval");
        }
        self.verify(&list, "release");
        Ok(())
    }

    pub(crate) fn adjust(&self, id: IntervalId, start: RangeValue, end: RangeValue) -> ArbiterResult<Span> {
        let mut list = self.intervals.lock();
        list.adjust(id, start, end)?;
        self.verify(&list, "adjust");
        Ok(list.record(id)?.span)
    }

    pub(crate) fn info(&self, id: IntervalId) -> ArbiterResult<IntervalInfo> {
        let list = self.intervals.lock();
        let record = list.record(id)?;
        Ok(list.info(record))
    }

    /// Read one field of an allocation record
    pub(crate) fn read<R>(&self, id: IntervalId, f: impl FnOnce(&IntervalRecord) -> R) -> ArbiterResult<R> {
        let list = self.intervals.lock();
        list.record(id).map(f)
    }

    /// Update one caller-owned field of an allocation record
    pub(crate) fn write(&self, id: IntervalId, f: impl FnOnce(&mut IntervalRecord)) -> ArbiterResult<()> {
        let mut list = self.intervals.lock();
        let record = list.record_mut(id)?;
        if !record.is_allocated() {
            return Err(ArbiterError::StaleHandle);
        }
        f(record);
        Ok(())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Drop every interval and refuse further use
    ///
    /// Fails with `Busy` while any allocation is outstanding.
    pub(crate) fn retire(&self) -> ArbiterResult<()> {
        let mut list = self.intervals.lock();
        list.ensure_live()?;
        if list.has_allocations() {
            let stats = list.stats();
            return Err(ArbiterError::Busy(format!(
                "{} has {} outstanding allocations",
                self.id, stats.allocation_records
            )));
        }
        list.clear();
        list.retired = true;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    #[inline]
    fn checked(&self) -> bool {
        self.config.trust == TrustPolicy::Checked
    }

    /// Notify waiters on `group`; called with the lock held
    fn wake(&self, group: Option<GroupId>) {
        if let Some(group) = group {
            let woken = self.waiters.wake_all(group);
            debug!(arbiter = %self.id, group = %group, woken = woken.count(), "Woke waiters");
        }
    }

    /// Check the tiling and share-group invariants under `Checked`
    fn verify(&self, list: &IntervalList, op: &'static str) {
        if !self.checked() {
            return;
        }
        if let Err(violation) = list.verify() {
            error!(arbiter = %self.id, op, %violation, "Interval list invariant violated");
            debug_assert!(false, "{} after {}: {}", self.id, op, violation);
        }
    }
}

impl fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arbiter")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("kind", &self.kind)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}
