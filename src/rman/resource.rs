/*!
 * Resource Handles
 *
 * A `Resource` is the caller's handle to one allocation record. It is not
 * `Clone`, and `release` consumes it, so a record cannot be released twice
 * through the same handle.
 */

use super::arbiter::Arbiter;
use super::types::{IntervalInfo, ResourceFlags};
use crate::core::errors::ArbiterResult;
use crate::core::id::IntervalId;
use crate::core::types::{OwnerId, Priority, RangeValue, Size, Span};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Handle to one reserved interval
///
/// Dropping a `Resource` does not release it; wrap it in a
/// [`ResourceGuard`](crate::core::guard::ResourceGuard) for scoped release.
pub struct Resource {
    arbiter: Arc<Arbiter>,
    id: IntervalId,
    /// Bounds at reservation; only `adjust` through this handle moves them
    span: Span,
}

impl Resource {
    pub(crate) fn new(arbiter: Arc<Arbiter>, id: IntervalId, span: Span) -> Self {
        Self { arbiter, id, span }
    }

    #[inline]
    pub fn interval_id(&self) -> IntervalId {
        self.id
    }

    #[inline]
    pub fn arbiter(&self) -> &Arc<Arbiter> {
        &self.arbiter
    }

    #[inline]
    pub fn start(&self) -> RangeValue {
        self.span.start
    }

    #[inline]
    pub fn end(&self) -> RangeValue {
        self.span.end
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.span.len()
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }

    // =========================================================================
    // Record fields
    // =========================================================================

    /// Flags including the derived `ALLOCATED` and `FIRSTSHARE` bits
    pub fn flags(&self) -> ArbiterResult<ResourceFlags> {
        self.info().map(|info| info.flags)
    }

    pub fn is_active(&self) -> ArbiterResult<bool> {
        self.arbiter.read(self.id, |r| r.is_active())
    }

    pub fn owner(&self) -> ArbiterResult<Option<OwnerId>> {
        self.arbiter.read(self.id, |r| r.owner)
    }

    pub fn set_owner(&self, owner: Option<OwnerId>) -> ArbiterResult<()> {
        self.arbiter.write(self.id, |r| r.owner = owner)
    }

    /// Caller-assigned resource id within the owner
    pub fn rid(&self) -> ArbiterResult<u32> {
        self.arbiter.read(self.id, |r| r.rid)
    }

    pub fn set_rid(&self, rid: u32) -> ArbiterResult<()> {
        self.arbiter.write(self.id, |r| r.rid = rid)
    }

    /// Opaque address stored by a mapping facility
    pub fn mapped_address(&self) -> ArbiterResult<Option<usize>> {
        self.arbiter.read(self.id, |r| r.mapped)
    }

    pub fn set_mapped_address(&self, address: Option<usize>) -> ArbiterResult<()> {
        self.arbiter.write(self.id, |r| r.mapped = address)
    }

    pub fn info(&self) -> ArbiterResult<IntervalInfo> {
        self.arbiter.info(self.id)
    }

    // =========================================================================
    // Activation
    // =========================================================================

    /// Mark active; `Busy` while a time-share sibling is active
    pub fn activate(&self) -> ArbiterResult<()> {
        self.arbiter.activate(self.id)
    }

    pub fn deactivate(&self) -> ArbiterResult<()> {
        self.arbiter.deactivate(self.id)
    }

    /// Activate, blocking while a time-share sibling is active
    ///
    /// Fails with `Timeout` once `timeout` elapses or `Interrupted` when
    /// the arbiter's waiters are interrupted. `None` waits indefinitely.
    pub fn await_activation(&self, priority: Priority, timeout: Option<Duration>) -> ArbiterResult<()> {
        self.arbiter.await_activation(self.id, priority, timeout)
    }

    /// `await_activation` with the arbiter's configured timeout
    pub fn await_default(&self, priority: Priority) -> ArbiterResult<()> {
        let timeout = self.arbiter.config().await_timeout;
        self.arbiter.await_activation(self.id, priority, timeout)
    }

    // =========================================================================
    // Lifetime
    // =========================================================================

    /// Return the interval to the arbiter
    pub fn release(self) -> ArbiterResult<()> {
        self.arbiter.release(self.id)
    }

    /// Move the bounds to `[start, end]`, taking or giving back adjacent free space
    pub fn adjust(&mut self, start: RangeValue, end: RangeValue) -> ArbiterResult<()> {
        self.span = self.arbiter.adjust(self.id, start, end)?;
        Ok(())
    }

    pub fn set_start(&mut self, start: RangeValue) -> ArbiterResult<()> {
        self.adjust(start, self.span.end)
    }

    pub fn set_end(&mut self, end: RangeValue) -> ArbiterResult<()> {
        self.adjust(self.span.start, end)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("arbiter", &self.arbiter.id())
            .field("id", &self.id)
            .field("span", &self.span)
            .finish()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} in {}", self.id, self.span, self.arbiter.id())
    }
}
