/*!
 * Arbiter Registry
 *
 * Tracks every live arbiter. The registry map is only touched to register
 * or remove an arbiter and is never held while an arbiter's own lock is.
 */

use super::arbiter::Arbiter;
use super::types::{ArbiterSnapshot, DomainKind};
use crate::core::config::ArbiterConfig;
use crate::core::errors::{ArbiterError, ArbiterResult};
use crate::core::id::ArbiterId;
use crate::core::types::{RangeValue, Span};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tracing::info;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Set of live arbiters
#[derive(Debug, Default)]
pub struct Registry {
    arbiters: DashMap<ArbiterId, Arc<Arbiter>, RandomState>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            arbiters: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Process-wide registry, created on first use
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    /// Create and register an arbiter over `[start, end]` with default config
    pub fn init(
        &self,
        description: impl Into<String>,
        kind: DomainKind,
        start: RangeValue,
        end: RangeValue,
    ) -> ArbiterResult<Arc<Arbiter>> {
        self.init_with_config(description, kind, start, end, ArbiterConfig::default())
    }

    pub fn init_with_config(
        &self,
        description: impl Into<String>,
        kind: DomainKind,
        start: RangeValue,
        end: RangeValue,
        config: ArbiterConfig,
    ) -> ArbiterResult<Arc<Arbiter>> {
        let arbiter = Arc::new(Arbiter::new(description, kind, Span::new(start, end), config)?);
        self.arbiters.insert(arbiter.id(), Arc::clone(&arbiter));
        Ok(arbiter)
    }

    /// Destroy an arbiter that has no outstanding allocations
    ///
    /// Fails with `Busy` while any interval is allocated. On success every
    /// interval is dropped, the arbiter is removed from the registry and
    /// further seeding or reservation fails with `InvalidState`.
    pub fn teardown(&self, arbiter: &Arbiter) -> ArbiterResult<()> {
        let id = arbiter.id();
        if !self.arbiters.contains_key(&id) {
            return Err(ArbiterError::InvalidArgument(format!(
                "{} is not registered here",
                id
            )));
        }

        // Arbiter lock is released before the registry shard is taken
        arbiter.retire()?;
        self.arbiters.remove(&id);
        info!(arbiter = %id, description = %arbiter.description(), "Arbiter torn down");
        Ok(())
    }

    pub fn get(&self, id: ArbiterId) -> Option<Arc<Arbiter>> {
        self.arbiters.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Find an arbiter by its description
    pub fn find(&self, description: &str) -> Option<Arc<Arbiter>> {
        self.arbiters
            .iter()
            .find(|entry| entry.value().description() == description)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.arbiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arbiters.is_empty()
    }

    /// Registered arbiters in creation order
    pub fn arbiters(&self) -> Vec<Arc<Arbiter>> {
        let mut all: Vec<_> = self
            .arbiters
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by_key(|a| a.id());
        all
    }

    /// Snapshot of every registered arbiter, one lock at a time
    pub fn snapshot(&self) -> Vec<ArbiterSnapshot> {
        self.arbiters().iter().map(|a| a.snapshot()).collect()
    }
}
