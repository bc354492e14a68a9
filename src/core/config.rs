/*!
 * Arbiter Configuration
 *
 * Runtime configuration for trust policy, blocking waits and node budgets.
 * Loadable from JSON or from `ARBITER_*` environment variables.
 */

use super::errors::{ArbiterError, ArbiterResult};
use super::limits::{
    DEFAULT_AWAIT_TIMEOUT, DEFAULT_WAIT_SLOTS, ENV_AWAIT_TIMEOUT_MS, ENV_MAX_INTERVALS, ENV_TRUST,
    ENV_WAIT_SLOTS, MAX_WAIT_SLOTS,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// How much the arbiter trusts its callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustPolicy {
    /// Cooperating callers: seeded spans are assumed disjoint
    #[default]
    Trusted,
    /// Reject overlapping seeds and verify tiling after every mutation
    Checked,
}

impl FromStr for TrustPolicy {
    type Err = ArbiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trusted" => Ok(TrustPolicy::Trusted),
            "checked" => Ok(TrustPolicy::Checked),
            other => Err(ArbiterError::InvalidArgument(format!(
                "unknown trust policy '{}'",
                other
            ))),
        }
    }
}

/// Per-arbiter configuration
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub trust: TrustPolicy,
    /// Timeout used by `await_default`; `None` waits forever
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub await_timeout: Option<Duration>,
    /// Number of condvar slots backing the per-group wait channels
    pub wait_slots: usize,
    /// Node budget; reaching it fails with `OutOfMemory`
    pub max_intervals: Option<usize>,
    /// Emit a debug event for every reserve/release
    pub log_operations: bool,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            trust: TrustPolicy::Trusted,
            await_timeout: Some(DEFAULT_AWAIT_TIMEOUT),
            wait_slots: DEFAULT_WAIT_SLOTS,
            max_intervals: None,
            log_operations: true,
        }
    }
}

impl ArbiterConfig {
    /// Configuration with validation enabled
    pub fn checked() -> Self {
        Self {
            trust: TrustPolicy::Checked,
            ..Default::default()
        }
    }

    pub fn with_trust(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    pub fn with_await_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.await_timeout = timeout;
        self
    }

    pub fn with_wait_slots(mut self, slots: usize) -> Self {
        self.wait_slots = slots;
        self
    }

    pub fn with_max_intervals(mut self, max: usize) -> Self {
        self.max_intervals = Some(max);
        self
    }

    /// Build from `ARBITER_*` environment variables over the defaults
    ///
    /// Environment variables:
    /// - ARBITER_TRUST: `trusted` or `checked`
    /// - ARBITER_AWAIT_TIMEOUT_MS: default await timeout (0 waits forever)
    /// - ARBITER_WAIT_SLOTS: condvar slots per arbiter (power of two)
    /// - ARBITER_MAX_INTERVALS: node budget per arbiter
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TRUST) {
            match raw.parse() {
                Ok(trust) => config.trust = trust,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring {}", ENV_TRUST),
            }
        }

        if let Some(raw) = lookup(ENV_AWAIT_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.await_timeout = None,
                Ok(ms) => config.await_timeout = Some(Duration::from_millis(ms)),
                Err(e) => warn!(value = %raw, error = %e, "Ignoring {}", ENV_AWAIT_TIMEOUT_MS),
            }
        }

        if let Some(raw) = lookup(ENV_WAIT_SLOTS) {
            match raw.trim().parse::<usize>() {
                Ok(slots) if Self::valid_slots(slots) => config.wait_slots = slots,
                _ => warn!(value = %raw, "Ignoring {}: expected a power of two", ENV_WAIT_SLOTS),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_INTERVALS) {
            match raw.trim().parse::<usize>() {
                Ok(max) if max > 0 => config.max_intervals = Some(max),
                _ => warn!(value = %raw, "Ignoring {}", ENV_MAX_INTERVALS),
            }
        }

        config
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> ArbiterResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ArbiterError::InvalidArgument(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ArbiterResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ArbiterError::InvalidArgument(format!("config {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> ArbiterResult<()> {
        if !Self::valid_slots(self.wait_slots) {
            return Err(ArbiterError::InvalidArgument(format!(
                "wait_slots must be a power of two no larger than {}, got {}",
                MAX_WAIT_SLOTS, self.wait_slots
            )));
        }
        if self.max_intervals == Some(0) {
            return Err(ArbiterError::InvalidArgument(
                "max_intervals must be positive".into(),
            ));
        }
        Ok(())
    }

    fn valid_slots(slots: usize) -> bool {
        slots.is_power_of_two() && slots <= MAX_WAIT_SLOTS
    }
}
