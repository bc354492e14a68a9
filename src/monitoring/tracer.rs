/*!
 * Tracing
 * Structured tracing for arbiter operations using the tracing crate
 *
 * Features:
 * - JSON-formatted logs for structured parsing
 * - Per-operation spans carrying the arbiter id
 * - Slow-operation warnings with elapsed time, skipped for blocking waits
 */

use crate::core::id::ArbiterId;
use crate::core::limits::ENV_TRACE_JSON;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Operations slower than this are reported at `warn`
const SLOW_OPERATION_MS: u128 = 10;

static OPERATION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - ARBITER_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Arbiter tracing initialized");
    }
    installed
}

/// Span for one arbiter operation, timed on drop
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    seq: u64,
    /// Expected to sleep; never reported as slow
    blocking: bool,
}

impl OperationSpan {
    pub fn new(operation: &'static str, arbiter: ArbiterId) -> Self {
        Self::build(operation, arbiter, false)
    }

    /// Span for an operation that parks the caller by contract
    pub fn blocking(operation: &'static str, arbiter: ArbiterId) -> Self {
        Self::build(operation, arbiter, true)
    }

    fn build(operation: &'static str, arbiter: ArbiterId, blocking: bool) -> Self {
        let seq = OPERATION_SEQ.fetch_add(1, Ordering::Relaxed);
        let span = span!(
            Level::DEBUG,
            "arbiter_op",
            op = operation,
            arbiter = %arbiter,
            seq,
            blocking,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            seq,
            blocking,
        }
    }

    fn is_slow(&self, elapsed: Duration) -> bool {
        !self.blocking && elapsed.as_millis() > SLOW_OPERATION_MS
    }

    /// Sequence number correlating events of this operation
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn record_result(&self, success: bool) {
        self.span.record("result", if success { "success" } else { "error" });
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_us", duration.as_micros() as u64);
        let _entered = self.span.enter();

        if self.is_slow(duration) {
            warn!(
                seq = self.seq,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow arbiter operation"
            );
        } else {
            debug!(seq = self.seq, duration_us = duration.as_micros() as u64, "operation completed");
        }
    }
}

/// Helper to create an operation span
#[inline]
pub fn span_operation(name: &'static str, arbiter: ArbiterId) -> OperationSpan {
    OperationSpan::new(name, arbiter)
}
