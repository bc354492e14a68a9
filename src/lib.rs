/*!
 * Interval Arbiter Library
 * Allocation of contiguous intervals of numeric resource domains
 *
 * An [`Arbiter`] manages one domain (I/O ports, memory windows, interrupt
 * lines...) as an ordered list of free and allocated intervals. Consumers
 * reserve intervals under alignment and boundary constraints, optionally
 * share them, activate them, and release them back for coalescing.
 */

pub mod core;
pub mod monitoring;
pub mod rman;

// Re-exports
pub use crate::core::{
    ArbiterConfig, ArbiterError, ArbiterId, ArbiterResult, GroupId, IntervalId, OwnerId,
    ResourceGuard, Span, TrustPolicy,
};
pub use monitoring::init_tracing;
pub use rman::{
    make_alignment_flags, Arbiter, ArbiterSnapshot, ArbiterStats, DomainKind, IntervalInfo,
    Registry, ReserveRequest, Resource, ResourceFlags, Tenancy,
};
