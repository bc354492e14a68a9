/*!
 * Resource Arbiter
 *
 * Arbitrates contiguous intervals of numeric resource domains (I/O ports,
 * memory windows, interrupt lines) between competing consumers.
 *
 * ## Features
 *
 * - **First-fit reservation**: ascending scan with alignment and boundary
 *   constraints, splitting free intervals as needed
 * - **Sharing**: identical-extent reservations join a share group
 * - **Time-sharing**: at most one active member per time-share group, with
 *   blocking `await_activation`
 * - **Coalescing**: released intervals merge with adjacent free neighbours
 *
 * ## Example
 *
 * ```
 * use interval_arbiter::rman::{DomainKind, Registry, ReserveRequest};
 *
 * let registry = Registry::new();
 * let ports = registry.init("I/O ports", DomainKind::Interval, 0, 0xffff).unwrap();
 * ports.seed(0, 0xffff).unwrap();
 *
 * let uart = ports.reserve(ReserveRequest::at(0x3f8, 8)).unwrap();
 * assert_eq!(uart.end(), 0x3ff);
 * uart.release().unwrap();
 * registry.teardown(&ports).unwrap();
 * ```
 */

mod activation;
mod arbiter;
mod interval;
mod registry;
mod release;
mod reserve;
mod resource;
mod types;

pub use arbiter::Arbiter;
pub use registry::Registry;
pub use resource::Resource;
pub use types::{
    make_alignment_flags, ArbiterSnapshot, ArbiterStats, DomainKind, IntervalInfo,
    ReserveRequest, ResourceFlags, Tenancy,
};
