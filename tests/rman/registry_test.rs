/*!
 * Registry Tests
 * Global registry lifecycle and introspection
 */

use interval_arbiter::rman::{DomainKind, Registry, ReserveRequest};
use interval_arbiter::{ArbiterError, ResourceGuard};
use pretty_assertions::assert_eq;
use serial_test::serial;

#[test]
#[serial]
fn test_global_registry_lifecycle() {
    let registry = Registry::global();
    let baseline = registry.len();

    let mem = registry
        .init("global memory", DomainKind::Interval, 0x1000_0000, 0x1fff_ffff)
        .unwrap();
    mem.seed(0x1000_0000, 0x1fff_ffff).unwrap();
    assert_eq!(registry.len(), baseline + 1);
    assert!(std::ptr::eq(Registry::global(), registry));

    let window = ResourceGuard::new(
        mem.reserve(ReserveRequest::new(0x10_0000).with_alignment(20))
            .unwrap(),
    );
    assert!(matches!(registry.teardown(&mem), Err(ArbiterError::Busy(_))));
    drop(window);

    registry.teardown(&mem).unwrap();
    assert_eq!(registry.len(), baseline);
    assert!(registry.get(mem.id()).is_none());
}

#[test]
#[serial]
fn test_global_snapshot_lists_arbiters() {
    let registry = Registry::global();
    let ports = registry.init("global ports", DomainKind::Interval, 0, 0xffff).unwrap();
    let irqs = registry.init("global irqs", DomainKind::Interval, 0, 15).unwrap();
    ports.seed(0, 0xffff).unwrap();
    irqs.seed(0, 15).unwrap();

    let snapshots = registry.snapshot();
    let ours: Vec<_> = snapshots
        .iter()
        .filter(|s| s.id == ports.id() || s.id == irqs.id())
        .map(|s| (s.description.as_str(), s.intervals.len()))
        .collect();
    assert_eq!(ours, vec![("global ports", 1), ("global irqs", 1)]);

    registry.teardown(&ports).unwrap();
    registry.teardown(&irqs).unwrap();
}

#[test]
fn test_independent_registries_are_isolated() {
    let left = Registry::new();
    let right = Registry::new();
    let arbiter = left.init("left", DomainKind::Interval, 0, 9).unwrap();

    assert!(right.get(arbiter.id()).is_none());
    assert!(right.find("left").is_none());
    assert_eq!(left.find("left").unwrap().id(), arbiter.id());
}
