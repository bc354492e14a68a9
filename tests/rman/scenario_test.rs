/*!
 * Reservation Scenario Tests
 * First-fit placement, hole reuse and coalescing through the public API
 */

use interval_arbiter::rman::{DomainKind, Registry, ReserveRequest};
use interval_arbiter::{ArbiterConfig, ArbiterError, Span};
use pretty_assertions::assert_eq;

fn layout(snapshot: &interval_arbiter::ArbiterSnapshot) -> Vec<(u64, u64, bool)> {
    snapshot
        .intervals
        .iter()
        .map(|i| (i.start, i.end, i.is_allocated()))
        .collect()
}

#[test]
fn test_first_fit_reuses_hole() {
    let registry = Registry::new();
    let arbiter = registry
        .init_with_config("scenario", DomainKind::Interval, 0, 99, ArbiterConfig::checked())
        .unwrap();
    arbiter.seed(0, 99).unwrap();

    let a = arbiter.reserve(ReserveRequest::new(10)).unwrap();
    assert_eq!(a.span(), Span::new(0, 9));
    let b = arbiter.reserve(ReserveRequest::new(10)).unwrap();
    assert_eq!(b.span(), Span::new(10, 19));

    a.release().unwrap();
    let c = arbiter.reserve(ReserveRequest::new(5)).unwrap();
    assert_eq!(c.span(), Span::new(0, 4));
    assert_eq!(
        layout(&arbiter.snapshot()),
        vec![(0, 4, true), (5, 9, false), (10, 19, true), (20, 99, false)]
    );

    b.release().unwrap();
    c.release().unwrap();
    assert_eq!(layout(&arbiter.snapshot()), vec![(0, 99, false)]);

    registry.teardown(&arbiter).unwrap();
}

#[test]
fn test_multiple_seeded_spans() {
    let registry = Registry::new();
    let arbiter = registry.init("ports", DomainKind::Interval, 0, 0xffff).unwrap();
    arbiter.seed(0x1000, 0x10ff).unwrap();
    arbiter.seed(0x100, 0x1ff).unwrap();

    assert!(arbiter.is_region_managed(0x100, 0x1ff));
    assert!(!arbiter.is_region_managed(0x100, 0x1000));

    // Lowest seeded span wins
    let low = arbiter.reserve(ReserveRequest::new(0x80)).unwrap();
    assert_eq!(low.start(), 0x100);

    // Too big for what is left of the low span
    let high = arbiter.reserve(ReserveRequest::new(0x100)).unwrap();
    assert_eq!(high.span(), Span::new(0x1000, 0x10ff));

    assert_eq!(arbiter.first_free_region().unwrap(), Span::new(0x180, 0x1ff));
    assert_eq!(arbiter.last_free_region().unwrap(), Span::new(0x180, 0x1ff));

    low.release().unwrap();
    high.release().unwrap();
    // Separately seeded spans never merge across the gap
    assert_eq!(arbiter.stats().free_intervals, 2);
}

#[test]
fn test_release_merges_adjacent_seeds() {
    let registry = Registry::new();
    let arbiter = registry.init("adjacent", DomainKind::Interval, 0, 19).unwrap();
    arbiter.seed(0, 9).unwrap();
    arbiter.seed(10, 19).unwrap();
    assert_eq!(arbiter.stats().free_intervals, 2);

    let res = arbiter.reserve(ReserveRequest::new(10)).unwrap();
    assert_eq!(res.span(), Span::new(0, 9));
    res.release().unwrap();

    assert_eq!(arbiter.stats().free_intervals, 1);
    assert_eq!(arbiter.first_free_region().unwrap(), Span::new(0, 19));
}

#[test]
fn test_not_found_is_side_effect_free() {
    let registry = Registry::new();
    let arbiter = registry.init("small", DomainKind::Interval, 0, 15).unwrap();
    arbiter.seed(0, 15).unwrap();
    let _held = arbiter.reserve(ReserveRequest::new(8)).unwrap();

    let before = arbiter.snapshot();
    let err = arbiter
        .reserve(ReserveRequest::new(8).with_alignment(4))
        .unwrap_err();
    assert_eq!(err, ArbiterError::NotFound { start: 0, end: u64::MAX, count: 8 });
    assert_eq!(arbiter.snapshot(), before);
}

#[test]
fn test_node_budget_exhaustion() {
    let registry = Registry::new();
    let config = ArbiterConfig::default().with_max_intervals(3);
    let arbiter = registry
        .init_with_config("tight", DomainKind::Interval, 0, 99, config)
        .unwrap();
    arbiter.seed(0, 99).unwrap();

    let a = arbiter.reserve(ReserveRequest::new(10)).unwrap();
    let _b = arbiter.reserve(ReserveRequest::new(10)).unwrap();
    let before = arbiter.snapshot();

    // A middle carve needs two more nodes
    let err = arbiter
        .reserve(ReserveRequest::new(5).within(50, 99))
        .unwrap_err();
    assert!(matches!(err, ArbiterError::OutOfMemory { .. }));
    assert_eq!(arbiter.snapshot(), before);

    // Releasing needs no new node
    a.release().unwrap();
}

#[test]
fn test_snapshot_serializes() {
    let registry = Registry::new();
    let arbiter = registry.init("json", DomainKind::Interval, 0, 9).unwrap();
    arbiter.seed(0, 9).unwrap();
    let _r = arbiter
        .reserve(ReserveRequest::new(4).with_owner(interval_arbiter::OwnerId(1)))
        .unwrap();

    let json = serde_json::to_value(arbiter.snapshot()).unwrap();
    assert_eq!(json["kind"], "interval");
    assert_eq!(json["intervals"][0]["start"], 0);
    assert_eq!(json["intervals"][0]["owner"], 1);
    assert_eq!(json["intervals"][0]["tenancy"]["tenancy"], "exclusive");
    assert_eq!(json["intervals"][1]["tenancy"]["tenancy"], "free");
}
