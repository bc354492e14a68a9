/*!
 * Sharing Tests
 * Share group formation, promotion and dissolution
 */

use interval_arbiter::rman::{DomainKind, Registry, ReserveRequest, ResourceFlags, Tenancy};
use interval_arbiter::{ArbiterConfig, ArbiterError, Resource, Span};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

fn shared_arbiter(registry: &Registry) -> std::sync::Arc<interval_arbiter::Arbiter> {
    let arbiter = registry
        .init_with_config("shared", DomainKind::Interval, 0, 0xff, ArbiterConfig::checked())
        .unwrap();
    arbiter.seed(0, 0xff).unwrap();
    arbiter
}

#[test]
fn test_identical_shareable_reservations() {
    let registry = Registry::new();
    let arbiter = shared_arbiter(&registry);
    let req = ReserveRequest::at(0x40, 0x10).shareable();

    let handles: Vec<Resource> = (0..4).map(|_| arbiter.reserve(req.clone()).unwrap()).collect();
    let ids: HashSet<_> = handles.iter().map(|h| h.interval_id()).collect();
    assert_eq!(ids.len(), 4);
    assert!(handles.iter().all(|h| h.span() == Span::new(0x40, 0x4f)));

    let stats = arbiter.stats();
    assert_eq!(stats.share_groups, 1);
    assert_eq!(stats.allocation_records, 4);
    assert_eq!(stats.allocated_intervals, 1);

    // Exactly one member is visible in the ordered list
    let first: Vec<_> = handles
        .iter()
        .filter(|h| h.flags().unwrap().contains(ResourceFlags::FIRSTSHARE))
        .collect();
    assert_eq!(first.len(), 1);
    assert_eq!(handles[0].info().unwrap().sharers, 4);

    let mut handles = handles.into_iter();
    for h in handles.by_ref().take(3) {
        h.release().unwrap();
    }
    let last = handles.next().unwrap();
    assert_eq!(last.info().unwrap().tenancy, Tenancy::Exclusive);
    let snapshot = arbiter.snapshot();
    assert_eq!(snapshot.intervals.len(), 3);
    assert_eq!(snapshot.intervals[1].span(), Span::new(0x40, 0x4f));

    last.release().unwrap();
    assert_eq!(arbiter.snapshot().intervals.len(), 1);
    assert_eq!(arbiter.first_free_region().unwrap(), Span::new(0, 0xff));
}

#[test]
fn test_share_requires_exact_extent() {
    let registry = Registry::new();
    let arbiter = registry.init("exact", DomainKind::Interval, 0, 0x1f).unwrap();
    arbiter.seed(0, 0x1f).unwrap();

    let _whole = arbiter
        .reserve(ReserveRequest::new(0x20).shareable())
        .unwrap();
    // Smaller span inside a shared allocation is never carved out
    let err = arbiter
        .reserve(ReserveRequest::new(0x10).shareable())
        .unwrap_err();
    assert!(matches!(err, ArbiterError::NotFound { .. }));
    assert_eq!(arbiter.stats().share_groups, 0);
}

#[test]
fn test_share_requires_compatible_mode() {
    let registry = Registry::new();
    let arbiter = registry.init("mode", DomainKind::Interval, 0, 7).unwrap();
    arbiter.seed(0, 7).unwrap();

    let _plain = arbiter.reserve(ReserveRequest::new(8).shareable()).unwrap();
    let err = arbiter
        .reserve(ReserveRequest::new(8).timeshare())
        .unwrap_err();
    assert!(matches!(err, ArbiterError::NotFound { .. }));

    let _second = arbiter.reserve(ReserveRequest::new(8).shareable()).unwrap();
    assert_eq!(arbiter.stats().share_groups, 1);
}

#[test]
fn test_share_respects_alignment_of_candidate() {
    let registry = Registry::new();
    let arbiter = registry.init("align", DomainKind::Interval, 0, 0x2f).unwrap();
    arbiter.seed(0, 0x2f).unwrap();

    let _pad = arbiter.reserve(ReserveRequest::new(8)).unwrap();
    let host = arbiter
        .reserve(ReserveRequest::new(0x10).within(8, 0x17).shareable())
        .unwrap();
    assert_eq!(host.start(), 8);
    let _rest = arbiter.reserve(ReserveRequest::new(0x18)).unwrap();

    // Host starts at 8, which is not 16-aligned
    let err = arbiter
        .reserve(ReserveRequest::new(0x10).with_alignment(4).shareable())
        .unwrap_err();
    assert!(matches!(err, ArbiterError::NotFound { .. }));

    let sharer = arbiter
        .reserve(ReserveRequest::new(0x10).with_alignment(3).shareable())
        .unwrap();
    assert_eq!(sharer.span(), host.span());
}

#[test]
fn test_first_member_release_promotes_successor() {
    let registry = Registry::new();
    let arbiter = shared_arbiter(&registry);
    let req = ReserveRequest::at(0, 0x100).shareable();
    let a = arbiter.reserve(req.clone()).unwrap();
    let b = arbiter.reserve(req.clone()).unwrap();
    let c = arbiter.reserve(req).unwrap();
    assert!(a.flags().unwrap().contains(ResourceFlags::FIRSTSHARE));

    a.release().unwrap();
    let visible = arbiter.snapshot().intervals[0].id;
    assert!(visible == b.interval_id() || visible == c.interval_id());
    assert_eq!(arbiter.stats().share_groups, 1);
    assert_eq!(arbiter.stats().allocation_records, 2);
}
