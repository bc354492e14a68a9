/*!
 * Property Tests
 * Tiling, round-trip, alignment, boundary and window properties over random workloads
 */

use interval_arbiter::rman::{DomainKind, Registry, ReserveRequest};
use interval_arbiter::{Arbiter, ArbiterConfig, ArbiterError, ArbiterSnapshot, Resource};
use proptest::prelude::*;
use std::sync::Arc;

const DOMAIN_END: u64 = 0x3ff;

#[derive(Debug, Clone)]
enum Op {
    Reserve {
        count: u64,
        align: u8,
        boundary_exp: Option<u8>,
        shareable: bool,
    },
    Release(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1u64..=64, 0u8..=6, proptest::option::of(6u8..=8), any::<bool>()).prop_map(
            |(count, align, boundary_exp, shareable)| Op::Reserve {
                count,
                align,
                boundary_exp,
                shareable,
            }
        ),
        2 => any::<usize>().prop_map(Op::Release),
    ]
}

fn fresh_arbiter() -> Arc<Arbiter> {
    let registry = Registry::new();
    let arbiter = registry
        .init_with_config("prop", DomainKind::Interval, 0, DOMAIN_END, ArbiterConfig::checked())
        .unwrap();
    arbiter.seed(0, DOMAIN_END).unwrap();
    arbiter
}

fn layout(snapshot: &ArbiterSnapshot) -> Vec<(u64, u64, bool)> {
    snapshot
        .intervals
        .iter()
        .map(|i| (i.start, i.end, i.is_allocated()))
        .collect()
}

/// Sorted, disjoint, and exactly covering the seeded domain
fn assert_tiles(snapshot: &ArbiterSnapshot) {
    let mut cursor = 0u64;
    for info in &snapshot.intervals {
        assert!(info.start <= info.end);
        assert_eq!(info.start, cursor, "gap or overlap at {:#x}", info.start);
        cursor = info.end + 1;
    }
    assert_eq!(cursor, DOMAIN_END + 1);
}

fn request(count: u64, align: u8, boundary_exp: Option<u8>, shareable: bool) -> ReserveRequest {
    let mut req = ReserveRequest::new(count).with_alignment(align);
    if let Some(exp) = boundary_exp {
        req = req.with_boundary(1 << exp);
    }
    if shareable {
        req = req.shareable();
    }
    req
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_tiling_survives_any_workload(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let arbiter = fresh_arbiter();
        let mut held: Vec<Resource> = Vec::new();

        for op in ops {
            match op {
                Op::Reserve { count, align, boundary_exp, shareable } => {
                    match arbiter.reserve(request(count, align, boundary_exp, shareable)) {
                        Ok(res) => {
                            prop_assert_eq!(res.size(), count);
                            prop_assert_eq!(res.start() % (1u64 << align), 0);
                            if let Some(exp) = boundary_exp {
                                let mask = !((1u64 << exp) - 1);
                                prop_assert_eq!((res.start() ^ res.end()) & mask, 0);
                            }
                            held.push(res);
                        }
                        Err(ArbiterError::NotFound { .. }) => {}
                        Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                    }
                }
                Op::Release(pick) => {
                    if !held.is_empty() {
                        let res = held.swap_remove(pick % held.len());
                        res.release().unwrap();
                    }
                }
            }
            assert_tiles(&arbiter.snapshot());
        }

        for res in held {
            res.release().unwrap();
        }
        let snapshot = arbiter.snapshot();
        prop_assert_eq!(layout(&snapshot), vec![(0, DOMAIN_END, false)]);
    }

    #[test]
    fn prop_reserve_release_round_trip(
        prefix in proptest::collection::vec((1u64..=48, 0u8..=4), 0..12),
        count in 1u64..=64,
        align in 0u8..=6,
    ) {
        let arbiter = fresh_arbiter();
        let mut held = Vec::new();
        for (i, (c, a)) in prefix.into_iter().enumerate() {
            if let Ok(res) = arbiter.reserve(ReserveRequest::new(c).with_alignment(a)) {
                // Punch holes so the last reservation meets a fragmented list
                if i % 3 == 0 {
                    res.release().unwrap();
                } else {
                    held.push(res);
                }
            }
        }

        let before = layout(&arbiter.snapshot());
        if let Ok(res) = arbiter.reserve(ReserveRequest::new(count).with_alignment(align)) {
            res.release().unwrap();
        }
        prop_assert_eq!(layout(&arbiter.snapshot()), before);
    }

    #[test]
    fn prop_window_bounds_the_start(
        start in 0u64..=DOMAIN_END,
        len in 0u64..=256,
        count in 1u64..=32,
        align in 0u8..=5,
    ) {
        let arbiter = fresh_arbiter();
        let end = (start + len).min(DOMAIN_END);
        // One free node: first fit is the aligned window start, kept while the node holds it
        let mask = (1u64 << align) - 1;
        let expected = (start + mask) & !mask;
        let fits = expected + count - 1 <= DOMAIN_END;

        match arbiter.reserve(ReserveRequest::new(count).within(start, end).with_alignment(align)) {
            Ok(res) => {
                prop_assert!(fits);
                prop_assert_eq!(res.start(), expected);
                prop_assert_eq!(res.end(), expected + count - 1);
            }
            Err(e) => {
                prop_assert!(!fits);
                prop_assert!(matches!(e, ArbiterError::NotFound { .. }), "expected NotFound, got {:?}", e);
            }
        }
    }
}
