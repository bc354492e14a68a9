/*!
 * Configuration Tests
 * File and environment loading, and the effect of config on arbiters
 */

use interval_arbiter::rman::{DomainKind, Registry, ReserveRequest};
use interval_arbiter::{ArbiterConfig, ArbiterError, TrustPolicy};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"trust": "checked", "await_timeout": null, "wait_slots": 8, "max_intervals": 64}}"#
    )
    .unwrap();

    let config = ArbiterConfig::from_file(file.path()).unwrap();
    assert_eq!(config.trust, TrustPolicy::Checked);
    assert_eq!(config.await_timeout, None);
    assert_eq!(config.wait_slots, 8);
    assert_eq!(config.max_intervals, Some(64));
}

#[test]
fn test_config_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ArbiterConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ArbiterError::InvalidArgument(_)));
}

#[test]
#[serial]
fn test_config_from_env() {
    std::env::set_var("ARBITER_TRUST", "checked");
    std::env::set_var("ARBITER_AWAIT_TIMEOUT_MS", "75");
    let config = ArbiterConfig::from_env();
    std::env::remove_var("ARBITER_TRUST");
    std::env::remove_var("ARBITER_AWAIT_TIMEOUT_MS");

    assert_eq!(config.trust, TrustPolicy::Checked);
    assert_eq!(config.await_timeout, Some(Duration::from_millis(75)));
}

#[test]
fn test_invalid_config_rejected_at_init() {
    let registry = Registry::new();
    let config = ArbiterConfig::default().with_wait_slots(6);
    let err = registry
        .init_with_config("bad", DomainKind::Interval, 0, 9, config)
        .unwrap_err();
    assert!(matches!(err, ArbiterError::InvalidArgument(_)));
    assert!(registry.is_empty());
}

#[test]
fn test_checked_policy_rejects_overlapping_seed() {
    let registry = Registry::new();
    let checked = registry
        .init_with_config("checked", DomainKind::Interval, 0, 99, ArbiterConfig::checked())
        .unwrap();
    checked.seed(0, 49).unwrap();
    assert_eq!(
        checked.seed(40, 59).unwrap_err(),
        ArbiterError::Overlap { start: 40, end: 59 }
    );

    // Trusted arbiters take the caller's word for it
    let trusted = registry.init("trusted", DomainKind::Interval, 0, 99).unwrap();
    trusted.seed(0, 49).unwrap();
    trusted.seed(50, 99).unwrap();
    let res = trusted.reserve(ReserveRequest::new(60)).unwrap_err();
    // Adjacent seeds stay separate nodes, so 60 does not fit in either
    assert!(matches!(res, ArbiterError::NotFound { .. }));
}
