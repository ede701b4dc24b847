//! Integration tests for the account registry.
//!
//! Covers the registry as downstream crates use it:
//! 1. Resolving environments by name
//! 2. Declaration order of `all()`
//! 3. Serializing a registry for reports

use stackguard_accounts::{Account, AccountError, AccountRegistry, DeploymentSettings};
use stackguard_policy::TierKind;

/// Build a registry with fully provisioned accounts.
fn provisioned_registry() -> AccountRegistry {
    let mut registry = AccountRegistry::new();
    for (name, id, tier) in [
        ("ROOT", "654654598073", TierKind::Root),
        ("PROD", "333333333333", TierKind::Prod),
        ("DEV", "111111111111", TierKind::Dev),
        ("TESTING", "222222222222", TierKind::Testing),
    ] {
        registry
            .register(Account::new(name, id, "us-east-2"), tier)
            .expect("register account");
    }
    registry
}

#[test]
fn test_all_preserves_declaration_order() {
    let registry = provisioned_registry();
    let names: Vec<String> = registry.all().into_iter().map(|a| a.name.clone()).collect();
    assert_eq!(names, vec!["ROOT", "PROD", "DEV", "TESTING"]);
    assert!(registry.unprovisioned().is_empty());
}

#[test]
fn test_resolve_every_registered_environment() {
    let registry = provisioned_registry();
    for account in registry.all() {
        let resolved = registry.resolve(&account.name).expect("resolve");
        assert_eq!(resolved, account);
    }
}

#[test]
fn test_unknown_environment_is_reported_by_name() {
    let registry = provisioned_registry();
    match registry.resolve("SANDBOX") {
        Err(AccountError::UnknownEnvironment(name)) => assert_eq!(name, "SANDBOX"),
        other => panic!("expected UnknownEnvironment, got {other:?}"),
    }
}

#[test]
fn test_registry_serializes_entries_in_order() {
    let registry = provisioned_registry();
    let json = serde_json::to_value(&registry).expect("serialize");
    let entries = json["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["account"]["name"], "ROOT");
    assert_eq!(entries[0]["tier"], "root");
    assert_eq!(entries[2]["account"]["id"], "111111111111");
}

#[test]
fn test_settings_region_feeds_account_placement() {
    let settings = DeploymentSettings::from_lookup(|key| match key {
        "JOB_ROLE" => Some("DevOps".to_string()),
        "SSO_REGION" => Some("us-east-1".to_string()),
        _ => None,
    });
    let registry = AccountRegistry::software_engineering();
    let root = registry.resolve("ROOT").expect("root");

    let sso_account = root.in_region(settings.sso_region());
    assert!(registry.contains(&sso_account));
    assert_eq!(sso_account.region, "us-east-1");
}
