//! # Stackguard Trust
//!
//! Validation of cross-account trust grants and SSO permission sets.
//!
//! ## Overview
//!
//! - **Secret Oracle**: Answers whether a condition's secret exists
//! - **Trust Validator**: Checks grants against accounts, tiers and secrets
//! - **Permission-Set Audit**: Checks limits and policy references
//! - **Violations**: Every problem found, never just the first
//!
//! ## Usage
//!
//! ```rust
//! use stackguard_accounts::AccountRegistry;
//! use stackguard_graph::{GrantCondition, ResourceGraph};
//! use stackguard_policy::TierCatalog;
//! use stackguard_trust::{InMemorySecretStore, TrustValidator, ViolationKind};
//!
//! let registry = AccountRegistry::software_engineering();
//! let tiers = TierCatalog::builtin();
//! let dev = registry.resolve("DEV").unwrap().clone();
//! let root = registry.resolve("ROOT").unwrap().clone();
//!
//! let mut graph = ResourceGraph::new();
//! graph.add_trust_grant(
//!     root,
//!     dev,
//!     "sts:AssumeRole".parse().unwrap(),
//!     Some(GrantCondition::secret("sts:ExternalId", "external-id")),
//! );
//!
//! let secrets = InMemorySecretStore::new();
//! let violations = TrustValidator::new(&registry, &tiers, &secrets).validate(&graph);
//! assert_eq!(violations[0].kind, ViolationKind::MissingConditionSecret);
//! ```

pub mod audit;
pub mod secrets;
pub mod validator;
pub mod violation;

pub use audit::audit_permission_sets;
pub use secrets::{InMemorySecretStore, SecretOracle};
pub use validator::TrustValidator;
pub use violation::{Violation, ViolationKind};
