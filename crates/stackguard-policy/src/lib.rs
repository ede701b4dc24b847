//! # Stackguard Policy
//!
//! Capability patterns, permission tiers and policy documents shared by the
//! stackguard crates.
//!
//! ## Overview
//!
//! The stackguard-policy crate handles:
//! - **Services**: The AWS service prefixes capabilities are scoped to
//! - **Capabilities**: IAM action patterns such as `kms:GenerateDataKey*`
//! - **Capability Sets**: Ordered collections of patterns
//! - **Tiers**: Allow/deny bundles assigned to accounts
//! - **Documents**: IAM policy JSON, folded into tiers
//! - **Permission Sets**: SSO permission-set limits
//!
//! ## Architecture
//!
//! ```text
//! Capability = Service ":" Action pattern
//!
//! Examples:
//!   "kms:Decrypt"             - One action
//!   "kms:GenerateDataKey*"    - An action family
//!   "*:Get*"                  - Every read on every service
//!   "*"                       - Everything
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use stackguard_policy::{Capability, Decision, TierCatalog, TierKind};
//!
//! let catalog = TierCatalog::builtin();
//! let root = catalog.get(TierKind::Root).unwrap();
//!
//! let decrypt: Capability = "kms:Decrypt".parse().unwrap();
//! assert_eq!(root.evaluate(&decrypt), Decision::Allow);
//!
//! let create_user: Capability = "iam:CreateUser".parse().unwrap();
//! assert_eq!(root.evaluate(&create_user), Decision::ExplicitDeny);
//! ```
//!
//! ## Deny Precedence
//!
//! A deny pattern that overlaps a capability blocks it, even when an allow
//! pattern covers it. Wildcard capabilities are blocked when any action they
//! match is denied.

pub mod capability;
pub mod capability_set;
pub mod document;
pub mod error;
pub mod permission_sets;
pub mod services;
pub mod tiers;

// Re-export main types for convenience
pub use capability::{Capability, ServiceSelector};
pub use capability_set::CapabilitySet;
pub use document::{Effect, PolicyDocument, Statement, MAX_MANAGED_POLICY_CHARS};
pub use error::{PolicyError, PolicyResult};
pub use permission_sets::{PermissionSetIssue, PermissionSetSpec};
pub use services::{AwsService, ServiceCategory};
pub use tiers::{Decision, PermissionTier, TierCatalog, TierKind};
