//! # Stackguard Accounts
//!
//! The accounts a deployment spans and the settings it runs under.
//!
//! ## Overview
//!
//! - **Accounts**: An AWS account bound to an environment name
//! - **Registry**: Environment name to account and tier, in declaration order
//! - **Settings**: Job role, SSO and domain settings read from the environment
//!
//! ## Usage
//!
//! ```rust
//! use stackguard_accounts::AccountRegistry;
//! use stackguard_policy::TierKind;
//!
//! let registry = AccountRegistry::software_engineering();
//! let root = registry.resolve("ROOT").unwrap();
//!
//! assert_eq!(root.id, "654654598073");
//! assert_eq!(registry.tier_of(root), Some(TierKind::Root));
//! ```

pub mod account;
pub mod error;
pub mod registry;
pub mod settings;

pub use account::Account;
pub use error::{AccountError, AccountResult, ConfigError};
pub use registry::{AccountEntry, AccountRegistry, DEFAULT_REGION};
pub use settings::{DeploymentSettings, JobRole};
