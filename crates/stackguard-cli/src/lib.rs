//! # Stackguard CLI
//!
//! Loading deployments and reporting on them.
//!
//! ## Overview
//!
//! - **Manifests**: JSON descriptions of accounts, tiers, stacks and grants
//! - **Reference Topology**: The software-engineering organization's stacks
//! - **Reports**: Violations, deployment order and waves for one run
//!
//! ## Usage
//!
//! ```rust
//! use stackguard_accounts::DeploymentSettings;
//! use stackguard_cli::{reference_topology, Command, Report};
//!
//! let deployment = reference_topology(&DeploymentSettings::default()).unwrap();
//! let report = Report::generate(Command::Order, &deployment);
//!
//! assert!(report.is_clean());
//! assert_eq!(report.order.unwrap()[0], "SEDevOpsResourcesStack");
//! ```

pub mod deployment;
pub mod error;
pub mod manifest;
pub mod report;
pub mod topology;

pub use deployment::Deployment;
pub use error::{ManifestError, ManifestResult};
pub use manifest::Manifest;
pub use report::{Command, Report};
pub use topology::reference_topology;
