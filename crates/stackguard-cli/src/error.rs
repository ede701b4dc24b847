//! Error types for loading deployments

use std::path::PathBuf;

use stackguard_accounts::{AccountError, ConfigError};
use stackguard_graph::GraphError;
use stackguard_policy::PolicyError;
use thiserror::Error;

/// Errors raised while loading a manifest or building a deployment.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Manifest or document could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid JSON for the schema
    #[error("Invalid manifest {}: {source}", path.display())]
    Json {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// A grant condition is malformed
    #[error("Invalid condition on grant #{grant}: {reason}")]
    InvalidCondition {
        /// Grant index in the manifest
        grant: usize,
        /// What is wrong with it
        reason: String,
    },

    /// Capability, tier or document error
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Account registry error
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Graph construction error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Deployment settings error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

impl ManifestError {
    /// Get error code for reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            ManifestError::Io { .. } => "IO_ERROR",
            ManifestError::Json { .. } => "INVALID_MANIFEST",
            ManifestError::InvalidCondition { .. } => "INVALID_CONDITION",
            ManifestError::Policy(e) => e.error_code(),
            ManifestError::Account(e) => e.error_code(),
            ManifestError::Graph(e) => e.error_code(),
            ManifestError::Config(e) => e.error_code(),
        }
    }
}
