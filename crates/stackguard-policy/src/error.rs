//! Error types for policy operations
//!
//! Covers capability parsing, IAM policy document handling and tier
//! lookups.

use thiserror::Error;

/// Policy error types.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Capability string does not follow `service:action`
    #[error("Invalid capability `{input}`: {reason}")]
    InvalidCapability {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Tier name is not recognized
    #[error("Unknown permission tier: {0}")]
    UnknownTier(String),

    /// Policy document is structurally invalid
    #[error("Invalid policy document: {0}")]
    InvalidDocument(String),

    /// Statement uses an element the validator does not model
    #[error("Unsupported statement element `{element}` in statement {sid}")]
    UnsupportedStatement {
        /// Statement id, or its index when no `Sid` is present.
        sid: String,
        /// The element name, e.g. `NotAction`.
        element: String,
    },

    /// Managed policy exceeds the AWS character limit
    #[error("Policy document {name} has {chars} characters (limit {limit})")]
    DocumentTooLarge {
        /// Document name.
        name: String,
        /// Non-whitespace character count.
        chars: usize,
        /// Configured limit.
        limit: usize,
    },

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reading a policy document from disk
    #[error("Failed to read policy document `{path}`: {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

impl PolicyError {
    /// Build an `InvalidCapability` error.
    pub fn invalid_capability(input: impl Into<String>, reason: impl Into<String>) -> Self {
        PolicyError::InvalidCapability {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Get error code for reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            PolicyError::InvalidCapability { .. } => "INVALID_CAPABILITY",
            PolicyError::UnknownTier(_) => "UNKNOWN_TIER",
            PolicyError::InvalidDocument(_) => "INVALID_DOCUMENT",
            PolicyError::UnsupportedStatement { .. } => "UNSUPPORTED_STATEMENT",
            PolicyError::DocumentTooLarge { .. } => "DOCUMENT_TOO_LARGE",
            PolicyError::Json(_) => "JSON_ERROR",
            PolicyError::Io { .. } => "IO_ERROR",
        }
    }
}
