//! Error types for the account registry and deployment settings

use thiserror::Error;

/// Account registry errors.
///
/// All of these are construction-time errors: they are fatal to the call
/// that caused them and surface immediately.
#[derive(Debug, Error)]
pub enum AccountError {
    /// No account is registered under this environment name
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    /// An account with this environment name is already registered
    #[error("Account already registered: {0}")]
    DuplicateAccount(String),

    /// Account definition is unusable
    #[error("Invalid account {name}: {reason}")]
    InvalidAccount {
        /// Environment name
        name: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for registry operations.
pub type AccountResult<T> = Result<T, AccountError>;

impl AccountError {
    /// Get error code for reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccountError::UnknownEnvironment(_) => "UNKNOWN_ENVIRONMENT",
            AccountError::DuplicateAccount(_) => "DUPLICATE_ACCOUNT",
            AccountError::InvalidAccount { .. } => "INVALID_ACCOUNT",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    /// Get error code for reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::MissingEnvVar(_) => "MISSING_ENV_VAR",
            ConfigError::InvalidValue { .. } => "INVALID_CONFIG_VALUE",
        }
    }
}
