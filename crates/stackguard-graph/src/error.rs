//! Error types for graph construction and ordering

use thiserror::Error;

use crate::order::Cycle;

/// Graph errors.
///
/// `UnknownNode` and `DuplicateNode` are construction-time errors and are
/// fatal to the call that raised them. `CyclicDependency` aborts ordering;
/// there is no partial order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A referenced stack was never declared
    #[error("Unknown stack: {0}")]
    UnknownNode(String),

    /// A stack with this name is already declared
    #[error("Stack already declared: {0}")]
    DuplicateNode(String),

    /// The dependency relation has a cycle
    #[error("Cyclic dependency: {0}")]
    CyclicDependency(Cycle),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    /// Get error code for reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            GraphError::UnknownNode(_) => "UNKNOWN_NODE",
            GraphError::DuplicateNode(_) => "DUPLICATE_NODE",
            GraphError::CyclicDependency(_) => "CYCLIC_DEPENDENCY",
        }
    }

    /// The offending cycle, if this is a cycle error.
    pub fn cycle(&self) -> Option<&Cycle> {
        match self {
            GraphError::CyclicDependency(cycle) => Some(cycle),
            _ => None,
        }
    }
}
