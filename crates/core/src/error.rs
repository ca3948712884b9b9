//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation,
/// visibility, uniqueness, ledger invariants). Every variant carries the
/// stable, human-readable message that callers surface verbatim;
/// `Unavailable` is the one cross-cutting exception and is never shown
/// to users as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Structurally invalid input, rejected before any store access.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced entity does not exist or sits outside the caller's
    /// visibility scope.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness violation, capacity exceeded, insufficient stock, or a
    /// record linkage mismatch.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A mutation the caller is not allowed to perform on an entity it can
    /// see (system-default ownership, guarded deletes).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The backing store could not be reached. Outside the domain taxonomy;
    /// surfaced as a generic server failure.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Identifier parse failure (Validation class).
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::Validation(format!("invalid identifier: {}", msg.into()))
    }

    /// The stable message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::InvalidOperation(m)
            | Self::Unavailable(m) => m,
        }
    }
}
