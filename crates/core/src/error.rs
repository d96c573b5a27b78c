//! Domain error model.

use thiserror::Error;

use crate::measure::Area;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, illegal transitions). Storage and transport concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, catalog type mismatch).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested cuts need more area than the source panel holds.
    #[error("insufficient area: required {required}, available {available}")]
    InsufficientArea { required: Area, available: Area },

    /// Not enough material/tool stock to satisfy a request.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// A cut specification is malformed or cannot be laid out on the panel.
    #[error("invalid cut specification: {0}")]
    InvalidCutSpecification(String),

    /// A decrementing movement would drive a balance below zero.
    #[error("negative balance: {0}")]
    NegativeBalance(String),

    /// The state machine does not allow the requested transition.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflict occurred (e.g. stale version).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn insufficient_stock(msg: impl Into<String>) -> Self {
        Self::InsufficientStock(msg.into())
    }

    pub fn invalid_cut(msg: impl Into<String>) -> Self {
        Self::InvalidCutSpecification(msg.into())
    }

    pub fn negative_balance(msg: impl Into<String>) -> Self {
        Self::NegativeBalance(msg.into())
    }

    pub fn invalid_transition(from: impl core::fmt::Display, to: impl core::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
