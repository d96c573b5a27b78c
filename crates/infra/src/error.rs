//! Service-boundary errors.
//!
//! Domain and store failures are folded into one [`ServiceError`] with a stable
//! [`ErrorKind`] the request layer can map onto status codes. `message()` is safe to
//! show to callers; back-end details only go to the logs.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use panelstock_core::DomainError;

use crate::store::StoreError;

/// Stable classification of a service failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    InvalidTransition,
    Conflict,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A transient store failure persisted through every retry.
    #[error("{operation} gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        last: StoreError,
    },
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::Domain(DomainError::not_found(what))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Domain(e) => match e {
                DomainError::Validation(_)
                | DomainError::InsufficientArea { .. }
                | DomainError::InsufficientStock(_)
                | DomainError::InvalidCutSpecification(_)
                | DomainError::NegativeBalance(_)
                | DomainError::InvalidId(_) => ErrorKind::ValidationError,
                DomainError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
                DomainError::NotFound(_) => ErrorKind::NotFound,
                DomainError::Conflict(_) => ErrorKind::Conflict,
                DomainError::InvariantViolation(_) => ErrorKind::Internal,
            },
            ServiceError::Store(e) => match e {
                StoreError::LockTimeout(_) | StoreError::Conflict(_) => ErrorKind::Conflict,
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::Unavailable(_) | StoreError::Backend(_) => ErrorKind::Internal,
            },
            ServiceError::RetriesExhausted { .. } => ErrorKind::Conflict,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Caller-facing description. Back-end details and internal identifiers stay in the
    /// logs.
    pub fn message(&self) -> String {
        match self {
            ServiceError::Domain(e) => domain_message(e),
            ServiceError::Store(StoreError::NotFound(_)) => "not found".to_string(),
            _ if self.kind() == ErrorKind::Internal => "internal error".to_string(),
            _ => CONFLICT_MESSAGE.to_string(),
        }
    }

    /// The underlying domain error, if this failure is a business-rule rejection.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Whether retrying the whole transaction could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Store(e) if e.is_transient())
    }
}

const CONFLICT_MESSAGE: &str = "the operation conflicted with concurrent changes; retry later";

fn domain_message(e: &DomainError) -> String {
    match e {
        DomainError::Validation(detail) => format!("validation failed: {}", without_ids(detail)),
        DomainError::InsufficientArea { required, available } => {
            format!("insufficient area: required {required}, available {available}")
        }
        DomainError::InsufficientStock(detail) => format!("insufficient stock: {}", without_ids(detail)),
        DomainError::InvalidCutSpecification(detail) => {
            format!("invalid cut specification: {}", without_ids(detail))
        }
        DomainError::NegativeBalance(_) => "the movement would leave a negative balance".to_string(),
        DomainError::InvalidTransition { from, to } => format!("invalid transition from {from} to {to}"),
        DomainError::InvalidId(_) => "malformed identifier".to_string(),
        DomainError::NotFound(what) => format!("{} not found", without_ids(what)),
        DomainError::Conflict(_) => CONFLICT_MESSAGE.to_string(),
        DomainError::InvariantViolation(_) => "internal error".to_string(),
    }
}

/// Drop UUID tokens from free-text detail.
fn without_ids(detail: &str) -> String {
    detail
        .split_whitespace()
        .filter(|word| {
            let token = word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-');
            Uuid::try_parse(token).is_err()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelstock_core::{Area, InventoryItemId, OrderId};

    #[test]
    fn domain_rejections_are_validation_errors() {
        let err = ServiceError::from(DomainError::InsufficientArea {
            required: Area::from_square_metres(60.0),
            available: Area::from_square_metres(50.0),
        });
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.code(), "validation_error");
        assert!(err.message().contains("insufficient area"));
        assert!(!err.is_transient());
    }

    #[test]
    fn backend_details_stay_out_of_the_message() {
        let err = ServiceError::from(StoreError::Backend("relation \"orders\" does not exist".to_string()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "internal error");
    }

    #[test]
    fn lock_timeouts_are_transient_conflicts() {
        let err = ServiceError::from(StoreError::LockTimeout("order row".to_string()));
        assert!(err.is_transient());
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.message().contains("order row"));

        let exhausted = ServiceError::RetriesExhausted {
            operation: "create_order",
            attempts: 4,
            last: StoreError::Conflict("40001".to_string()),
        };
        assert_eq!(exhausted.code(), "conflict");
        assert!(!exhausted.is_transient());
    }

    #[test]
    fn invalid_transition_keeps_its_own_kind() {
        let err = ServiceError::from(DomainError::invalid_transition("cancelled", "cancelled"));
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(err.message(), "invalid transition from cancelled to cancelled");
    }

    #[test]
    fn caller_messages_carry_no_identifiers() {
        let order = OrderId::new();
        let item = InventoryItemId::new();

        let missing = ServiceError::not_found(format!("order {order}"));
        assert_eq!(missing.message(), "order not found");

        let mismatch = ServiceError::from(DomainError::validation(format!(
            "panel line item references material {item}"
        )));
        assert_eq!(
            mismatch.message(),
            "validation failed: panel line item references material"
        );

        let short = ServiceError::from(DomainError::insufficient_stock(format!(
            "material {item} has 3 kg, 5 requested"
        )));
        assert_eq!(short.message(), "insufficient stock: material has 3 kg, 5 requested");

        let negative = ServiceError::from(DomainError::negative_balance(format!("panel {item} length is 0")));
        assert!(!negative.message().contains(&item.to_string()));
    }
}
