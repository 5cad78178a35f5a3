//! Domain error types.

use std::time::Duration;

use order_store::StoreError;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::order::OrderError;
use crate::promocode::PromocodeError;

/// Errors that can occur during order and promocode operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An order rule was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A promocode could not be applied.
    #[error("Promocode error: {0}")]
    Promocode(#[from] PromocodeError),

    /// The catalog collaborator failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// An error occurred in the order store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The operation did not finish in time and was rolled back.
    #[error("Operation '{operation}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Caller-facing classification of a [`DomainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input, rejected before any write.
    Validation,
    /// The order exists but is in the wrong status.
    State,
    /// The referenced order, basket, food or promocode does not exist.
    NotFound,
    /// A promocode's eligibility rule rejected the order.
    Eligibility,
    /// Timeout, lost connection or lost race; the whole operation may be retried.
    Transient,
    /// Unexpected store state.
    Internal,
}

impl DomainError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(err) => err.kind(),
            DomainError::Promocode(err) => err.kind(),
            DomainError::Catalog(CatalogError::NotFound(_)) => ErrorKind::NotFound,
            DomainError::Catalog(CatalogError::Unavailable(_)) => ErrorKind::Transient,
            DomainError::Store(err) if err.is_transient() => ErrorKind::Transient,
            DomainError::Store(_) => ErrorKind::Internal,
            DomainError::Timeout { .. } => ErrorKind::Transient,
        }
    }

    /// Returns true if the caller may retry the whole operation unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
