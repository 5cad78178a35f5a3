//! Promocode eligibility and application.

mod eligibility;
mod service;

pub use eligibility::EligibilityFacts;
pub use service::PromocodeService;
pub(crate) use service::recheck_applied;

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur when applying a promocode.
#[derive(Debug, Error)]
pub enum PromocodeError {
    /// No such code, or the code has expired.
    #[error("Promocode not found: {code}")]
    NotFound { code: String },

    /// The code's rule rejected this order.
    #[error("Promocode {code} is not applicable: {reason}")]
    NotEligible { code: String, reason: &'static str },
}

impl PromocodeError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            PromocodeError::NotFound { .. } => ErrorKind::NotFound,
            PromocodeError::NotEligible { .. } => ErrorKind::Eligibility,
        }
    }
}
