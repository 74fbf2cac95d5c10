use thiserror::Error;

use super::{ProviderError, SignatureError};
use crate::ticket::TicketError;

/// Errors surfaced by intent creation and webhook reconciliation.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] SignatureError),

    #[error("Payment provider failure: {0}")]
    ProviderFailure(#[from] ProviderError),

    #[error("Store failure: {0}")]
    StoreFailure(String),
}

impl From<TicketError> for PaymentError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::NotFound(what) => PaymentError::NotFound(what),
            TicketError::InvalidInput(msg) => PaymentError::InvalidInput(msg),
            TicketError::InvalidState { .. } => PaymentError::InvalidInput(err.to_string()),
            TicketError::Database(msg) => PaymentError::StoreFailure(msg),
        }
    }
}

impl PaymentError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::NotFound(_) => "not_found",
            PaymentError::InvalidInput(_) => "invalid_input",
            PaymentError::InvalidAmount(_) => "invalid_amount",
            PaymentError::Unauthorized(_) => "unauthorized",
            PaymentError::ProviderFailure(_) => "provider_failure",
            PaymentError::StoreFailure(_) => "store_failure",
        }
    }
}
