//! Mapping from domain errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use valet_core::{PaymentError, TicketError};

const INTERNAL_ERROR: &str = "Internal server error";

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Logs `detail` and hides it from the client.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::NotFound(_) => ApiError::not_found(err.to_string()),
            TicketError::InvalidInput(_) => ApiError::bad_request(err.to_string()),
            TicketError::InvalidState { .. } => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            TicketError::Database(_) => ApiError::internal(err),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotFound(_) => ApiError::not_found(err.to_string()),
            PaymentError::InvalidInput(_) | PaymentError::InvalidAmount(_) => {
                ApiError::bad_request(err.to_string())
            }
            // Webhook auth failures are a bad request, not a login prompt
            PaymentError::Unauthorized(_) => ApiError::bad_request(err.to_string()),
            PaymentError::ProviderFailure(_) | PaymentError::StoreFailure(_) => {
                ApiError::internal(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::payment::{ProviderError, SignatureError};

    #[test]
    fn test_payment_error_status_mapping() {
        let cases = [
            (PaymentError::NotFound("t".into()), StatusCode::NOT_FOUND),
            (PaymentError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (PaymentError::InvalidAmount("0".into()), StatusCode::BAD_REQUEST),
            (
                PaymentError::Unauthorized(SignatureError::MissingSignature),
                StatusCode::BAD_REQUEST,
            ),
            (
                PaymentError::ProviderFailure(ProviderError::Timeout),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PaymentError::StoreFailure("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = ApiError::from(PaymentError::StoreFailure("sqlite locked at /var/db".into()));
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_ticket_invalid_state_is_conflict() {
        let err = ApiError::from(TicketError::InvalidState {
            ticket_id: "t-1".into(),
            current_state: "READY".into(),
            operation: "request".into(),
        });
        assert_eq!(err.status, StatusCode::CONFLICT);
    }
}
