//! Outbound SMS notifications.

mod twilio;

pub use twilio::TwilioSender;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("SMS provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Provider acknowledgement of a queued message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmsReceipt {
    /// Provider message id.
    pub id: String,
    pub status: String,
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError>;
}

/// Reject blank recipients or bodies before calling a provider.
pub fn validate_message(to: &str, body: &str) -> Result<(), SmsError> {
    if to.trim().is_empty() {
        return Err(SmsError::InvalidMessage("recipient is required".to_string()));
    }
    if body.trim().is_empty() {
        return Err(SmsError::InvalidMessage("body is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_message() {
        assert!(validate_message("+15550001111", "Your car is ready").is_ok());
        assert!(validate_message("", "Your car is ready").is_err());
        assert!(validate_message("+15550001111", "   ").is_err());
    }
}
