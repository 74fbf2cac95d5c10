//! Payment provider abstraction.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ticket::MinorUnits;

/// Errors from the payment provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Provider rejected request ({status}): {kind}: {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

/// Request to authorize a charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIntentRequest {
    pub amount: MinorUnits,
    /// Lowercase ISO 4217 code.
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
    /// Collapses duplicate submissions provider-side when set.
    pub idempotency_key: Option<String>,
}

/// Provider-side payment intent.
#[derive(Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Secret the browser uses to confirm the charge. Never logged.
    #[serde(default)]
    pub client_secret: Option<String>,
    pub amount: MinorUnits,
    pub currency: String,
    #[serde(default)]
    pub status: String,
}

impl std::fmt::Debug for PaymentIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentIntent")
            .field("id", &self.id)
            .field("amount", &self.amount)
            .field("currency", &self.currency)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Creates payment intents. Implementations do not retry.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Provider name (e.g., "stripe").
    fn name(&self) -> &str;

    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<PaymentIntent, ProviderError>;
}
