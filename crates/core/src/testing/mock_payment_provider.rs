//! Mock payment provider for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::payment::{CreateIntentRequest, PaymentIntent, PaymentProvider, ProviderError};

/// Records every intent request and answers with a fake intent.
///
/// Requests carrying the same idempotency key get the same intent back,
/// like the real provider.
#[derive(Debug, Default)]
pub struct MockPaymentProvider {
    requests: Mutex<Vec<CreateIntentRequest>>,
    issued: Mutex<Vec<(Option<String>, PaymentIntent)>>,
    next_error: Mutex<Option<String>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<CreateIntentRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of distinct intents handed out.
    pub fn intents_created(&self) -> usize {
        self.issued.lock().map(|i| i.len()).unwrap_or_default()
    }

    /// Make the next call fail with an API error carrying `message`.
    pub fn fail_next(&self, message: &str) {
        if let Ok(mut next) = self.next_error.lock() {
            *next = Some(message.to_string());
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<PaymentIntent, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(message) = self.next_error.lock().ok().and_then(|mut e| e.take()) {
            return Err(ProviderError::Api {
                status: 402,
                kind: "card_error".to_string(),
                message,
            });
        }

        let mut issued = self
            .issued
            .lock()
            .map_err(|_| ProviderError::Http("mock lock poisoned".to_string()))?;

        if let Some(key) = &request.idempotency_key {
            if let Some((_, intent)) = issued.iter().find(|(k, _)| k.as_ref() == Some(key)) {
                return Ok(intent.clone());
            }
        }

        let id = format!("pi_mock_{}", issued.len() + 1);
        let intent = PaymentIntent {
            client_secret: Some(format!("{}_secret_{}", id, uuid::Uuid::new_v4().simple())),
            id,
            amount: request.amount,
            currency: request.currency.clone(),
            status: "requires_payment_method".to_string(),
        };
        issued.push((request.idempotency_key.clone(), intent.clone()));
        Ok(intent)
    }
}
