//! Stripe REST client for payment intents.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use super::{CreateIntentRequest, PaymentIntent, PaymentProvider, ProviderError};
use crate::config::StripeConfig;

/// Stripe REST error envelope: `{ "error": { "type", "message", ... } }`
#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Creates payment intents through the Stripe API.
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    /// Form body for `POST /v1/payment_intents`.
    fn intent_form(request: &CreateIntentRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.to_ascii_lowercase()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }
        form
    }

    fn map_error(status: StatusCode, body: &str) -> ProviderError {
        match serde_json::from_str::<StripeErrorEnvelope>(body) {
            Ok(envelope) => {
                let details = envelope.error;
                let kind = match details.code {
                    Some(code) => format!("{}/{}", details.kind, code),
                    None => details.kind,
                };
                ProviderError::Api {
                    status: status.as_u16(),
                    kind,
                    message: details.message.unwrap_or_default(),
                }
            }
            Err(_) => ProviderError::Http(format!("status={}", status.as_u16())),
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    fn name(&self) -> &str {
        "stripe"
    }

    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<PaymentIntent, ProviderError> {
        let url = format!("{}/v1/payment_intents", self.api_base);
        let form = Self::intent_form(request);

        info!(
            amount = request.amount,
            currency = %request.currency,
            idempotent = request.idempotency_key.is_some(),
            "Creating Stripe payment intent"
        );

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form);
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::map_error(status, &body));
        }

        let intent: PaymentIntent =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;

        debug!(payment_intent_id = %intent.id, status = %intent.status, "Stripe intent created");
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request() -> CreateIntentRequest {
        CreateIntentRequest {
            amount: 1500,
            currency: "USD".to_string(),
            metadata: BTreeMap::from([
                ("ticketId".to_string(), "t-1".to_string()),
                ("tipAmount".to_string(), "1000".to_string()),
            ]),
            idempotency_key: None,
        }
    }

    #[test]
    fn test_intent_form_fields() {
        let form = StripeClient::intent_form(&request());

        assert!(form.contains(&("amount".to_string(), "1500".to_string())));
        assert!(form.contains(&("currency".to_string(), "usd".to_string())));
        assert!(form.contains(&("metadata[ticketId]".to_string(), "t-1".to_string())));
        assert!(form.contains(&("metadata[tipAmount]".to_string(), "1000".to_string())));
        assert!(form.contains(&(
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string()
        )));
    }

    #[test]
    fn test_map_error_envelope() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"amount_too_small","message":"Amount must be at least 50 cents"}}"#;
        let err = StripeClient::map_error(StatusCode::BAD_REQUEST, body);

        match err {
            ProviderError::Api {
                status,
                kind,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(kind, "invalid_request_error/amount_too_small");
                assert_eq!(message, "Amount must be at least 50 cents");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_map_error_unparseable_body() {
        let err = StripeClient::map_error(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(matches!(err, ProviderError::Http(_)));
    }

    #[test]
    fn test_decode_intent_response() {
        let body = r#"{"id":"pi_123","object":"payment_intent","amount":1500,"currency":"usd","status":"requires_payment_method","client_secret":"pi_123_secret_abc"}"#;
        let intent: PaymentIntent = serde_json::from_str(body).unwrap();

        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));
        assert!(!format!("{intent:?}").contains("secret_abc"));
    }

    #[test]
    fn test_new_trims_api_base() {
        let config = StripeConfig {
            secret_key: "sk_test".to_string(),
            webhook_secret: None,
            allow_unsigned_webhooks: true,
            currency: "usd".to_string(),
            signature_tolerance_secs: 300,
            api_base: "http://127.0.0.1:12111/".to_string(),
            timeout_secs: 5,
            idempotency_window_secs: 60,
        };
        let client = StripeClient::new(&config).unwrap();
        assert_eq!(client.api_base, "http://127.0.0.1:12111");
        assert_eq!(client.name(), "stripe");
    }
}
