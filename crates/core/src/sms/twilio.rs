//! Twilio Messages API sender.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{validate_message, SmsError, SmsReceipt, SmsSender};
use crate::config::SmsConfig;
use crate::metrics;

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

pub struct TwilioSender {
    client: Client,
    config: SmsConfig,
}

impl TwilioSender {
    pub fn new(config: SmsConfig) -> Result<Self, SmsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SmsError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    async fn deliver(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        validate_message(to, body)?;

        let form = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.message)
                .unwrap_or_default();
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessageResponse =
            serde_json::from_str(&text).map_err(|e| SmsError::Http(e.to_string()))?;

        Ok(SmsReceipt {
            id: parsed.sid,
            status: parsed.status,
        })
    }
}

#[async_trait]
impl SmsSender for TwilioSender {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        let result = self.deliver(to, body).await;
        match &result {
            Ok(receipt) => {
                metrics::SMS_SENT.with_label_values(&["sent"]).inc();
                info!(message_id = %receipt.id, "SMS queued");
            }
            Err(e) => {
                metrics::SMS_SENT.with_label_values(&["failed"]).inc();
                warn!(error = %e, "SMS send failed");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmsConfig {
        SmsConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15550001111".to_string(),
            api_base: "https://api.twilio.com/".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_messages_url() {
        let sender = TwilioSender::new(config()).unwrap();
        assert_eq!(
            sender.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_send_rejects_blank_message_without_network() {
        let sender = TwilioSender::new(config()).unwrap();
        let result = sender.send("", "hello").await;
        assert!(matches!(result, Err(SmsError::InvalidMessage(_))));
    }
}
