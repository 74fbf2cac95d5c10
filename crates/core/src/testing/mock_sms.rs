//! Mock SMS sender for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::sms::{validate_message, SmsError, SmsReceipt, SmsSender};

/// A message the mock accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub to: String,
    pub body: String,
}

/// Collects messages instead of sending them.
#[derive(Debug, Default)]
pub struct MockSmsSender {
    sent: Mutex<Vec<SentSms>>,
}

impl MockSmsSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentSms> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SmsSender for MockSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        validate_message(to, body)?;

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| SmsError::Http("mock lock poisoned".to_string()))?;
        sent.push(SentSms {
            to: to.to_string(),
            body: body.to_string(),
        });

        Ok(SmsReceipt {
            id: format!("SM{}", sent.len()),
            status: "queued".to_string(),
        })
    }
}
