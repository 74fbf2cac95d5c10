//! Stripe webhook verification and reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::{ParsedMetadata, PaymentError};
use crate::auth::constant_time_eq;
use crate::config::StripeConfig;
use crate::metrics;
use crate::ticket::{
    MinorUnits, NewPaymentTransaction, RecordOutcome, TicketError, TicketStore,
};

type HmacSha256 = Hmac<Sha256>;

/// Event type that settles a ticket.
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    MissingSecret,

    #[error("signature header is missing")]
    MissingSignature,

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("timestamp {timestamp} is {age}s away from now (tolerance {tolerance}s)")]
    TimestampOutsideTolerance {
        timestamp: i64,
        age: i64,
        tolerance: i64,
    },
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::InvalidSignature(format!("unusable secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a `Stripe-Signature` header against the current time.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    verify_signature_at(
        payload,
        header,
        secret,
        tolerance_secs,
        chrono::Utc::now().timestamp(),
    )
}

/// Verify a `t=<unix>,v1=<hex>[,v1=...]` header as of `now`.
pub fn verify_signature_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        SignatureError::InvalidSignature("missing timestamp in signature header".to_string())
    })?;

    if signatures.is_empty() {
        return Err(SignatureError::InvalidSignature(
            "no v1 signature found".to_string(),
        ));
    }

    let age = (now - timestamp).abs();
    if age > tolerance_secs {
        return Err(SignatureError::TimestampOutsideTolerance {
            timestamp,
            age,
            tolerance: tolerance_secs,
        });
    }

    let expected = compute_signature(secret, timestamp, payload)?;
    if signatures
        .iter()
        .any(|sig| constant_time_eq(expected.as_bytes(), sig.as_bytes()))
    {
        debug!(timestamp, age, "Webhook signature verified");
        Ok(())
    } else {
        Err(SignatureError::InvalidSignature(
            "signature mismatch".to_string(),
        ))
    }
}

/// How inbound events are authenticated.
#[derive(Debug, Clone)]
pub enum WebhookAuth {
    Signed { secret: String, tolerance_secs: i64 },
    /// Trust payloads as-is. Only for local development.
    Unsigned,
}

impl WebhookAuth {
    /// Falls back to `Signed` with an empty secret, which rejects every event,
    /// when no secret is set and unsigned delivery was not allowed.
    pub fn from_config(config: &StripeConfig) -> Self {
        match config.webhook_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => WebhookAuth::Signed {
                secret: secret.to_string(),
                tolerance_secs: config.signature_tolerance_secs,
            },
            None if config.allow_unsigned_webhooks => WebhookAuth::Unsigned,
            None => WebhookAuth::Signed {
                secret: String::new(),
                tolerance_secs: config.signature_tolerance_secs,
            },
        }
    }

    fn authenticate(&self, payload: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        match self {
            WebhookAuth::Signed {
                secret,
                tolerance_secs,
            } => {
                let header = signature.ok_or(SignatureError::MissingSignature)?;
                verify_signature(payload, header, secret, *tolerance_secs)
            }
            WebhookAuth::Unsigned => {
                warn!("Accepting unsigned webhook event");
                Ok(())
            }
        }
    }
}

/// Envelope of a Stripe event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeEventData {
    #[serde(default)]
    pub object: serde_json::Value,
}

/// The parts of a payment intent object we reconcile from.
#[derive(Debug, Clone)]
struct SucceededIntent {
    id: String,
    amount: MinorUnits,
    currency: Option<String>,
    metadata: HashMap<String, String>,
}

impl SucceededIntent {
    /// `None` unless the object carries an id and a non-negative integer
    /// amount. Scalar metadata values are kept as text, anything else is
    /// dropped.
    fn from_object(object: &serde_json::Value) -> Option<Self> {
        let id = object.get("id")?.as_str()?.to_string();
        let amount = object.get("amount")?.as_i64().filter(|a| *a >= 0)?;
        let currency = object
            .get("currency")
            .and_then(|c| c.as_str())
            .map(str::to_string);
        let metadata = object
            .get("metadata")
            .and_then(|m| m.as_object())
            .map(|m| {
                m.iter()
                    .filter_map(|(key, value)| metadata_text(value).map(|t| (key.clone(), t)))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id,
            amount,
            currency,
            metadata,
        })
    }
}

fn metadata_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// What happened to an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A new transaction was recorded and the ticket marked paid.
    Recorded {
        ticket_id: String,
        payment_intent_id: String,
        amount: MinorUnits,
    },
    /// Already recorded earlier; nothing appended.
    Duplicate {
        ticket_id: String,
        payment_intent_id: String,
    },
    /// Event type we do not act on.
    Ignored { event_type: String },
    /// Payment names no ticket we know. Acknowledged without changes.
    Orphaned { payment_intent_id: String },
}

impl WebhookOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Recorded { .. } => "recorded",
            WebhookOutcome::Duplicate { .. } => "duplicate",
            WebhookOutcome::Ignored { .. } => "ignored",
            WebhookOutcome::Orphaned { .. } => "orphaned",
        }
    }
}

/// Applies provider confirmation events to tickets and the ledger.
pub struct WebhookReconciler {
    store: Arc<dyn TicketStore>,
    auth: WebhookAuth,
    default_currency: String,
}

impl WebhookReconciler {
    pub fn new(store: Arc<dyn TicketStore>, auth: WebhookAuth, default_currency: &str) -> Self {
        Self {
            store,
            auth,
            default_currency: default_currency.to_ascii_lowercase(),
        }
    }

    /// Authenticate and apply one raw event.
    ///
    /// Nothing is written unless authentication succeeds. Once it does, only
    /// a body that is not JSON at all is refused. Both ledger and
    /// ticket writes commit together, so a failed event can be redelivered.
    #[instrument(skip(self, payload, signature), fields(event_type = tracing::field::Empty))]
    pub fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, PaymentError> {
        if let Err(e) = self.auth.authenticate(payload, signature) {
            warn!(error = %e, "Rejected webhook event");
            metrics::WEBHOOK_EVENTS
                .with_label_values(&["unknown", "rejected"])
                .inc();
            return Err(PaymentError::Unauthorized(e));
        }

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::InvalidInput(format!("malformed event: {}", e)))?;
        tracing::Span::current().record("event_type", event.event_type.as_str());

        let outcome = if event.event_type == PAYMENT_SUCCEEDED {
            self.reconcile(&event)?
        } else {
            debug!(event_type = %event.event_type, "Ignoring webhook event");
            WebhookOutcome::Ignored {
                event_type: event.event_type.clone(),
            }
        };

        let type_label = if event.event_type == PAYMENT_SUCCEEDED {
            PAYMENT_SUCCEEDED
        } else {
            "other"
        };
        metrics::WEBHOOK_EVENTS
            .with_label_values(&[type_label, outcome.label()])
            .inc();

        Ok(outcome)
    }

    fn reconcile(&self, event: &StripeEvent) -> Result<WebhookOutcome, PaymentError> {
        let object = &event.data.object;
        let Some(intent) = SucceededIntent::from_object(object) else {
            let payment_intent_id = object
                .get("id")
                .and_then(|id| id.as_str())
                .unwrap_or_default()
                .to_string();
            warn!(
                payment_intent_id = %payment_intent_id,
                event_id = event.id.as_deref().unwrap_or_default(),
                "Unreadable payment intent, acknowledging without changes"
            );
            return Ok(WebhookOutcome::Orphaned { payment_intent_id });
        };

        let metadata = ParsedMetadata::from_map(&intent.metadata);
        let Some(ticket_id) = metadata.ticket_id.clone() else {
            warn!(payment_intent_id = %intent.id, "Payment without ticket metadata");
            return Ok(WebhookOutcome::Orphaned {
                payment_intent_id: intent.id,
            });
        };

        let Some(ticket) = self.store.get(&ticket_id)? else {
            warn!(ticket_id = %ticket_id, payment_intent_id = %intent.id, "Payment for unknown ticket");
            return Ok(WebhookOutcome::Orphaned {
                payment_intent_id: intent.id,
            });
        };

        let (base_amount, tip_amount) = split_amount(intent.amount, &metadata);
        if base_amount != metadata.base_rate || tip_amount != metadata.tip_amount {
            warn!(
                ticket_id = %ticket_id,
                payment_intent_id = %intent.id,
                amount = intent.amount,
                base_rate = metadata.base_rate,
                tip_amount = metadata.tip_amount,
                "Charged amount does not match metadata breakdown"
            );
        }

        let currency = intent
            .currency
            .clone()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or_else(|| self.default_currency.clone());

        let payment = NewPaymentTransaction {
            ticket_id: ticket.id.clone(),
            job_id: ticket.job_id.clone(),
            amount: intent.amount,
            base_amount,
            tip_amount,
            currency,
            provider_transaction_id: intent.id.clone(),
        };

        let record = match self.store.record_payment(payment) {
            Ok(record) => record,
            Err(TicketError::NotFound(_)) => {
                warn!(ticket_id = %ticket_id, payment_intent_id = %intent.id, "Ticket vanished before payment was recorded");
                return Ok(WebhookOutcome::Orphaned {
                    payment_intent_id: intent.id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match record.outcome {
            RecordOutcome::Recorded(transaction) => {
                metrics::REVENUE_RECORDED
                    .with_label_values(&["base"])
                    .inc_by(transaction.base_amount.max(0) as u64);
                metrics::REVENUE_RECORDED
                    .with_label_values(&["tip"])
                    .inc_by(transaction.tip_amount.max(0) as u64);
                info!(
                    ticket_id = %ticket_id,
                    payment_intent_id = %intent.id,
                    amount = transaction.amount,
                    base_amount = transaction.base_amount,
                    tip_amount = transaction.tip_amount,
                    "Payment recorded"
                );
                Ok(WebhookOutcome::Recorded {
                    ticket_id,
                    payment_intent_id: intent.id,
                    amount: transaction.amount,
                })
            }
            RecordOutcome::Duplicate { .. } => {
                info!(ticket_id = %ticket_id, payment_intent_id = %intent.id, "Duplicate payment event");
                Ok(WebhookOutcome::Duplicate {
                    ticket_id,
                    payment_intent_id: intent.id,
                })
            }
        }
    }
}

/// Split a charged amount into `(base, tip)` so they always sum to `amount`.
///
/// The tip from metadata is clamped into `[0, amount]` and the base takes
/// the remainder.
fn split_amount(amount: MinorUnits, metadata: &ParsedMetadata) -> (MinorUnits, MinorUnits) {
    let tip = metadata.tip_amount.clamp(0, amount);
    (amount - tip, tip)
}
