//! Payment intent creation.

use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use super::{policy, ChargeMetadata, CreateIntentRequest, PaymentError, PaymentProvider};
use crate::config::StripeConfig;
use crate::metrics;
use crate::ticket::{MinorUnits, TicketStore};

/// What the guest UI needs to finish the charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentHandle {
    /// Opaque handle handed to the browser payment form.
    pub client_handle: String,
    pub amount: MinorUnits,
}

/// Resolves the authoritative charge for a ticket and asks the provider
/// to authorize it.
pub struct PaymentIntentService {
    store: Arc<dyn TicketStore>,
    provider: Arc<dyn PaymentProvider>,
    currency: String,
    idempotency_window_secs: u64,
}

impl PaymentIntentService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        provider: Arc<dyn PaymentProvider>,
        config: &StripeConfig,
    ) -> Self {
        Self {
            store,
            provider,
            currency: config.currency.to_ascii_lowercase(),
            idempotency_window_secs: config.idempotency_window_secs,
        }
    }

    pub async fn create_intent(
        &self,
        ticket_id: &str,
        tip_dollars: f64,
    ) -> Result<IntentHandle, PaymentError> {
        let result = self.try_create(ticket_id, tip_dollars).await;

        let label = match &result {
            Ok(_) => "created",
            Err(e) => e.kind(),
        };
        metrics::PAYMENT_INTENTS.with_label_values(&[label]).inc();

        result
    }

    async fn try_create(
        &self,
        ticket_id: &str,
        tip_dollars: f64,
    ) -> Result<IntentHandle, PaymentError> {
        let ticket = self
            .store
            .get(ticket_id)?
            .ok_or_else(|| PaymentError::NotFound(format!("ticket {}", ticket_id)))?;

        let job = self
            .store
            .get_job(&ticket.job_id)?
            .ok_or_else(|| PaymentError::NotFound(format!("job {}", ticket.job_id)))?;
        let config = job.payment_config.as_ref();

        let tip = policy::tip_to_minor_units(tip_dollars)?;
        if tip > 0 && !policy::tips_allowed(config) {
            return Err(PaymentError::InvalidInput(
                "tips are disabled for this job".to_string(),
            ));
        }

        let base_rate = policy::collectible_base(config);
        let total = policy::compute_total(base_rate, tip_dollars)?;
        if total <= 0 {
            return Err(PaymentError::InvalidAmount(format!(
                "nothing to charge for ticket {}",
                ticket_id
            )));
        }

        let metadata = ChargeMetadata {
            ticket_id: ticket.id.clone(),
            job_id: job.id.clone(),
            ticket_code: ticket.code.clone(),
            base_rate,
            tip_amount: tip,
        };

        let request = CreateIntentRequest {
            amount: total,
            currency: self.currency.clone(),
            metadata: metadata.to_map(),
            idempotency_key: idempotency_key(
                &ticket.id,
                total,
                tip,
                chrono::Utc::now().timestamp(),
                self.idempotency_window_secs,
            ),
        };

        let started = Instant::now();
        let outcome = self.provider.create_intent(&request).await;
        metrics::PROVIDER_REQUEST_DURATION
            .with_label_values(&[self.provider.name(), "create_intent"])
            .observe(started.elapsed().as_secs_f64());

        let intent = outcome.map_err(|e| {
            error!(ticket_id = %ticket.id, amount = total, error = %e, "Payment intent creation failed");
            PaymentError::ProviderFailure(e)
        })?;

        let client_handle = intent.client_secret.clone().ok_or_else(|| {
            warn!(payment_intent_id = %intent.id, "Provider returned intent without client secret");
            PaymentError::ProviderFailure(super::ProviderError::Decode(
                "missing client_secret".to_string(),
            ))
        })?;

        info!(
            ticket_id = %ticket.id,
            payment_intent_id = %intent.id,
            amount = total,
            base_amount = base_rate,
            tip_amount = tip,
            "Payment intent created"
        );

        Ok(IntentHandle {
            client_handle,
            amount: total,
        })
    }
}

/// Idempotency key for an intent request, stable within one time bucket.
///
/// Returns `None` when `window_secs` is 0.
pub fn idempotency_key(
    ticket_id: &str,
    total: MinorUnits,
    tip: MinorUnits,
    now_secs: i64,
    window_secs: u64,
) -> Option<String> {
    if window_secs == 0 {
        return None;
    }
    let bucket = now_secs.div_euclid(window_secs as i64);
    let digest = Sha256::digest(format!("{}|{}|{}|{}", ticket_id, total, tip, bucket));
    Some(format!("valet-{}", hex::encode(&digest[..16])))
}
