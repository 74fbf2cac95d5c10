//! Testing utilities and mock collaborators.
//!
//! # Example
//!
//! ```rust,ignore
//! use valet_core::testing::{fixtures, MockPaymentProvider};
//!
//! let provider = MockPaymentProvider::new();
//! provider.fail_next("card network down");
//!
//! let payload = fixtures::payment_succeeded_event("pi_1", 1500, "t-1", "500", "1000");
//! let header = fixtures::sign_webhook("whsec_test_secret", &payload);
//! ```

mod mock_payment_provider;
mod mock_sms;

pub use mock_payment_provider::MockPaymentProvider;
pub use mock_sms::{MockSmsSender, SentSms};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::config::{
        AuthMethod, Config, DatabaseConfig, LiveConfig, OpsAuthConfig, ServerConfig,
        StripeConfig,
    };
    use crate::payment::compute_signature;
    use crate::ticket::{
        CreateJobRequest, CreateTicketRequest, Job, ParkingLocation, PaymentConfig,
        PaymentStatus, Ticket, TicketStatus, Vehicle,
    };

    /// Webhook signing secret used by [`stripe_config`].
    pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

    pub fn job_request(payment_config: Option<PaymentConfig>) -> CreateJobRequest {
        CreateJobRequest {
            title: "Spring Gala".to_string(),
            location: "Harbor Hotel".to_string(),
            payment_config,
        }
    }

    pub fn ticket_request(job_id: &str) -> CreateTicketRequest {
        CreateTicketRequest {
            job_id: job_id.to_string(),
            vehicle_id: None,
            code: None,
            parking: ParkingLocation::default(),
        }
    }

    /// An in-memory job, not persisted.
    pub fn job(id: &str, payment_config: Option<PaymentConfig>) -> Job {
        Job {
            id: id.to_string(),
            title: "Spring Gala".to_string(),
            location: "Harbor Hotel".to_string(),
            payment_config,
            created_at: Utc::now(),
        }
    }

    /// An in-memory unpaid ticket with no parking details, not persisted.
    pub fn ticket(id: &str, job_id: &str, status: TicketStatus) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: id.to_string(),
            code: format!("C{}", id.to_uppercase().replace('-', "")),
            status,
            created_at: now,
            parked_at: None,
            requested_at: None,
            completed_at: None,
            parking: ParkingLocation::default(),
            payment_status: PaymentStatus::Unpaid,
            payment_ref: None,
            vehicle_id: None,
            job_id: job_id.to_string(),
            updated_at: now,
        }
    }

    pub fn vehicle(id: &str) -> Vehicle {
        Vehicle {
            id: id.to_string(),
            make: Some("Honda".to_string()),
            model: Some("Civic".to_string()),
            color: Some("Blue".to_string()),
            license_plate: Some("7ABC123".to_string()),
        }
    }

    /// Signed-webhook Stripe config pointing at an unroutable API base.
    pub fn stripe_config() -> StripeConfig {
        StripeConfig {
            secret_key: "sk_test_fixture".to_string(),
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            allow_unsigned_webhooks: false,
            currency: "usd".to_string(),
            signature_tolerance_secs: 300,
            api_base: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            idempotency_window_secs: 60,
        }
    }

    /// Full config with open operator auth and no SMS.
    pub fn config() -> Config {
        Config {
            ops: OpsAuthConfig {
                method: AuthMethod::None,
                api_key: None,
            },
            stripe: stripe_config(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            sms: None,
            live: LiveConfig::default(),
        }
    }

    /// A `payment_intent.succeeded` event body.
    pub fn payment_succeeded_event(
        intent_id: &str,
        amount: i64,
        ticket_id: &str,
        base_rate: &str,
        tip_amount: &str,
    ) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": format!("evt_{}", intent_id),
            "type": "payment_intent.succeeded",
            "data": {
                "object": {
                    "id": intent_id,
                    "object": "payment_intent",
                    "amount": amount,
                    "currency": "usd",
                    "status": "succeeded",
                    "metadata": {
                        "ticketId": ticket_id,
                        "baseRate": base_rate,
                        "tipAmount": tip_amount,
                    }
                }
            }
        }))
        .expect("fixture event serializes")
    }

    /// `Stripe-Signature` header for `payload`, timestamped now.
    pub fn sign_webhook(secret: &str, payload: &[u8]) -> String {
        let timestamp = Utc::now().timestamp();
        format!(
            "t={},v1={}",
            timestamp,
            compute_signature(secret, timestamp, payload).expect("fixture secret signs")
        )
    }
}
