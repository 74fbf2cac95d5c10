//! Payment orchestration: eligibility, intent creation and webhook reconciliation.

mod error;
mod intent;
mod metadata;
pub mod policy;
mod provider;
mod stripe;
mod webhook;

pub use error::PaymentError;
pub use intent::{idempotency_key, IntentHandle, PaymentIntentService};
pub use metadata::{ChargeMetadata, ParsedMetadata};
pub use provider::{CreateIntentRequest, PaymentIntent, PaymentProvider, ProviderError};
pub use stripe::StripeClient;
pub use webhook::{
    compute_signature, verify_signature, verify_signature_at, SignatureError, StripeEvent,
    WebhookAuth, WebhookOutcome, WebhookReconciler, PAYMENT_SUCCEEDED,
};
