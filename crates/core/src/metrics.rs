//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Payment intents and webhook reconciliation
//! - Guest car requests
//! - Outbound calls (payment provider, SMS)
//! - Live feed subscribers

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Payments
// =============================================================================

/// Payment intent requests by result.
pub static PAYMENT_INTENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "valet_payment_intents_total",
            "Payment intent requests by result",
        ),
        &["result"], // "created" or a PaymentError kind
    )
    .unwrap()
});

/// Webhook events by type and outcome.
pub static WEBHOOK_EVENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("valet_webhook_events_total", "Payment webhook events"),
        &["event_type", "outcome"], // outcome: recorded, duplicate, ignored, rejected, orphaned
    )
    .unwrap()
});

/// Revenue recorded in minor units.
pub static REVENUE_RECORDED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "valet_revenue_recorded_minor_units_total",
            "Revenue recorded from confirmed payments, in minor currency units",
        ),
        &["component"], // "base", "tip"
    )
    .unwrap()
});

// =============================================================================
// Tickets
// =============================================================================

/// Guest car requests by result.
pub static CAR_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("valet_car_requests_total", "Guest car requests by result"),
        &["result"], // "requested", "rejected", "not_found", "error"
    )
    .unwrap()
});

/// Live subscribers that fell behind the feed.
pub static LIVE_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "valet_live_lag_events_total",
        "Live status subscribers that skipped snapshots",
    )
    .unwrap()
});

// =============================================================================
// External services
// =============================================================================

/// Payment provider request duration.
pub static PROVIDER_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "valet_provider_request_duration_seconds",
            "Duration of payment provider requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["provider", "operation"],
    )
    .unwrap()
});

/// SMS sends by result.
pub static SMS_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("valet_sms_sent_total", "SMS messages by result"),
        &["result"], // "sent", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PAYMENT_INTENTS.clone()),
        Box::new(WEBHOOK_EVENTS.clone()),
        Box::new(REVENUE_RECORDED.clone()),
        Box::new(CAR_REQUESTS.clone()),
        Box::new(LIVE_LAG_EVENTS.clone()),
        Box::new(PROVIDER_REQUEST_DURATION.clone()),
        Box::new(SMS_SENT.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }
}
