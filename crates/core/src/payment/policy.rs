//! When to offer payment, and how much to charge.
//!
//! All functions are pure in `(config, status)` so they can be re-evaluated
//! on every live update.

use super::PaymentError;
use crate::ticket::{ChargeModel, MinorUnits, PaymentConfig, PaymentTiming, TicketStatus};

/// Statuses during which drop-off payment is collected.
const DROPOFF_WINDOW: [TicketStatus; 3] = [
    TicketStatus::Queued,
    TicketStatus::Parked,
    TicketStatus::ParkingInProgress,
];

/// Statuses during which pickup payment is collected.
const PICKUP_WINDOW: [TicketStatus; 1] = [TicketStatus::Ready];

/// True if the guest owes a fee under this config.
pub fn is_guest_payable(config: Option<&PaymentConfig>) -> bool {
    matches!(
        config.map(|c| c.model),
        Some(ChargeModel::GuestPays) | Some(ChargeModel::Paid)
    )
}

/// Tips are on unless a config turns them off.
pub fn tips_allowed(config: Option<&PaymentConfig>) -> bool {
    config.map(|c| c.allow_tips).unwrap_or(true)
}

pub fn in_timing_window(timing: PaymentTiming, status: TicketStatus) -> bool {
    match timing {
        PaymentTiming::AtDropoff => DROPOFF_WINDOW.contains(&status),
        PaymentTiming::AtPickup => PICKUP_WINDOW.contains(&status),
    }
}

/// Timing test for a possibly absent config.
///
/// A job without payment config has no timing, so a tip is offered in
/// either window.
fn config_in_window(config: Option<&PaymentConfig>, status: TicketStatus) -> bool {
    match config {
        Some(c) => in_timing_window(c.timing, status),
        None => {
            in_timing_window(PaymentTiming::AtDropoff, status)
                || in_timing_window(PaymentTiming::AtPickup, status)
        }
    }
}

pub fn should_offer_payment(config: Option<&PaymentConfig>, status: TicketStatus) -> bool {
    is_guest_payable(config)
        && config.map(|c| c.base_rate > 0).unwrap_or(false)
        && config_in_window(config, status)
}

pub fn should_offer_tip_only(config: Option<&PaymentConfig>, status: TicketStatus) -> bool {
    !is_guest_payable(config) && tips_allowed(config) && config_in_window(config, status)
}

/// Base fee actually collected. Zero unless the guest is the payer.
pub fn collectible_base(config: Option<&PaymentConfig>) -> MinorUnits {
    match config {
        Some(c) if is_guest_payable(Some(c)) => c.base_rate,
        _ => 0,
    }
}

/// Convert a tip in dollars to minor units.
///
/// Rounds to the nearest cent, halves away from zero (`f64::round`).
/// Negative and non-finite tips are rejected.
pub fn tip_to_minor_units(tip_dollars: f64) -> Result<MinorUnits, PaymentError> {
    if !tip_dollars.is_finite() {
        return Err(PaymentError::InvalidInput(
            "tip must be a finite number".to_string(),
        ));
    }
    if tip_dollars < 0.0 {
        return Err(PaymentError::InvalidInput(format!(
            "tip must not be negative, got {}",
            tip_dollars
        )));
    }

    let cents = (tip_dollars * 100.0).round();
    if cents > MinorUnits::MAX as f64 {
        return Err(PaymentError::InvalidAmount(format!(
            "tip {} is too large",
            tip_dollars
        )));
    }

    Ok(cents as MinorUnits)
}

/// `base_rate + round(tip_dollars * 100)`.
///
/// A zero total is returned as `Ok(0)`; callers that charge must reject it.
pub fn compute_total(base_rate: MinorUnits, tip_dollars: f64) -> Result<MinorUnits, PaymentError> {
    if base_rate < 0 {
        return Err(PaymentError::InvalidAmount(format!(
            "base rate must not be negative, got {}",
            base_rate
        )));
    }

    let tip = tip_to_minor_units(tip_dollars)?;
    base_rate
        .checked_add(tip)
        .ok_or_else(|| PaymentError::InvalidAmount("total overflows".to_string()))
}
