//! Derived guest view of a ticket.

use serde::{Deserialize, Serialize};

use super::{Phase, Timeline};
use crate::payment::policy;
use crate::ticket::{Job, MinorUnits, Ticket, TicketStatus, Vehicle};

/// Tip buttons offered to the guest, in whole dollars.
pub const TIP_PRESETS: [u32; 4] = [0, 5, 10, 20];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOfferKind {
    /// Base fee, optionally plus tip.
    Full,
    /// Tip only, nothing is owed.
    TipOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentOffer {
    pub kind: PaymentOfferKind,
    /// Zero for tip-only offers.
    pub base_rate: MinorUnits,
    pub tips_allowed: bool,
    /// Empty when tips are disabled.
    pub tip_presets: Vec<u32>,
}

/// Everything the guest page shows, recomputed from the latest snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusView {
    pub ticket_id: String,
    pub code: String,
    pub status: TicketStatus,
    pub phase: Phase,
    pub phase_index: usize,
    pub headline: String,
    pub subtext: String,
    pub timeline: Timeline,
    pub show_request_button: bool,
    pub payment: Option<PaymentOffer>,
    pub parking_location: Option<String>,
    pub vehicle: Option<String>,
    pub job_title: Option<String>,
    pub paid: bool,
}

impl StatusView {
    /// Pure derivation. Same inputs always give the same view.
    pub fn derive(ticket: &Ticket, job: Option<&Job>, vehicle: Option<&Vehicle>) -> Self {
        let phase = Phase::of(ticket.status);
        let config = job.and_then(|j| j.payment_config.as_ref());
        let paid = ticket.is_paid();

        let payment = if paid {
            None
        } else {
            payment_offer(config, ticket.status)
        };

        Self {
            ticket_id: ticket.id.clone(),
            code: ticket.code.clone(),
            status: ticket.status,
            phase,
            phase_index: phase.index(),
            headline: phase.headline().to_string(),
            subtext: phase.subtext().to_string(),
            timeline: Timeline::for_status(ticket.status),
            show_request_button: phase == Phase::Parked,
            payment,
            parking_location: ticket.parking.describe(),
            vehicle: vehicle.map(Vehicle::describe).filter(|line| !line.is_empty()),
            job_title: job.map(|j| j.title.clone()),
            paid,
        }
    }
}

fn payment_offer(
    config: Option<&crate::ticket::PaymentConfig>,
    status: TicketStatus,
) -> Option<PaymentOffer> {
    let tips_allowed = policy::tips_allowed(config);
    let presets = if tips_allowed {
        TIP_PRESETS.to_vec()
    } else {
        Vec::new()
    };

    if policy::should_offer_payment(config, status) {
        Some(PaymentOffer {
            kind: PaymentOfferKind::Full,
            base_rate: config.map(|c| c.base_rate).unwrap_or(0),
            tips_allowed,
            tip_presets: presets,
        })
    } else if policy::should_offer_tip_only(config, status) {
        Some(PaymentOffer {
            kind: PaymentOfferKind::TipOnly,
            base_rate: 0,
            tips_allowed,
            tip_presets: presets,
        })
    } else {
        None
    }
}
