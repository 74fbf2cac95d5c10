//! Ticket status classification for the guest timeline.
//!
//! Every [`TicketStatus`] belongs to exactly one [`Phase`]. The match in
//! [`Phase::of`] is exhaustive, so adding a status forces a decision here.

mod view;

pub use view::{PaymentOffer, PaymentOfferKind, StatusView, TIP_PRESETS};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ticket::TicketStatus;

/// Ordered timeline phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    CheckedIn,
    Parked,
    Requested,
    OnTheWay,
    Ready,
    Terminal,
}

impl Phase {
    /// All phases in timeline order.
    pub const ALL: [Phase; 6] = [
        Phase::CheckedIn,
        Phase::Parked,
        Phase::Requested,
        Phase::OnTheWay,
        Phase::Ready,
        Phase::Terminal,
    ];

    pub fn of(status: TicketStatus) -> Phase {
        match status {
            TicketStatus::Created
            | TicketStatus::Queued
            | TicketStatus::Claimed
            | TicketStatus::ParkingInProgress => Phase::CheckedIn,
            TicketStatus::Parked | TicketStatus::OvernightParked => Phase::Parked,
            TicketStatus::Requested => Phase::Requested,
            TicketStatus::RetrievalInProgress => Phase::OnTheWay,
            TicketStatus::Ready => Phase::Ready,
            TicketStatus::Completed | TicketStatus::Closed | TicketStatus::Delivered => {
                Phase::Terminal
            }
        }
    }

    /// Position in the timeline, 0..=5.
    pub fn index(self) -> usize {
        match self {
            Phase::CheckedIn => 0,
            Phase::Parked => 1,
            Phase::Requested => 2,
            Phase::OnTheWay => 3,
            Phase::Ready => 4,
            Phase::Terminal => 5,
        }
    }

    /// Statuses that make up this phase.
    pub fn statuses(self) -> &'static [TicketStatus] {
        match self {
            Phase::CheckedIn => &[
                TicketStatus::Created,
                TicketStatus::Queued,
                TicketStatus::Claimed,
                TicketStatus::ParkingInProgress,
            ],
            Phase::Parked => &[TicketStatus::Parked, TicketStatus::OvernightParked],
            Phase::Requested => &[TicketStatus::Requested],
            Phase::OnTheWay => &[TicketStatus::RetrievalInProgress],
            Phase::Ready => &[TicketStatus::Ready],
            Phase::Terminal => &[
                TicketStatus::Completed,
                TicketStatus::Closed,
                TicketStatus::Delivered,
            ],
        }
    }

    /// Stable key used by clients for the timeline step.
    pub fn key(self) -> &'static str {
        match self {
            Phase::CheckedIn => "checked_in",
            Phase::Parked => "parked",
            Phase::Requested => "requested",
            Phase::OnTheWay => "on_the_way",
            Phase::Ready => "ready",
            Phase::Terminal => "terminal",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::CheckedIn => "Checked In",
            Phase::Parked => "Parked",
            Phase::Requested => "Requested",
            Phase::OnTheWay => "On the Way",
            Phase::Ready => "Ready",
            Phase::Terminal => "Complete",
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            Phase::CheckedIn => "Your vehicle is being checked in",
            Phase::Parked => "Your vehicle is parked and secure",
            Phase::Requested => "We've received your request",
            Phase::OnTheWay => "Your car is on its way!",
            Phase::Ready => "Your car is ready!",
            Phase::Terminal => "Thank you! Have a great night",
        }
    }

    pub fn subtext(self) -> &'static str {
        match self {
            Phase::CheckedIn => "A valet attendant is handling your vehicle",
            Phase::Parked => {
                "Your keys are safe with us. Request your car when you're ready to leave."
            }
            Phase::Requested => "A valet attendant will retrieve your car shortly",
            Phase::OnTheWay => "Your car is being brought to the front",
            Phase::Ready => "Your car is waiting at the front",
            Phase::Terminal => "We hope you had a great experience",
        }
    }
}

/// Timeline position of a status.
pub fn phase_index(status: TicketStatus) -> usize {
    Phase::of(status).index()
}

/// Timeline position of a raw status code. Unknown codes map to 0.
pub fn phase_index_str(raw: &str) -> usize {
    match TicketStatus::parse(raw) {
        Some(status) => phase_index(status),
        None => {
            warn!(status = %raw, "Unknown status code, showing first phase");
            0
        }
    }
}

pub fn is_terminal(status: TicketStatus) -> bool {
    Phase::of(status) == Phase::Terminal
}

/// Highlight state of one timeline step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Complete,
    Current,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineStep {
    pub key: String,
    pub label: String,
    pub state: StepState,
}

/// The five guest-visible steps, or a collapsed timeline once terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timeline {
    pub steps: Vec<TimelineStep>,
    pub collapsed: bool,
}

impl Timeline {
    pub fn for_status(status: TicketStatus) -> Self {
        let current = Phase::of(status);
        let collapsed = current == Phase::Terminal;

        let steps = Phase::ALL
            .into_iter()
            .filter(|phase| *phase != Phase::Terminal)
            .map(|phase| {
                let state = if collapsed || phase < current {
                    StepState::Complete
                } else if phase == current {
                    StepState::Current
                } else {
                    StepState::Pending
                };
                TimelineStep {
                    key: phase.key().to_string(),
                    label: phase.label().to_string(),
                    state,
                }
            })
            .collect();

        Self { steps, collapsed }
    }
}
