//! Core ticket data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Money amount in minor currency units (cents).
pub type MinorUnits = i64;

// ============================================================================
// Ticket Status
// ============================================================================

/// Detailed status of a valet ticket.
///
/// The valet-operations system drives most transitions; the guest can only
/// move a ticket from the parked phase to `Requested`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Created,
    Queued,
    Claimed,
    ParkingInProgress,
    Parked,
    OvernightParked,
    Requested,
    RetrievalInProgress,
    Ready,
    Completed,
    Closed,
    Delivered,
}

impl TicketStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [TicketStatus; 12] = [
        TicketStatus::Created,
        TicketStatus::Queued,
        TicketStatus::Claimed,
        TicketStatus::ParkingInProgress,
        TicketStatus::Parked,
        TicketStatus::OvernightParked,
        TicketStatus::Requested,
        TicketStatus::RetrievalInProgress,
        TicketStatus::Ready,
        TicketStatus::Completed,
        TicketStatus::Closed,
        TicketStatus::Delivered,
    ];

    /// Returns the wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Created => "CREATED",
            TicketStatus::Queued => "QUEUED",
            TicketStatus::Claimed => "CLAIMED",
            TicketStatus::ParkingInProgress => "PARKING_IN_PROGRESS",
            TicketStatus::Parked => "PARKED",
            TicketStatus::OvernightParked => "OVERNIGHT_PARKED",
            TicketStatus::Requested => "REQUESTED",
            TicketStatus::RetrievalInProgress => "RETRIEVAL_IN_PROGRESS",
            TicketStatus::Ready => "READY",
            TicketStatus::Completed => "COMPLETED",
            TicketStatus::Closed => "CLOSED",
            TicketStatus::Delivered => "DELIVERED",
        }
    }

    /// Parse a wire/storage representation. Returns `None` for unknown codes.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == raw)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the guest has paid for this ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw == "paid" {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        }
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// Where the vehicle was left. Every part is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ParkingLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot: Option<String>,
}

impl ParkingLocation {
    /// Human-readable location like `B / 2 / 14`, skipping empty parts.
    /// Returns `None` when nothing is known.
    pub fn describe(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.zone, &self.level, &self.spot]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" / "))
        }
    }
}

/// A valet ticket: one guest's vehicle from drop-off through pickup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Unique identifier (UUID).
    pub id: String,

    /// Short human-readable code printed on the claim tag. Doubles as the
    /// guest's only capability for viewing the ticket.
    pub code: String,

    /// Current status.
    pub status: TicketStatus,

    /// Drop-off time.
    pub created_at: DateTime<Utc>,

    /// First time the vehicle entered the parked phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parked_at: Option<DateTime<Utc>>,

    /// Most recent time the vehicle was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,

    /// First time the ticket reached a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub parking: ParkingLocation,

    #[serde(default)]
    pub payment_status: PaymentStatus,

    /// Provider transaction id of the payment that settled this ticket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,

    /// Owning job (venue/event).
    pub job_id: String,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

// ============================================================================
// Job and Payment Configuration
// ============================================================================

/// Who pays for the valet service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeModel {
    GuestPays,
    Paid,
    /// Host-paid or complimentary. Unknown models land here too, so an
    /// unrecognized model never makes a guest pay.
    #[serde(other)]
    Free,
}

/// When in the lifecycle payment is collected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentTiming {
    AtDropoff,
    #[default]
    AtPickup,
}

/// Payment settings for a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfig {
    pub model: ChargeModel,

    /// Base fee in minor units. Ignored unless the model makes the guest pay.
    #[serde(default)]
    pub base_rate: MinorUnits,

    #[serde(default = "default_allow_tips")]
    pub allow_tips: bool,

    #[serde(default)]
    pub timing: PaymentTiming,
}

fn default_allow_tips() -> bool {
    true
}

impl PaymentConfig {
    /// Check the invariants a stored config must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_rate < 0 {
            return Err(format!(
                "baseRate must be non-negative, got {}",
                self.base_rate
            ));
        }
        Ok(())
    }
}

/// The venue/event a ticket belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_config: Option<PaymentConfig>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Vehicle
// ============================================================================

/// Descriptive vehicle information. Read-only from the guest's side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vehicle {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
}

impl Vehicle {
    /// Display line like `Blue Honda Civic • 7ABC123`.
    pub fn describe(&self) -> String {
        let mut line = [&self.color, &self.make, &self.model]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if let Some(plate) = self.license_plate.as_deref().filter(|p| !p.is_empty()) {
            if line.is_empty() {
                line.push_str(plate);
            } else {
                line.push_str(" \u{2022} ");
                line.push_str(plate);
            }
        }

        line
    }
}

// ============================================================================
// Payment Transactions
// ============================================================================

/// Status of a recorded transaction. Only successful payments are recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Succeeded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Succeeded => "succeeded",
        }
    }
}

/// An append-only record of a confirmed payment.
///
/// Invariant: `amount == base_amount + tip_amount`, all non-negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentTransaction {
    pub id: String,
    pub ticket_id: String,
    pub job_id: String,
    pub amount: MinorUnits,
    pub base_amount: MinorUnits,
    pub tip_amount: MinorUnits,
    pub currency: String,
    /// Provider-side id (payment intent id). Unique across all transactions.
    pub provider_transaction_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_wire_name() {
        for status in TicketStatus::ALL {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_unknown_status_does_not_parse() {
        assert_eq!(TicketStatus::parse("TOWED"), None);
        assert_eq!(TicketStatus::parse("parked"), None);
    }

    #[test]
    fn test_payment_config_uses_camel_case_keys() {
        let config: PaymentConfig = serde_json::from_str(
            r#"{"model":"GUEST_PAYS","baseRate":500,"allowTips":false,"timing":"AT_DROPOFF"}"#,
        )
        .unwrap();

        assert_eq!(config.model, ChargeModel::GuestPays);
        assert_eq!(config.base_rate, 500);
        assert!(!config.allow_tips);
        assert_eq!(config.timing, PaymentTiming::AtDropoff);
    }

    #[test]
    fn test_payment_config_defaults() {
        let config: PaymentConfig = serde_json::from_str(r#"{"model":"PAID"}"#).unwrap();
        assert_eq!(config.base_rate, 0);
        assert!(config.allow_tips);
        assert_eq!(config.timing, PaymentTiming::AtPickup);
    }

    #[test]
    fn test_unknown_charge_model_is_free() {
        let config: PaymentConfig =
            serde_json::from_str(r#"{"model":"HOST_PAYS","baseRate":900}"#).unwrap();
        assert_eq!(config.model, ChargeModel::Free);
    }

    #[test]
    fn test_negative_base_rate_is_invalid() {
        let config = PaymentConfig {
            model: ChargeModel::GuestPays,
            base_rate: -1,
            allow_tips: true,
            timing: PaymentTiming::AtPickup,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parking_location_describe() {
        let location = ParkingLocation {
            zone: Some("B".to_string()),
            level: None,
            spot: Some("14".to_string()),
        };
        assert_eq!(location.describe().as_deref(), Some("B / 14"));
        assert_eq!(ParkingLocation::default().describe(), None);
    }

    #[test]
    fn test_vehicle_describe() {
        let vehicle = Vehicle {
            id: "v1".to_string(),
            make: Some("Honda".to_string()),
            model: Some("Civic".to_string()),
            color: Some("Blue".to_string()),
            license_plate: Some("7ABC123".to_string()),
        };
        assert_eq!(vehicle.describe(), "Blue Honda Civic \u{2022} 7ABC123");

        let plate_only = Vehicle {
            id: "v2".to_string(),
            make: None,
            model: None,
            color: None,
            license_plate: Some("XYZ".to_string()),
        };
        assert_eq!(plate_only.describe(), "XYZ");
    }
}
