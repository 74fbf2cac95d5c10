//! Ticket storage trait and types.

use std::fmt;

use crate::ticket::{
    Job, MinorUnits, ParkingLocation, PaymentConfig, PaymentTransaction, Ticket, TicketStatus,
    Vehicle,
};

/// Error type for ticket operations.
#[derive(Debug)]
pub enum TicketError {
    /// Ticket (or the job/vehicle it references) not found.
    NotFound(String),
    /// Cannot perform operation due to current status.
    InvalidState {
        ticket_id: String,
        current_state: String,
        operation: String,
    },
    /// Request rejected before touching storage.
    InvalidInput(String),
    /// Database error.
    Database(String),
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketError::NotFound(id) => write!(f, "Not found: {}", id),
            TicketError::InvalidState {
                ticket_id,
                current_state,
                operation,
            } => write!(
                f,
                "Cannot {} ticket {}: current status is {}",
                operation, ticket_id, current_state
            ),
            TicketError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            TicketError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for TicketError {}

/// Request to create a job.
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub title: String,
    pub location: String,
    pub payment_config: Option<PaymentConfig>,
}

/// Request to register a vehicle.
#[derive(Debug, Clone, Default)]
pub struct CreateVehicleRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub license_plate: Option<String>,
}

/// Request to open a ticket at drop-off.
#[derive(Debug, Clone)]
pub struct CreateTicketRequest {
    pub job_id: String,
    pub vehicle_id: Option<String>,
    /// Claim-tag code. Generated when absent.
    pub code: Option<String>,
    pub parking: ParkingLocation,
}

/// A confirmed payment to append to the ledger.
#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    pub ticket_id: String,
    pub job_id: String,
    pub amount: MinorUnits,
    pub base_amount: MinorUnits,
    pub tip_amount: MinorUnits,
    pub currency: String,
    pub provider_transaction_id: String,
}

/// Result of appending a payment.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    /// A new transaction row was written.
    Recorded(PaymentTransaction),
    /// A transaction with the same provider id already existed; nothing was
    /// appended but the ticket is (still) marked paid.
    Duplicate { provider_transaction_id: String },
}

/// Outcome of [`TicketStore::record_payment`].
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub outcome: RecordOutcome,
    /// Ticket row after the payment fields were applied.
    pub ticket: Ticket,
}

/// Trait for ticket storage backends.
///
/// Every ticket mutation is a single atomic row update so the guest path
/// and the operator path can write concurrently without locking here.
pub trait TicketStore: Send + Sync {
    /// Create a job.
    fn create_job(&self, request: CreateJobRequest) -> Result<Job, TicketError>;

    /// Get a job by ID.
    fn get_job(&self, id: &str) -> Result<Option<Job>, TicketError>;

    /// Register a vehicle.
    fn create_vehicle(&self, request: CreateVehicleRequest) -> Result<Vehicle, TicketError>;

    /// Get a vehicle by ID.
    fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>, TicketError>;

    /// Open a new ticket in `CREATED` status.
    fn create_ticket(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// Get a ticket by its claim-tag code.
    fn get_by_code(&self, code: &str) -> Result<Option<Ticket>, TicketError>;

    /// Set the status unconditionally (operator path).
    fn update_status(&self, id: &str, status: TicketStatus) -> Result<Ticket, TicketError>;

    /// Set the status only if the current status is one of `expected`.
    ///
    /// Fails with `InvalidState` when another writer moved the ticket first.
    fn compare_and_set_status(
        &self,
        id: &str,
        expected: &[TicketStatus],
        status: TicketStatus,
    ) -> Result<Ticket, TicketError>;

    /// Append a payment and mark the ticket paid, atomically.
    ///
    /// Keyed by provider transaction id: a repeated payment appends nothing.
    fn record_payment(&self, payment: NewPaymentTransaction) -> Result<PaymentRecord, TicketError>;

    /// List transactions recorded against a ticket, oldest first.
    fn list_transactions(&self, ticket_id: &str) -> Result<Vec<PaymentTransaction>, TicketError>;
}
