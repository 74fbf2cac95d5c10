//! Valet tickets, their jobs and vehicles, and the payment ledger.

mod request;
mod sqlite_store;
mod store;
mod types;

pub use request::TicketRequestHandler;
pub use sqlite_store::SqliteTicketStore;
pub use store::{
    CreateJobRequest, CreateTicketRequest, CreateVehicleRequest, NewPaymentTransaction,
    PaymentRecord, RecordOutcome, TicketError, TicketStore,
};
pub use types::{
    ChargeModel, Job, MinorUnits, ParkingLocation, PaymentConfig, PaymentStatus, PaymentTiming,
    PaymentTransaction, Ticket, TicketStatus, TransactionStatus, Vehicle,
};
