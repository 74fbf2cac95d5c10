//! Guest-initiated car requests.

use std::sync::Arc;

use tracing::{info, warn};

use super::{Ticket, TicketError, TicketStatus, TicketStore};
use crate::metrics;
use crate::status::Phase;

/// Moves a parked ticket to `REQUESTED` on the guest's behalf.
///
/// This is the only status write a guest can make. It never skips ahead.
pub struct TicketRequestHandler {
    store: Arc<dyn TicketStore>,
}

impl TicketRequestHandler {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Request the car for `ticket_id`.
    ///
    /// Fails with `InvalidState` when the ticket is outside the parked phase,
    /// including when an operator moved it between our read and our write.
    pub fn request_car(&self, ticket_id: &str) -> Result<Ticket, TicketError> {
        let result = self.try_request(ticket_id);

        let label = match &result {
            Ok(_) => "requested",
            Err(TicketError::NotFound(_)) => "not_found",
            Err(TicketError::InvalidState { .. }) => "rejected",
            Err(_) => "error",
        };
        metrics::CAR_REQUESTS.with_label_values(&[label]).inc();

        result
    }

    fn try_request(&self, ticket_id: &str) -> Result<Ticket, TicketError> {
        let ticket = self
            .store
            .get(ticket_id)?
            .ok_or_else(|| TicketError::NotFound(ticket_id.to_string()))?;

        if Phase::of(ticket.status) != Phase::Parked {
            warn!(
                ticket_id = %ticket_id,
                status = %ticket.status,
                "Car request outside parked phase"
            );
            return Err(TicketError::InvalidState {
                ticket_id: ticket_id.to_string(),
                current_state: ticket.status.to_string(),
                operation: "request car for".to_string(),
            });
        }

        let updated = self.store.compare_and_set_status(
            ticket_id,
            Phase::Parked.statuses(),
            TicketStatus::Requested,
        )?;

        info!(ticket_id = %ticket_id, code = %updated.code, "Car requested");
        Ok(updated)
    }
}
