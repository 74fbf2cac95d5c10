//! Guest-side view state folded from live snapshots.

use tracing::debug;

use crate::status::StatusView;
use crate::ticket::{Job, Ticket, Vehicle};

/// Latest known state of one guest's ticket.
///
/// Only `apply` changes the ticket, and it always replaces it whole.
#[derive(Debug, Clone)]
pub struct GuestSession {
    ticket: Ticket,
    job: Option<Job>,
    vehicle: Option<Vehicle>,
    view: StatusView,
}

impl GuestSession {
    pub fn new(ticket: Ticket, job: Option<Job>, vehicle: Option<Vehicle>) -> Self {
        let view = StatusView::derive(&ticket, job.as_ref(), vehicle.as_ref());
        Self {
            ticket,
            job,
            vehicle,
            view,
        }
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn view(&self) -> &StatusView {
        &self.view
    }

    /// True when `snapshot` points at a vehicle other than the one loaded.
    pub fn vehicle_changed(&self, snapshot: &Ticket) -> bool {
        snapshot.vehicle_id.as_deref() != self.vehicle.as_ref().map(|v| v.id.as_str())
    }

    /// Replace the ticket with `snapshot` and recompute the view.
    ///
    /// Returns `false` (and changes nothing) when the snapshot is for a
    /// different ticket.
    pub fn apply(&mut self, snapshot: Ticket) -> bool {
        if !self.owns(&snapshot) {
            return false;
        }
        self.ticket = snapshot;
        self.recompute();
        true
    }

    /// Like [`apply`](Self::apply), also replacing the vehicle.
    pub fn apply_with_vehicle(&mut self, snapshot: Ticket, vehicle: Option<Vehicle>) -> bool {
        if !self.owns(&snapshot) {
            return false;
        }
        self.ticket = snapshot;
        self.vehicle = vehicle;
        self.recompute();
        true
    }

    fn owns(&self, snapshot: &Ticket) -> bool {
        if snapshot.id != self.ticket.id {
            debug!(
                expected = %self.ticket.id,
                got = %snapshot.id,
                "Ignoring snapshot for another ticket"
            );
            return false;
        }
        true
    }

    fn recompute(&mut self) {
        self.view = StatusView::derive(&self.ticket, self.job.as_ref(), self.vehicle.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Phase;
    use crate::ticket::{ParkingLocation, PaymentStatus, TicketStatus};

    use crate::testing::fixtures;

    #[test]
    fn test_apply_replaces_ticket_wholesale() {
        let mut ticket = fixtures::ticket("t-1", "job-1", TicketStatus::Parked);
        ticket.parking = ParkingLocation {
            zone: Some("A".to_string()),
            level: Some("2".to_string()),
            spot: Some("7".to_string()),
        };
        let mut session = GuestSession::new(ticket, None, None);
        assert_eq!(session.view().parking_location.as_deref(), Some("A / 2 / 7"));

        // The new row has no parking fields; the stale ones must not survive
        let snapshot = fixtures::ticket("t-1", "job-1", TicketStatus::Ready);
        assert!(session.apply(snapshot));

        assert_eq!(session.ticket().status, TicketStatus::Ready);
        assert_eq!(session.ticket().parking, ParkingLocation::default());
        assert!(session.view().parking_location.is_none());
        assert_eq!(session.view().phase, Phase::Ready);
    }

    #[test]
    fn test_apply_recomputes_payment_offer() {
        let job = fixtures::job("job-1", None);
        let ticket = fixtures::ticket("t-1", &job.id, TicketStatus::Ready);
        let mut session = GuestSession::new(ticket.clone(), Some(job), None);
        assert!(session.view().payment.is_some());

        let mut paid = ticket;
        paid.payment_status = PaymentStatus::Paid;
        session.apply(paid);

        assert!(session.view().payment.is_none());
        assert!(session.view().paid);
    }

    #[test]
    fn test_apply_ignores_other_ticket() {
        let ticket = fixtures::ticket("t-1", "job-1", TicketStatus::Parked);
        let mut session = GuestSession::new(ticket, None, None);

        let other = fixtures::ticket("t-2", "job-1", TicketStatus::Completed);
        assert!(!session.apply(other));
        assert_eq!(session.ticket().status, TicketStatus::Parked);
    }

    #[test]
    fn test_vehicle_attached_after_connect() {
        let ticket = fixtures::ticket("t-1", "job-1", TicketStatus::Parked);
        let mut session = GuestSession::new(ticket.clone(), None, None);
        assert!(session.view().vehicle.is_none());
        assert!(!session.vehicle_changed(&ticket));

        let mut snapshot = ticket;
        snapshot.vehicle_id = Some("v-1".to_string());
        assert!(session.vehicle_changed(&snapshot));

        session.apply_with_vehicle(snapshot.clone(), Some(fixtures::vehicle("v-1")));
        assert!(session.view().vehicle.is_some());
        assert!(!session.vehicle_changed(&snapshot));

        // A plain apply keeps the resolved vehicle
        snapshot.status = TicketStatus::Ready;
        session.apply(snapshot);
        assert!(session.view().vehicle.is_some());
    }
}
