//! Change feed for ticket rows.
//!
//! Every store mutation publishes the full updated ticket. Subscribers pick
//! out the one ticket they watch and always get whole rows, never diffs.

mod session;

pub use session::GuestSession;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::metrics;
use crate::ticket::Ticket;

/// Broadcasts ticket snapshots to live subscribers.
#[derive(Debug, Clone)]
pub struct TicketFeed {
    sender: broadcast::Sender<Arc<Ticket>>,
}

impl TicketFeed {
    /// Create a new feed with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a snapshot of `ticket`.
    pub fn publish(&self, ticket: &Ticket) {
        // Send errors just mean no one is listening
        let _ = self.sender.send(Arc::new(ticket.clone()));
    }

    /// Watch a single ticket.
    pub fn subscribe(&self, ticket_id: &str) -> TicketSubscription {
        TicketSubscription {
            ticket_id: ticket_id.to_string(),
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions across all tickets.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for TicketFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Snapshots for one ticket id.
pub struct TicketSubscription {
    ticket_id: String,
    receiver: broadcast::Receiver<Arc<Ticket>>,
}

impl TicketSubscription {
    pub fn ticket_id(&self) -> &str {
        &self.ticket_id
    }

    /// Next snapshot for this ticket, or `None` once the feed is gone.
    ///
    /// After a lag the subscriber skips ahead: the next snapshot it sees
    /// supersedes everything it missed.
    pub async fn recv(&mut self) -> Option<Ticket> {
        loop {
            match self.receiver.recv().await {
                Ok(ticket) if ticket.id == self.ticket_id => return Some((*ticket).clone()),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(ticket_id = %self.ticket_id, skipped, "Live subscriber lagged");
                    metrics::LIVE_LAG_EVENTS.inc();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(ticket_id = %self.ticket_id, "Ticket feed closed");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use crate::ticket::TicketStatus;

    #[tokio::test]
    async fn test_subscription_filters_by_ticket() {
        let feed = TicketFeed::new(16);
        let mut subscription = feed.subscribe("t-1");

        feed.publish(&fixtures::ticket("t-2", "job-1", TicketStatus::Parked));
        feed.publish(&fixtures::ticket("t-1", "job-1", TicketStatus::Ready));

        let received = subscription.recv().await.unwrap();
        assert_eq!(received.id, "t-1");
        assert_eq!(received.status, TicketStatus::Ready);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_ahead() {
        let feed = TicketFeed::new(2);
        let mut subscription = feed.subscribe("t-1");

        for status in [
            TicketStatus::Parked,
            TicketStatus::Requested,
            TicketStatus::RetrievalInProgress,
            TicketStatus::Ready,
        ] {
            feed.publish(&fixtures::ticket("t-1", "job-1", status));
        }

        let first = subscription.recv().await.unwrap();
        assert_eq!(first.status, TicketStatus::RetrievalInProgress);
        let second = subscription.recv().await.unwrap();
        assert_eq!(second.status, TicketStatus::Ready);
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let feed = TicketFeed::new(4);
        let mut subscription = feed.subscribe("t-1");
        drop(feed);

        assert!(subscription.recv().await.is_none());
    }

    #[test]
    fn test_subscriber_count() {
        let feed = TicketFeed::default();
        assert_eq!(feed.subscriber_count(), 0);
        let _a = feed.subscribe("t-1");
        let _b = feed.subscribe("t-2");
        assert_eq!(feed.subscriber_count(), 2);
    }
}
