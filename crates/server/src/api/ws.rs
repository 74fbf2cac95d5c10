//! Live status WebSocket for the guest page.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use valet_core::{GuestSession, StatusView, Ticket, TicketSubscription, Vehicle};

use super::error::ApiError;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Message pushed to the guest page.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveMessage<'a> {
    /// Full ticket row and the view derived from it.
    Snapshot {
        ticket: &'a Ticket,
        view: &'a StatusView,
    },
}

/// WebSocket upgrade handler for `GET /tickets/{id}/live`.
pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    // Subscribe before the first read so no update slips between the
    // initial view and the first push
    let subscription = state.feed().subscribe(&id);
    let ticket = state
        .ticket_store()
        .get(&id)?
        .ok_or_else(|| ApiError::not_found(format!("Ticket not found: {}", id)))?;

    let context = super::tickets::load_context(&state, ticket)?;
    let session = GuestSession::new(context.ticket, context.job, context.vehicle);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, session, subscription)))
}

async fn send_view(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    session: &GuestSession,
    kind: &str,
) -> bool {
    let message = LiveMessage::Snapshot {
        ticket: session.ticket(),
        view: session.view(),
    };
    let json = match serde_json::to_string(&message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize live message: {}", e);
            return true;
        }
    };

    WS_MESSAGES_SENT.with_label_values(&[kind]).inc();
    sender.send(Message::Text(json.into())).await.is_ok()
}

fn resolve_vehicle(state: &AppState, ticket: &Ticket) -> Option<Vehicle> {
    let id = ticket.vehicle_id.as_deref()?;
    match state.ticket_store().get_vehicle(id) {
        Ok(vehicle) => vehicle,
        Err(e) => {
            warn!(vehicle_id = %id, error = %e, "Failed to load vehicle for live view");
            None
        }
    }
}

/// One sequential loop per connection: push snapshots, watch for close.
async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    mut session: GuestSession,
    mut subscription: TicketSubscription,
) {
    let (mut sender, mut receiver) = socket.split();
    let ticket_id = session.ticket().id.clone();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!(ticket_id = %ticket_id, "Live status client connected");

    if send_view(&mut sender, &session, "initial").await {
        loop {
            tokio::select! {
                snapshot = subscription.recv() => {
                    let Some(snapshot) = snapshot else {
                        debug!("Ticket feed closed");
                        break;
                    };
                    if session.vehicle_changed(&snapshot) {
                        let vehicle = resolve_vehicle(&state, &snapshot);
                        session.apply_with_vehicle(snapshot, vehicle);
                    } else {
                        session.apply(snapshot);
                    }
                    if !send_view(&mut sender, &session, "update").await {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                incoming = receiver.next() => {
                    match incoming {
                        Some(Ok(Message::Close(_))) | None => {
                            debug!("WebSocket client closed");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("WebSocket receive error: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    }

    WS_CONNECTIONS_ACTIVE.dec();
    info!(ticket_id = %ticket_id, "Live status client disconnected");
}
