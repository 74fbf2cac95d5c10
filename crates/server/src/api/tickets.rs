//! Guest-facing ticket handlers.
//!
//! Guests hold no credentials. The claim code gets them the ticket, and the
//! ticket id (returned with it) addresses everything else.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use valet_core::{Job, StatusView, Ticket, Vehicle};

use super::error::ApiError;
use crate::state::AppState;

/// Everything the guest status page renders.
#[derive(Debug, Serialize)]
pub struct GuestTicketResponse {
    pub ticket: Ticket,
    pub job: Option<Job>,
    pub vehicle: Option<Vehicle>,
    pub view: StatusView,
}

/// Load a ticket with its job and vehicle.
pub(crate) fn load_context(
    state: &AppState,
    ticket: Ticket,
) -> Result<GuestTicketResponse, ApiError> {
    let store = state.ticket_store();
    let job = store.get_job(&ticket.job_id)?;
    let vehicle = match ticket.vehicle_id.as_deref() {
        Some(id) => store.get_vehicle(id)?,
        None => None,
    };
    let view = StatusView::derive(&ticket, job.as_ref(), vehicle.as_ref());

    Ok(GuestTicketResponse {
        ticket,
        job,
        vehicle,
        view,
    })
}

/// Look up a ticket by its claim code
pub async fn get_by_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<GuestTicketResponse>, ApiError> {
    let ticket = state
        .ticket_store()
        .get_by_code(&code)?
        .ok_or_else(|| ApiError::not_found(format!("Ticket not found: {}", code)))?;

    Ok(Json(load_context(&state, ticket)?))
}

/// Ask for the car to be brought around
pub async fn request_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let ticket = state.requests().request_car(&id)?;
    info!(ticket_id = %ticket.id, "Guest requested car");
    Ok(Json(ticket))
}
