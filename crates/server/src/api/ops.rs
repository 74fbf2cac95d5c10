//! Operator handlers: intake, status progression, ledger and notifications.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use valet_core::{
    ticket::ParkingLocation, CreateJobRequest, CreateTicketRequest, CreateVehicleRequest, Job,
    PaymentConfig, PaymentTransaction, SmsError, SmsReceipt, Ticket, TicketStatus, Vehicle,
};

use super::error::ApiError;
use super::middleware::AuthOperator;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub payment_config: Option<PaymentConfig>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVehicleBody {
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub license_plate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    pub job_id: String,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    /// Claim code printed on the tag. Generated when absent.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub parking: ParkingLocation,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SendSmsBody {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub ticket_id: String,
    pub transactions: Vec<PaymentTransaction>,
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(inner)| inner)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a job
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    AuthOperator(operator): AuthOperator,
    body: Result<Json<CreateJobBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let body = parse_body(body)?;
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let job = state.ticket_store().create_job(CreateJobRequest {
        title: body.title,
        location: body.location,
        payment_config: body.payment_config,
    })?;

    info!(job_id = %job.id, operator = %operator, "Job created");
    Ok((StatusCode::CREATED, Json(job)))
}

/// Register a vehicle
pub async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateVehicleBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Vehicle>), ApiError> {
    let body = parse_body(body)?;
    let vehicle = state.ticket_store().create_vehicle(CreateVehicleRequest {
        make: body.make,
        model: body.model,
        color: body.color,
        license_plate: body.license_plate,
    })?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Open a ticket at drop-off
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    AuthOperator(operator): AuthOperator,
    body: Result<Json<CreateTicketBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let body = parse_body(body)?;
    let ticket = state.ticket_store().create_ticket(CreateTicketRequest {
        job_id: body.job_id,
        vehicle_id: body.vehicle_id,
        code: body.code,
        parking: body.parking,
    })?;

    info!(ticket_id = %ticket.id, code = %ticket.code, operator = %operator, "Ticket opened");
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Move a ticket to a new status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    AuthOperator(operator): AuthOperator,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let body = parse_body(body)?;
    let status = TicketStatus::parse(&body.status)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown status: {}", body.status)))?;

    let ticket = state.ticket_store().update_status(&id, status)?;
    info!(ticket_id = %ticket.id, status = %status, operator = %operator, "Ticket status updated");
    Ok(Json(ticket))
}

/// Payment ledger for one ticket
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let store = state.ticket_store();
    if store.get(&id)?.is_none() {
        return Err(ApiError::not_found(format!("Ticket not found: {}", id)));
    }
    let transactions = store.list_transactions(&id)?;
    Ok(Json(TransactionsResponse {
        ticket_id: id,
        transactions,
    }))
}

/// Send a text to a guest
pub async fn send_sms(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SendSmsBody>, JsonRejection>,
) -> Result<Json<SmsReceipt>, ApiError> {
    let body = parse_body(body)?;
    let (Some(to), Some(text)) = (body.to, body.body) else {
        return Err(ApiError::bad_request("to and body are required"));
    };

    let sender = state.sms().ok_or_else(|| {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "SMS is not configured")
    })?;

    match sender.send(&to, &text).await {
        Ok(receipt) => Ok(Json(receipt)),
        Err(e @ SmsError::InvalidMessage(_)) => Err(ApiError::bad_request(e.to_string())),
        Err(e) => {
            warn!(error = %e, "SMS delivery failed");
            Err(ApiError::internal(e))
        }
    }
}
