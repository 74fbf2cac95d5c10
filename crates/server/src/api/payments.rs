//! Payment intent and provider webhook handlers.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use crate::state::AppState;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentBody {
    #[serde(default)]
    pub ticket_id: Option<String>,
    /// Tip in major currency units.
    #[serde(default, alias = "tipAmount")]
    pub tip_dollars: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_handle: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Create a payment intent for a ticket
pub async fn create_intent(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateIntentBody>, JsonRejection>,
) -> Result<Json<CreateIntentResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let ticket_id = body
        .ticket_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("ticketId is required"))?;

    let handle = state
        .intents()
        .create_intent(&ticket_id, body.tip_dollars.unwrap_or(0.0))
        .await?;

    Ok(Json(CreateIntentResponse {
        client_handle: handle.client_handle,
    }))
}

/// Receive a payment provider webhook.
///
/// Any authenticated, well-formed event is acknowledged, including ones
/// that are ignored or reference unknown tickets.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.reconciler().handle(&body, signature)?;
    debug!(outcome = outcome.label(), "Webhook acknowledged");

    Ok(Json(WebhookAck { received: true }))
}
