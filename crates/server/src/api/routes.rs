use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{handlers, ops, payments, tickets, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Operator routes, behind [ops] auth
    let ops_routes = Router::new()
        .route("/jobs", post(ops::create_job))
        .route("/vehicles", post(ops::create_vehicle))
        .route("/tickets", post(ops::create_ticket))
        .route("/tickets/{id}/status", put(ops::update_status))
        .route("/tickets/{id}/transactions", get(ops::list_transactions))
        .route("/sms", post(ops::send_sms))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    // Guest and infra routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/tickets/code/{code}", get(tickets::get_by_code))
        .route("/tickets/{id}/request", post(tickets::request_car))
        .route("/tickets/{id}/live", get(ws::live_handler))
        .route("/payments/intent", post(payments::create_intent))
        .route("/webhooks/stripe", post(payments::stripe_webhook))
        .nest("/ops", ops_routes);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
