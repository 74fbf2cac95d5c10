//! HTTP and WebSocket surface for the valet service.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
