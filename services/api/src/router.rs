//! Axum Router Configuration
//!
//! The service exposes a liveness probe and the single interview WebSocket;
//! all other product endpoints live in the managed backend.

use crate::{state::AppState, ws::ws_handler};
use axum::{Router, routing::get};
use std::sync::Arc;

/// Liveness probe for the deployment environment.
async fn healthz() -> &'static str {
    "ok"
}

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws/interview", get(ws_handler))
        .with_state(app_state)
}
