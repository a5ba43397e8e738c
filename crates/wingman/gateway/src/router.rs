//! Gateway router configuration

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::GatewayState;

/// Create the execution gateway router
pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/gateway/execute", post(handlers::execute_command))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
