//! Web server module for receiving payroll platform webhooks.
//!
//! This module provides a thin web server that:
//! - Checks every delivery's HMAC signature against the raw body
//! - Publishes trusted events to RabbitMQ
//! - Rejects everything else with a credential-free reason

pub mod handlers;
pub mod signature;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, payroll_webhook, rejection_response, AppState, HealthResponse, WebhookResponse,
};
pub use signature::{sign, verify};

/// Path the platform delivers webhooks to.
pub const WEBHOOK_PATH: &str = "/webhooks/payroll";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route(WEBHOOK_PATH, post(payroll_webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
