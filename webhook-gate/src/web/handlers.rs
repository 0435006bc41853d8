//! Webhook endpoint handlers.
//!
//! The webhook handler takes the body as raw [`Bytes`] so the signature is
//! checked against exactly what the platform sent. JSON parsing happens only
//! after the delivery is trusted.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::VerificationError;
use crate::queue::{Publisher, VerifiedEvent};
use crate::web::signature::verify;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub publisher: Option<Publisher>,
}

impl AppState {
    pub fn new(config: Config, publisher: Option<Publisher>) -> Self {
        Self {
            config: Arc::new(config),
            publisher,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Payroll Webhook
// =============================================================================

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    fn status(status: &'static str) -> Self {
        Self {
            status,
            event_type: None,
            error: None,
        }
    }
}

/// Map a rejection to its HTTP status and body.
///
/// Caller-side problems are 401. A missing secret is our own fault and is a 500.
pub fn rejection_response(err: VerificationError) -> (StatusCode, Json<WebhookResponse>) {
    let (code, status) = if err.is_configuration_fault() {
        (StatusCode::INTERNAL_SERVER_ERROR, "misconfigured")
    } else {
        (StatusCode::UNAUTHORIZED, "unauthorized")
    };

    (
        code,
        Json(WebhookResponse {
            error: Some(err.to_string()),
            ..WebhookResponse::status(status)
        }),
    )
}

/// Payroll platform webhook endpoint.
///
/// This endpoint:
/// 1. Verifies the HMAC signature over the method and raw body
/// 2. Parses the trusted body
/// 3. Publishes the event downstream (if a broker is configured)
/// 4. Returns 202 Accepted
pub async fn payroll_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let config = &state.config;

    // A header that is not valid UTF-8 cannot hold a hex signature.
    let claimed = headers
        .get(config.signature_header.as_str())
        .and_then(|v| v.to_str().ok());

    info!(
        method = %method,
        body_length = body.len(),
        has_signature = claimed.is_some(),
        "webhook_received"
    );

    if let Err(err) = verify(&body, claimed, config.secret(), method.as_str()) {
        if err.is_configuration_fault() {
            error!(reason = %err, kind = err.kind(), "webhook_rejected_misconfigured");
        } else {
            warn!(
                reason = %err,
                kind = err.kind(),
                signature_length = claimed.map(str::len).unwrap_or(0),
                "webhook_rejected"
            );
        }
        return rejection_response(err);
    }

    let event = match VerifiedEvent::from_verified_body(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "webhook_payload_invalid");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::status("invalid_payload")),
            );
        }
    };

    match &state.publisher {
        Some(publisher) => {
            if let Err(e) = publisher.publish(&event).await {
                error!(error = %e, "webhook_publish_failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(WebhookResponse::status("error")),
                );
            }
        }
        None => {
            info!(event_type = ?event.event_type, "webhook_publish_skipped_no_broker");
        }
    }

    info!(event_type = ?event.event_type, "webhook_accepted");

    (
        StatusCode::ACCEPTED,
        Json(WebhookResponse {
            event_type: event.event_type,
            ..WebhookResponse::status("accepted")
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_response_status_codes() {
        let (code, body) = rejection_response(VerificationError::MissingSignature);
        assert_eq!(code, StatusCode::UNAUTHORIZED);
        assert_eq!(body.status, "unauthorized");
        assert_eq!(body.error.as_deref(), Some("missing signature header"));

        let (code, _) = rejection_response(VerificationError::SignatureMismatch);
        assert_eq!(code, StatusCode::UNAUTHORIZED);

        let (code, body) = rejection_response(VerificationError::SecretNotConfigured);
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.status, "misconfigured");
    }

    #[test]
    fn test_webhook_response_skips_empty_fields() {
        let json = serde_json::to_value(WebhookResponse::status("accepted")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "accepted"}));
    }
}
