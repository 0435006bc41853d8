//! End-to-end tests for the webhook router.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use webhook_gate::config::DEFAULT_SIGNATURE_HEADER;
use webhook_gate::web::WEBHOOK_PATH;
use webhook_gate::{router, sign, AppState, Config, SigningSecret};

const SECRET: &str = "topsecret";
const BODY: &str = r#"{"event":"contract.signed"}"#;

fn app_with_secret(secret: &str) -> Router {
    let config = Config {
        signing_secret: SigningSecret::new(secret),
        ..Config::default()
    };
    router(AppState::new(config, None))
}

fn webhook_request(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header(DEFAULT_SIGNATURE_HEADER, sig);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app_with_secret(SECRET)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_valid_signature_is_accepted() {
    let signature = sign("POST", BODY.as_bytes(), SECRET);

    let response = app_with_secret(SECRET)
        .oneshot(webhook_request(BODY, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "accepted");
    assert_eq!(json["event_type"], "contract.signed");
}

#[tokio::test]
async fn test_raw_body_whitespace_is_preserved() {
    // Signed over odd formatting; any re-serialization would break it.
    let body = "{\n  \"event\" :   \"contract.signed\",\"amount\": 1.50\n}";
    let signature = sign("POST", body.as_bytes(), SECRET);

    let response = app_with_secret(SECRET)
        .oneshot(webhook_request(body, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_missing_signature_is_unauthorized() {
    let response = app_with_secret(SECRET)
        .oneshot(webhook_request(BODY, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "unauthorized");
    assert_eq!(json["error"], "missing signature header");
}

#[tokio::test]
async fn test_tampered_signature_is_unauthorized() {
    let mut signature = sign("POST", BODY.as_bytes(), SECRET);
    let last = signature.pop().unwrap();
    signature.push(if last == 'a' { 'b' } else { 'a' });

    let response = app_with_secret(SECRET)
        .oneshot(webhook_request(BODY, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"], "signature mismatch");
}

#[tokio::test]
async fn test_tampered_body_is_unauthorized() {
    let signature = sign("POST", BODY.as_bytes(), SECRET);

    let response = app_with_secret(SECRET)
        .oneshot(webhook_request(
            r#"{"event":"contract.terminated"}"#,
            Some(&signature),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_secret_is_server_error() {
    let signature = sign("POST", BODY.as_bytes(), SECRET);

    let response = app_with_secret("")
        .oneshot(webhook_request(BODY, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["status"], "misconfigured");
    assert_eq!(json["error"], "signing secret not configured");
}

#[tokio::test]
async fn test_rejection_body_never_echoes_signature() {
    let signature = sign("POST", BODY.as_bytes(), "wrong-secret");

    let response = app_with_secret(SECRET)
        .oneshot(webhook_request(BODY, Some(&signature)))
        .await
        .unwrap();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains(&signature));
    assert!(!text.contains(SECRET));
}

#[tokio::test]
async fn test_signed_non_json_body_is_bad_request() {
    let body = "event=contract.signed";
    let signature = sign("POST", body.as_bytes(), SECRET);

    let response = app_with_secret(SECRET)
        .oneshot(webhook_request(body, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["status"], "invalid_payload");
}

#[tokio::test]
async fn test_custom_signature_header() {
    let config = Config {
        signing_secret: SigningSecret::new(SECRET),
        signature_header: "x-platform-signature".to_string(),
        ..Config::default()
    };
    let app = router(AppState::new(config, None));
    let signature = sign("POST", BODY.as_bytes(), SECRET);

    let request = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header("X-Platform-Signature", signature.as_str())
        .body(Body::from(BODY))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let config = Config {
        signing_secret: SigningSecret::new(SECRET),
        max_body_bytes: 16,
        ..Config::default()
    };
    let app = router(AppState::new(config, None));
    let body = format!(r#"{{"event":"{}"}}"#, "x".repeat(64));
    let signature = sign("POST", body.as_bytes(), SECRET);

    let response = app
        .oneshot(webhook_request(&body, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_get_on_webhook_path_not_allowed() {
    let response = app_with_secret(SECRET)
        .oneshot(Request::get(WEBHOOK_PATH).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
