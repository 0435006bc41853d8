//! Configuration module for environment variable parsing.
//!
//! The configuration is read once at process start and handed to the web
//! layer by reference inside [`crate::web::AppState`]; nothing reads the
//! environment after that.

use std::env;
use std::fmt;
use std::str::FromStr;

use axum::http::HeaderName;
use tracing::warn;

/// Default header carrying the platform's hex signature.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-deel-signature";

/// Default queue for verified events.
pub const DEFAULT_QUEUE: &str = "payroll_webhooks";

/// Shared secret used to check webhook signatures.
///
/// The value is used byte-exact as the HMAC key; surrounding whitespace is
/// part of the key. `Debug` is redacted so the value cannot leak through a logged config.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(String);

impl SigningSecret {
    /// Wrap a secret, treating blank values as "not configured".
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Secret shared with the payroll platform for HMAC signatures
    pub signing_secret: Option<SigningSecret>,

    /// Request header holding the signature
    pub signature_header: String,

    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,

    /// RabbitMQ connection URL; verified events are only logged without it
    pub cloudamqp_url: Option<String>,

    /// Queue receiving verified events
    pub queue_name: String,

    /// Upper bound on opening a broker connection, in milliseconds
    pub broker_connect_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            signing_secret: None,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            max_body_bytes: 1024 * 1024,
            cloudamqp_url: None,
            queue_name: DEFAULT_QUEUE.to_string(),
            broker_connect_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_or("PORT", defaults.port),

            signing_secret: signing_secret_from_env("WEBHOOK_SIGNING_SECRET"),

            signature_header: header_name_or("WEBHOOK_SIGNATURE_HEADER", DEFAULT_SIGNATURE_HEADER),

            max_body_bytes: parse_or("WEBHOOK_MAX_BODY_BYTES", defaults.max_body_bytes),

            cloudamqp_url: non_blank("CLOUDAMQP_URL"),

            queue_name: non_blank("WEBHOOK_QUEUE").unwrap_or(defaults.queue_name),

            broker_connect_timeout_ms: parse_or(
                "BROKER_CONNECT_TIMEOUT_MS",
                defaults.broker_connect_timeout_ms,
            ),
        }
    }

    /// Secret as a plain string slice, for handing to the verifier.
    pub fn secret(&self) -> Option<&str> {
        self.signing_secret.as_ref().map(SigningSecret::expose)
    }
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Read the signing secret, warning when it carries surrounding whitespace.
///
/// A trailing newline from a mounted secret file would otherwise show up
/// only as every delivery failing with a signature mismatch.
fn signing_secret_from_env(name: &str) -> Option<SigningSecret> {
    let secret = SigningSecret::new(env::var(name).ok()?)?;

    if secret.expose().trim() != secret.expose() {
        warn!(
            env_var = name,
            length = secret.expose().len(),
            "signing_secret_has_surrounding_whitespace"
        );
    }

    Some(secret)
}

/// Read a header name, falling back to `default` when unset or not a valid name.
fn header_name_or(name: &str, default: &str) -> String {
    let raw = match non_blank(name) {
        Some(v) => v,
        None => return default.to_string(),
    };

    match HeaderName::from_str(&raw) {
        Ok(header) => header.as_str().to_string(),
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid header name, using default");
            default.to_string()
        }
    }
}

/// Read a variable, ignoring it when empty.
fn non_blank(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
