//! Payroll Webhook Gate - webhook receiver binary.
//!
//! This binary:
//! - Receives webhooks from the payroll platform
//! - Verifies their HMAC signature over the raw body
//! - Publishes trusted events to RabbitMQ (when configured)

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use webhook_gate::{router, AppState, Config, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    let config = Config::from_env();
    info!(
        port = config.port,
        signing_secret_configured = config.signing_secret.is_some(),
        signature_header = %config.signature_header,
        max_body_bytes = config.max_body_bytes,
        broker_configured = config.cloudamqp_url.is_some(),
        queue = %config.queue_name,
        broker_connect_timeout_ms = config.broker_connect_timeout_ms,
        "config_loaded"
    );

    if config.signing_secret.is_none() {
        // Keep serving so the fault is visible per request instead of as a crash loop.
        error!("signing_secret_missing_all_webhooks_will_be_rejected");
    }

    let publisher = match &config.cloudamqp_url {
        Some(url) => {
            let publisher = Publisher::new(
                url.clone(),
                config.queue_name.clone(),
                Duration::from_millis(config.broker_connect_timeout_ms),
            );
            info!(queue = %publisher.queue(), "rabbitmq_publisher_created");
            Some(publisher)
        }
        None => {
            warn!("rabbitmq_not_configured_events_will_only_be_logged");
            None
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, publisher.clone()));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(publisher) = publisher {
        publisher.close().await;
    }

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
