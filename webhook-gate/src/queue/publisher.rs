//! Async RabbitMQ publisher for verified webhook events.
//!
//! The publisher is cheap to clone and shared by every request handler. It
//! opens its broker link lazily on the first publish and replaces it when
//! the channel has died. Opening a link is bounded by a timeout so an
//! unreachable broker fails deliveries quickly instead of queueing them
//! behind a stalled connect.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

use super::types::VerifiedEvent;

/// AMQP delivery mode for messages that survive a broker restart.
const PERSISTENT: u8 = 2;

/// Publishes [`VerifiedEvent`]s to one durable queue.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    queue: String,
    connect_timeout: Duration,
    link: Mutex<Option<BrokerLink>>,
}

/// An open connection and the channel publishing on it.
struct BrokerLink {
    connection: Connection,
    channel: Channel,
}

impl Publisher {
    /// Create a publisher for `queue` on the broker at `url`.
    pub fn new(url: String, queue: String, connect_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                queue,
                connect_timeout,
                link: Mutex::new(None),
            }),
        }
    }

    /// Name of the queue events are published to.
    pub fn queue(&self) -> &str {
        &self.inner.queue
    }

    /// Channel of the current link, opening a new link if there is none or
    /// the old one dropped.
    async fn channel(&self) -> Result<Channel> {
        let mut link = self.inner.link.lock().await;

        if let Some(current) = link.as_ref() {
            if current.channel.status().connected() {
                return Ok(current.channel.clone());
            }
            warn!(queue = %self.inner.queue, "rabbitmq_link_lost");
        }

        let fresh = timeout(self.inner.connect_timeout, self.open_link())
            .await
            .with_context(|| {
                format!(
                    "Timed out after {}ms connecting to RabbitMQ",
                    self.inner.connect_timeout.as_millis()
                )
            })??;

        let channel = fresh.channel.clone();
        *link = Some(fresh);

        Ok(channel)
    }

    async fn open_link(&self) -> Result<BrokerLink> {
        info!(queue = %self.inner.queue, "rabbitmq_link_opening");

        let connection = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        let channel = connection
            .create_channel()
            .await
            .context("Failed to create channel")?;

        channel
            .queue_declare(
                &self.inner.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("Failed to declare webhook queue")?;

        info!(queue = %self.inner.queue, "rabbitmq_link_open");

        Ok(BrokerLink {
            connection,
            channel,
        })
    }

    /// Publish a verified event and wait for the broker's confirmation.
    pub async fn publish(&self, event: &VerifiedEvent) -> Result<()> {
        let channel = self.channel().await?;

        let body = serde_json::to_vec(event).context("Failed to serialize event")?;
        let message_id = event.message_id();

        let mut properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("application/json".into())
            .with_message_id(message_id.clone().into())
            .with_timestamp(event.received_at);
        if let Some(event_type) = &event.event_type {
            properties = properties.with_kind(event_type.clone().into());
        }

        channel
            .basic_publish(
                "",
                &self.inner.queue,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await
            .context("Failed to publish verified event")?
            .await
            .context("Broker did not confirm verified event")?;

        info!(
            queue = %self.inner.queue,
            message_id = %message_id,
            event_type = ?event.event_type,
            body_length = body.len(),
            "rabbitmq_event_published"
        );

        Ok(())
    }

    /// Close the broker link, if one is open.
    pub async fn close(&self) {
        let Some(link) = self.inner.link.lock().await.take() else {
            return;
        };

        if let Err(e) = link.channel.close(200, "Normal shutdown").await {
            warn!(error = %e, "rabbitmq_channel_close_error");
        }
        if let Err(e) = link.connection.close(200, "Normal shutdown").await {
            warn!(error = %e, "rabbitmq_connection_close_error");
        }

        info!(queue = %self.inner.queue, "rabbitmq_link_closed");
    }
}
