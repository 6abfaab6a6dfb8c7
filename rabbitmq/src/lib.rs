//! RabbitMQ accessor for Notes Harness.
//!
//! This crate implements the [`MessageQueue`] trait from `notes-harness-core`
//! on top of lapin (AMQP 0-9-1). It exists so a test can observe what the
//! webserver put on the notes queue after accepting a request.
//!
//! # Flow
//!
//! ```text
//! ┌─────────────┐  POST create   ┌─────────────┐  publish   ┌──────────┐
//! │    Test     │ ─────────────► │  Webserver  │ ─────────► │  notes   │
//! └──────┬──────┘                └─────────────┘            │  queue   │
//!        │                                                  └────┬─────┘
//!        │                 basic.get (no-ack)                    │
//!        └◄──────────────────────────────────────────────────────┘
//! ```
//!
//! # Delivery Semantics
//!
//! **Destructive, at-most-once reads**:
//! - [`RabbitMq::fetch_one`] takes one message with `no_ack`, so the broker
//!   forgets it as soon as it is delivered
//! - An empty queue gives `Ok(None)`, never a wait
//! - Every operation runs on its own short-lived channel; a channel the
//!   broker closes (for example on a missing queue) never poisons the
//!   connection
//!
//! Tests sharing the queue must not run concurrently.
//!
//! # Example
//!
//! ```no_run
//! use notes_harness_core::config::BrokerConfig;
//! use notes_harness_core::queue::MessageQueue;
//! use notes_harness_rabbitmq::RabbitMq;
//!
//! # async fn example() -> Result<(), notes_harness_core::queue::QueueError> {
//! let config = BrokerConfig::default();
//! let message = RabbitMq::scoped(&config, |mq| async move {
//!     mq.fetch_one("notes").await
//! })
//! .await??;
//!
//! if let Some(payload) = message {
//!     println!("{}", String::from_utf8_lossy(&payload));
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use lapin::options::{
    BasicGetOptions, ExchangeDeclareOptions, QueueDeclareOptions, QueuePurgeOptions,
};
use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPQueryString, AMQPUri, AMQPUserInfo};
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use notes_harness_core::config::BrokerConfig;
use notes_harness_core::queue::{MessageQueue, QueueError};
use std::future::Future;
use std::sync::Arc;

/// AMQP reply code for a normal close.
const REPLY_SUCCESS: u16 = 200;

/// Connection to the broker.
///
/// Cloning shares the underlying connection. Use [`RabbitMq::scoped`] to
/// guarantee the connection is closed when a test is done with it.
#[derive(Clone)]
pub struct RabbitMq {
    connection: Arc<Connection>,
    config: BrokerConfig,
}

impl RabbitMq {
    /// Connect to the broker described by `config`.
    ///
    /// Connection attempts follow `config.retry_policy()`. If a notes
    /// exchange is configured, its existence is checked passively.
    ///
    /// # Errors
    ///
    /// - [`QueueError::ConnectionFailed`] if the configuration is invalid or
    ///   every attempt fails
    /// - [`QueueError::QueueNotFound`] if the configured exchange is missing
    pub async fn connect(config: &BrokerConfig) -> Result<Self, QueueError> {
        config
            .validate()
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        let policy = config.retry_policy();
        let mut attempt = 0;
        let connection = loop {
            match Connection::connect_uri(amqp_uri(config), ConnectionProperties::default()).await
            {
                Ok(connection) => break connection,
                Err(e) if attempt < policy.max_retries => {
                    let delay = policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        host = %config.host,
                        port = config.port,
                        error = %e,
                        attempt = attempt + 1,
                        ?delay,
                        "Broker connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        host = %config.host,
                        port = config.port,
                        error = %e,
                        attempts = attempt + 1,
                        "Broker connection failed"
                    );
                    return Err(QueueError::ConnectionFailed(e.to_string()));
                }
            }
        };

        tracing::info!(
            host = %config.host,
            port = config.port,
            vhost = %config.virtual_host,
            "Connected to RabbitMQ"
        );

        let mq = Self {
            connection: Arc::new(connection),
            config: config.clone(),
        };

        if let Some(exchange) = config.notes_exchange.as_deref() {
            if let Err(e) = mq.check_exchange(exchange).await {
                mq.close_quietly().await;
                return Err(e);
            }
        }

        Ok(mq)
    }

    /// Connect, run `body`, and close the connection whatever `body` returned.
    ///
    /// If `body` panics, the close is spawned on the current runtime while
    /// the panic unwinds. A failure to close is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns the [`RabbitMq::connect`] error if the connection cannot be made
    pub async fn scoped<T, F, Fut>(config: &BrokerConfig, body: F) -> Result<T, QueueError>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = T>,
    {
        let mq = Self::connect(config).await?;
        let guard = ConnectionGuard(Some(mq.clone()));
        let output = body(mq).await;
        guard.close().await;
        Ok(output)
    }

    /// Run `body` on a fresh channel and close the channel afterwards.
    ///
    /// The channel is closed on every exit path, including a panic in `body`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ChannelFailed`] if no channel can be opened,
    /// otherwise whatever `body` returns
    pub async fn with_channel<T, F, Fut>(&self, body: F) -> Result<T, QueueError>
    where
        F: FnOnce(Channel) -> Fut,
        Fut: Future<Output = Result<T, QueueError>>,
    {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| QueueError::ChannelFailed(e.to_string()))?;

        let guard = ChannelGuard(Some(channel.clone()));
        let result = body(channel).await;
        guard.close().await;

        result
    }

    /// Number of messages ready on `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::QueueNotFound`] if the queue does not exist
    pub async fn pending(&self, queue: &str) -> Result<u32, QueueError> {
        self.with_channel(|channel| async move {
            let declared = channel
                .queue_declare(
                    queue,
                    QueueDeclareOptions {
                        passive: true,
                        ..QueueDeclareOptions::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| queue_error(queue, &e))?;
            Ok(declared.message_count())
        })
        .await
    }

    /// Remove every ready message from `queue`, returning how many were removed.
    ///
    /// Used before a create-note case so a leftover message from an earlier
    /// run cannot be mistaken for the one under test.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::QueueNotFound`] if the queue does not exist
    pub async fn drain(&self, queue: &str) -> Result<u32, QueueError> {
        let purged = self
            .with_channel(|channel| async move {
                channel
                    .queue_purge(queue, QueuePurgeOptions::default())
                    .await
                    .map_err(|e| queue_error(queue, &e))
            })
            .await?;

        if purged > 0 {
            tracing::info!(queue, purged, "Drained stale messages");
        }
        Ok(purged)
    }

    /// Broker configuration this connection was made with
    #[must_use]
    pub const fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Whether the connection is still open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::CloseFailed`] if the broker rejects the close
    pub async fn close(&self) -> Result<(), QueueError> {
        if !self.is_connected() {
            return Ok(());
        }
        self.connection
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(|e| QueueError::CloseFailed(e.to_string()))?;
        tracing::debug!(host = %self.config.host, "Closed RabbitMQ connection");
        Ok(())
    }

    async fn close_quietly(&self) {
        if let Err(e) = self.close().await {
            tracing::warn!(error = %e, "Failed to close RabbitMQ connection");
        }
    }

    async fn check_exchange(&self, exchange: &str) -> Result<(), QueueError> {
        self.with_channel(|channel| async move {
            channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Direct,
                    ExchangeDeclareOptions {
                        passive: true,
                        ..ExchangeDeclareOptions::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| queue_error(exchange, &e))
        })
        .await
    }
}

/// Closes a connection that was not closed explicitly, e.g. when a scoped
/// body panics. `Drop` cannot await, so the close is spawned.
struct ConnectionGuard(Option<RabbitMq>);

impl ConnectionGuard {
    async fn close(mut self) {
        if let Some(mq) = self.0.take() {
            mq.close_quietly().await;
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let Some(mq) = self.0.take() else { return };
        if !mq.is_connected() {
            return;
        }
        tracing::warn!(host = %mq.config.host, "Closing RabbitMQ connection after unwind");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { mq.close_quietly().await });
            }
            Err(_) => tracing::warn!("No runtime to close the RabbitMQ connection on"),
        }
    }
}

/// Channel counterpart of [`ConnectionGuard`].
struct ChannelGuard(Option<Channel>);

impl ChannelGuard {
    async fn close(mut self) {
        if let Some(channel) = self.0.take() {
            close_channel(&channel).await;
        }
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        let Some(channel) = self.0.take() else { return };
        if !channel.status().connected() {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { close_channel(&channel).await });
        }
    }
}

async fn close_channel(channel: &Channel) {
    // The broker closes the channel itself after a soft error.
    if channel.status().connected() {
        if let Err(e) = channel.close(REPLY_SUCCESS, "OK").await {
            tracing::warn!(error = %e, "Failed to close channel");
        }
    }
}

impl MessageQueue for RabbitMq {
    async fn fetch_one(&self, queue: &str) -> Result<Option<Vec<u8>>, QueueError> {
        let message = self
            .with_channel(|channel| async move {
                channel
                    .basic_get(queue, BasicGetOptions { no_ack: true })
                    .await
                    .map_err(|e| queue_error(queue, &e))
            })
            .await?;

        match message {
            Some(message) => {
                tracing::debug!(
                    queue,
                    bytes = message.delivery.data.len(),
                    remaining = message.message_count,
                    "Fetched message"
                );
                Ok(Some(message.delivery.data))
            }
            None => {
                tracing::debug!(queue, "Queue is empty");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for RabbitMq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RabbitMq")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("vhost", &self.config.virtual_host)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Connection URI for `config`.
#[must_use]
pub fn amqp_uri(config: &BrokerConfig) -> AMQPUri {
    let timeout_ms = u64::try_from(config.connection_timeout().as_millis()).unwrap_or(u64::MAX);
    AMQPUri {
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            host: config.host.clone(),
            port: config.port,
        },
        vhost: config.virtual_host.clone(),
        query: AMQPQueryString {
            heartbeat: Some(config.heartbeat_secs),
            connection_timeout: Some(timeout_ms),
            ..AMQPQueryString::default()
        },
        ..AMQPUri::default()
    }
}

fn queue_error(name: &str, error: &lapin::Error) -> QueueError {
    match error {
        lapin::Error::ProtocolError(amqp)
            if matches!(amqp.kind(), AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND)) =>
        {
            QueueError::QueueNotFound(name.to_string())
        }
        other => QueueError::FetchFailed {
            queue: name.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_carries_broker_settings() {
        let config = BrokerConfig {
            host: "rabbit.internal".to_string(),
            port: 5673,
            username: "harness".to_string(),
            password: "s3cret".to_string(),
            virtual_host: "notes".to_string(),
            heartbeat_secs: 30,
            connection_timeout_secs: 7,
            ..BrokerConfig::default()
        };

        let uri = amqp_uri(&config);
        assert_eq!(uri.authority.host, "rabbit.internal");
        assert_eq!(uri.authority.port, 5673);
        assert_eq!(uri.authority.userinfo.username, "harness");
        assert_eq!(uri.authority.userinfo.password, "s3cret");
        assert_eq!(uri.vhost, "notes");
        assert_eq!(uri.query.heartbeat, Some(30));
        assert_eq!(uri.query.connection_timeout, Some(7000));
    }

    #[test]
    fn default_uri_targets_local_broker() {
        let uri = amqp_uri(&BrokerConfig::default());
        assert_eq!(uri.authority.host, "localhost");
        assert_eq!(uri.authority.port, 5672);
        assert_eq!(uri.vhost, "/");
    }

    #[test]
    fn accessor_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<RabbitMq>();
    }

    #[tokio::test]
    async fn invalid_config_fails_before_connecting() {
        let config = BrokerConfig {
            port: 0,
            ..BrokerConfig::default()
        };
        assert!(matches!(
            RabbitMq::connect(&config).await,
            Err(QueueError::ConnectionFailed(_))
        ));
    }
}
