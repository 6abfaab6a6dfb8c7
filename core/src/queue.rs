//! Message-queue seam.
//!
//! The webserver hands created notes to a broker queue. The harness observes
//! that side effect destructively: it fetches at most one pending message and
//! acknowledges it immediately, with no consumer loop and no redelivery.
//!
//! # Implementations
//!
//! - `RabbitMq` in `notes-harness-rabbitmq` - the real broker (AMQP 0-9-1)
//! - `InMemoryQueue` in `notes-harness-testing` - for offline tests
//!
//! Tests that read from a shared queue must not run concurrently with each
//! other, otherwise one test may take the message another is waiting for.

use std::future::Future;
use thiserror::Error;

/// Errors that can occur while talking to the broker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The connection to the broker could not be established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A channel could not be opened on an established connection
    #[error("Channel failed: {0}")]
    ChannelFailed(String),

    /// The named queue or exchange does not exist on the broker
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// Fetching a message from a queue failed
    #[error("Fetch failed for queue '{queue}': {reason}")]
    FetchFailed {
        /// The queue that was read
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// Closing a channel or connection failed
    #[error("Close failed: {0}")]
    CloseFailed(String),
}

/// Non-blocking, destructive access to a named queue.
///
/// # Contract
///
/// - `Ok(Some(payload))`: one message was taken off the queue and acknowledged
/// - `Ok(None)`: the queue was empty; this is an outcome, not an error
/// - `Err(..)`: the broker could not be asked
pub trait MessageQueue: Send + Sync {
    /// Fetch at most one message from `queue`, acknowledging it immediately.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if the queue lookup or the fetch fails.
    fn fetch_one(
        &self,
        queue: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, QueueError>> + Send;
}
