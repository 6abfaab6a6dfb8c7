//! Scenario failures

use notes_harness_clients::ClientError;
use notes_harness_core::models::FullMessage;
use notes_harness_core::queue::QueueError;
use notes_harness_token::TokenError;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Why a scenario did not pass.
///
/// Transport problems, service answers that differ from the expectation,
/// records that fail to parse, and queue outcomes each get their own variant
/// so a failing case says which kind of thing went wrong.
#[derive(Debug, Error)]
pub enum ScenarioFailure {
    /// The request never produced a response
    #[error("Transport failure: {0}")]
    Transport(#[from] ClientError),

    /// The broker could not be asked
    #[error("Queue failure: {0}")]
    Queue(#[from] QueueError),

    /// A token fixture could not be built
    #[error("Token fixture failure: {0}")]
    Token(#[from] TokenError),

    /// The runner lacks something the case needs
    #[error("Scenario setup failed: {0}")]
    Setup(String),

    /// Unexpected HTTP status
    #[error("Expected status {expected}, got {actual}: {body}")]
    StatusMismatch {
        /// Expected status code
        expected: u16,
        /// Actual status code
        actual: u16,
        /// Response body, for the report
        body: String,
    },

    /// The service reported a different error message
    #[error("Expected error message '{expected}', got '{actual}'")]
    ErrorMessageMismatch {
        /// Expected message
        expected: String,
        /// Actual message
        actual: String,
    },

    /// The response body differs from the expected one
    #[error("Expected body {expected}, got {actual}")]
    BodyMismatch {
        /// Expected body
        expected: Value,
        /// Actual body
        actual: Value,
    },

    /// The response body lacks required keys
    #[error("Response is missing keys {missing:?}")]
    MissingKeys {
        /// Keys not present in the body
        missing: Vec<String>,
    },

    /// The response body is empty
    #[error("Response body is empty")]
    EmptyBody,

    /// A response or message did not parse into its record
    #[error("{record} failed validation: {reason}")]
    Schema {
        /// Record being parsed
        record: &'static str,
        /// Parser diagnostic
        reason: String,
    },

    /// The queue had no message where one was expected
    #[error("No message on queue '{queue}'")]
    NoMessage {
        /// Queue that was read
        queue: String,
    },

    /// A rejected request still produced a message
    #[error("Unexpected message on queue '{queue}': {payload}")]
    UnexpectedMessage {
        /// Queue that was read
        queue: String,
        /// The message, as text
        payload: String,
    },

    /// The queued message differs from the submitted note
    #[error("Queued message differs: expected {expected:?}, got {actual:?}")]
    MessageMismatch {
        /// Message built from the request
        expected: Box<FullMessage>,
        /// Message taken from the queue
        actual: Box<FullMessage>,
    },

    /// The queued message has no `created` timestamp
    #[error("Message created timestamp is missing")]
    MissingTimestamp,

    /// `created` is too far from now
    #[error("Time difference {difference:?} exceeds allowed {tolerance:?}")]
    ClockSkew {
        /// Absolute difference between `created` and now
        difference: Duration,
        /// Allowed difference
        tolerance: Duration,
    },
}

impl ScenarioFailure {
    /// Schema failure for `record` from a client parse error.
    pub(crate) fn schema(record: &'static str, error: &ClientError) -> Self {
        Self::Schema {
            record,
            reason: error.to_string(),
        }
    }
}
