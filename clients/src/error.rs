//! Error types for the HTTP clients

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to a service under test.
///
/// A response with a 4xx or 5xx status is not an error here. The harness
/// asserts on those, so they come back as an ordinary `ApiResponse`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service configuration cannot produce a working client
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The request could not be sent or no response arrived
    #[error("Request to {url} failed: {reason}")]
    RequestFailed {
        /// Target URL
        url: String,
        /// The reason for failure
        reason: String,
    },

    /// No complete response within the configured timeout
    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout {
        /// Target URL
        url: String,
        /// The configured timeout
        timeout: Duration,
    },

    /// The response body could not be read
    #[error("Failed to read response body: {0}")]
    BodyRead(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// The service never reported healthy
    #[error("Service at {url} not healthy after {attempts} attempts")]
    ServiceUnavailable {
        /// Health endpoint URL
        url: String,
        /// Number of polls made
        attempts: usize,
    },
}
