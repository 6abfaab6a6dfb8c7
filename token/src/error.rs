//! Error types for token construction

use thiserror::Error;

/// Errors that can occur while building a token
#[derive(Debug, Error)]
pub enum TokenError {
    /// The service configuration carries no signing secret
    #[error("No signing secret configured for the auth service")]
    MissingSecret,

    /// The claims could not be serialized
    #[error("Failed to serialize claims: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HMAC signing failed
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}
