//! Token encoding and signing

use crate::claims::TokenClaims;
use crate::error::TokenError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey};
use notes_harness_core::config::ServiceConfig;

/// Fixed JOSE header of every token.
pub const JWT_HEADER: &[u8] = br#"{"alg":"HS256","typ":"JWT"}"#;

/// Builds signed `header.payload.signature` tokens.
///
/// Signing input is `base64url(header) + "." + base64url(payload)`; the
/// signature is HMAC-SHA256 of it under the secret. All three segments are
/// base64url without padding.
#[derive(Clone)]
pub struct TokenFactory {
    key: EncodingKey,
}

impl TokenFactory {
    /// Create a factory signing with `secret`.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_ref()),
        }
    }

    /// Create a factory from the auth service configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::MissingSecret`] if no `secret_key` is configured
    pub fn from_config(config: &ServiceConfig) -> Result<Self, TokenError> {
        config
            .secret_key
            .as_deref()
            .map(Self::new)
            .ok_or(TokenError::MissingSecret)
    }

    /// Encode and sign `claims`.
    ///
    /// # Errors
    ///
    /// Returns error if the claims cannot be serialized or signing fails
    pub fn issue(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let header = URL_SAFE_NO_PAD.encode(JWT_HEADER);
        let payload = URL_SAFE_NO_PAD.encode(claims.payload_json()?);
        let signing_input = format!("{header}.{payload}");
        let signature = jsonwebtoken::crypto::sign(
            signing_input.as_bytes(),
            &self.key,
            Algorithm::HS256,
        )?;

        tracing::trace!(
            user_id = ?claims.user_id,
            exp = ?claims.exp.map(|exp| exp.epoch_seconds()),
            "Issued token fixture"
        );

        Ok(format!("{signing_input}.{signature}"))
    }
}

impl std::fmt::Debug for TokenFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenFactory").finish_non_exhaustive()
    }
}
