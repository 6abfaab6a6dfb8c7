//! # Notes Harness Token
//!
//! Bearer token fixtures for the auth service.
//!
//! Tokens are compact HS256 JWTs built from whichever claims a test case
//! supplies. The auth service distinguishes an absent claim from a present
//! but empty one, so a claim that is not set is left out of the payload
//! entirely rather than serialized as `null`.
//!
//! This crate only encodes; it never verifies.
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use notes_harness_token::{TokenClaims, TokenFactory};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = TokenFactory::new("test-secret");
//! let claims = TokenClaims::new()
//!     .user_id(1)
//!     .expires_in(3600, Utc::now());
//!
//! let token = factory.issue(&claims)?;
//! assert_eq!(token.split('.').count(), 3);
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod error;
pub mod factory;

pub use claims::{Expiry, TokenClaims};
pub use error::TokenError;
pub use factory::{TokenFactory, JWT_HEADER};
