//! # Notes Harness Clients
//!
//! HTTP clients for the two services under test.
//!
//! Both clients share one [`RequestExecutor`] design: a `reqwest::Client`
//! per service built from its [`ServiceConfig`](notes_harness_core::config::ServiceConfig),
//! JSON default headers, a per-request timeout, and retries for 429/5xx
//! responses and refused connections. Any response that survives the
//! retries, including 4xx and 5xx, is handed back as an [`ApiResponse`] so
//! test cases can assert on status and body.
//!
//! ## Example
//!
//! ```no_run
//! use notes_harness_clients::AuthServiceClient;
//! use notes_harness_core::config::ServiceConfig;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), notes_harness_clients::ClientError> {
//! let client = AuthServiceClient::new(&ServiceConfig::auth_service_default())?;
//! let body = json!({ "note_ids": [1, 2, 3], "space_id": 1 });
//! let response = client.filter_notes(Some("token"), Some(&body)).await?;
//! println!("{} {}", response.status(), response.text());
//! # Ok(())
//! # }
//! ```

pub mod auth_service;
pub mod error;
pub mod executor;
pub mod response;
pub mod webserver;

pub use auth_service::AuthServiceClient;
pub use error::ClientError;
pub use executor::{RequestExecutor, RETRYABLE_STATUSES};
pub use response::ApiResponse;
pub use webserver::WebServerClient;
