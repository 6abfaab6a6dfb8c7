//! # Notes Harness Core
//!
//! Shared building blocks for the notes integration harness.
//!
//! The harness drives two external services (the webserver note API and the
//! auth service) and observes the RabbitMQ queue the webserver publishes to.
//! Nothing here serves traffic: every type in this crate describes how the
//! harness reaches the systems under test, or what it expects back from them.
//!
//! ## Modules
//!
//! - [`config`]: Immutable, explicitly constructed settings (YAML + environment)
//! - [`models`]: Schema records parsed from HTTP responses and queued messages
//! - [`retry`]: Backoff policy shared by the HTTP executor and the broker connection
//! - [`clock`]: Time seam used for timestamp tolerance checks
//! - [`queue`]: The "fetch at most one message" seam implemented by broker accessors
//!
//! ## Example
//!
//! ```no_run
//! use notes_harness_core::config::HarnessConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::load()?;
//! println!("webserver: {}", config.webserver.base_url);
//! println!("notes queue: {}", config.rabbitmq.notes_queue);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod models;
pub mod queue;
pub mod retry;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use config::{BrokerConfig, ConfigError, HarnessConfig, ScenarioConfig, ServiceConfig};
pub use models::{ErrorBody, FilterNotesResponse, FullMessage, Note, NotePermissions, RequestId};
pub use queue::{MessageQueue, QueueError};
pub use retry::RetryPolicy;
