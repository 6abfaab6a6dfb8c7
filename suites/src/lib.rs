//! # Notes Harness Suites
//!
//! Data-driven integration scenarios for the notes webserver and the auth
//! service.
//!
//! - [`cases`]: the filter-notes and create-note case tables
//! - [`runner`]: executes a case and reports the first failure
//! - [`checks`]: status, key, and timestamp assertions
//!
//! The live suites under `tests/` run the tables against deployed services
//! and are ignored by default.
//!
//! ## Example
//!
//! ```no_run
//! use notes_harness_core::clock::SystemClock;
//! use notes_harness_core::config::HarnessConfig;
//! use notes_harness_suites::{ScenarioRunner, Service, filter_notes_cases};
//! use notes_harness_testing::InMemoryQueue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::load()?;
//! let runner = ScenarioRunner::new(&config, InMemoryQueue::new(), SystemClock)?;
//!
//! runner.check_health(Service::AuthService).await?;
//! for case in filter_notes_cases() {
//!     runner.run_filter_notes(&case).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cases;
pub mod checks;
pub mod error;
pub mod runner;

pub use cases::{
    CreateNoteCase, FilterNotesCase, TokenFields, create_note_cases, filter_notes_cases,
};
pub use checks::{assert_response_contains, assert_status, check_time_difference, created_at};
pub use error::ScenarioFailure;
pub use runner::{CreateNoteOutcome, ScenarioRunner, Service};
