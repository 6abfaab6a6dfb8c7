//! Case tables
//!
//! Each case is plain data: the request to make and what the service must
//! answer. The [`ScenarioRunner`](crate::runner::ScenarioRunner) executes them.

pub mod create_note;
pub mod filter_notes;

pub use create_note::{CreateNoteCase, create_note_cases};
pub use filter_notes::{FilterNotesCase, TokenFields, filter_notes_cases};
