//! Schema records exchanged with the services under test.
//!
//! Parsing into these records is the harness's structural validation: a
//! missing field, a wrong JSON type, or a space/request id that is not a
//! version 4 UUID is a hard failure, never silently ignored.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Operation recorded on messages produced by note creation.
pub const CREATE_OPERATION: &str = "create";

/// Note type used for plain text notes.
pub const TEXT_NOTE_TYPE: &str = "text";

/// A note-creation request as accepted by the webserver.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Owner of the note
    pub user_id: i64,
    /// Note body
    pub text: String,
    /// Space the note is created in
    #[serde(deserialize_with = "uuid_v4")]
    pub space_id: Uuid,
    /// Note type (e.g. `"text"`)
    #[serde(rename = "type")]
    pub note_type: String,
}

impl Note {
    /// Create a plain text note.
    #[must_use]
    pub fn text(user_id: i64, text: impl Into<String>, space_id: Uuid) -> Self {
        Self {
            user_id,
            text: text.into(),
            space_id,
            note_type: TEXT_NOTE_TYPE.to_string(),
        }
    }
}

/// Body of a `202 Accepted` note-creation response.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestId {
    /// Identifier assigned to the asynchronous request
    #[serde(deserialize_with = "uuid_v4")]
    pub request_id: Uuid,
}

/// The message the webserver publishes to the notes queue once a note
/// creation request has been processed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FullMessage {
    /// The submitted note fields
    #[serde(flatten)]
    pub note: Note,
    /// Identifier returned by the HTTP call
    #[serde(deserialize_with = "uuid_v4")]
    pub request_id: Uuid,
    /// Operation performed (e.g. `"create"`)
    pub operation: String,
    /// Attached file reference, empty for text notes
    #[serde(rename = "file")]
    pub file_field: String,
    /// Server-assigned creation time, epoch seconds
    #[serde(default)]
    pub created: Option<i64>,
}

impl FullMessage {
    /// The message expected on the queue after `note` was accepted under `request_id`.
    #[must_use]
    pub fn expected(note: Note, request_id: Uuid) -> Self {
        Self {
            note,
            request_id,
            operation: CREATE_OPERATION.to_string(),
            file_field: String::new(),
            created: None,
        }
    }

    /// Compare two messages, ignoring the server-assigned `created` timestamp.
    #[must_use]
    pub fn matches_ignoring_created(&self, other: &Self) -> bool {
        self.note == other.note
            && self.request_id == other.request_id
            && self.operation == other.operation
            && self.file_field == other.file_field
    }
}

/// Read/edit permissions of the caller on one note.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotePermissions {
    /// Caller may read the note
    pub can_read: bool,
    /// Caller may edit the note
    pub can_edit: bool,
}

/// Body of a successful filter-notes response.
///
/// Only notes that exist are present; unknown identifiers are dropped.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterNotesResponse {
    /// Permissions keyed by note identifier (as a decimal string)
    pub notes: BTreeMap<String, NotePermissions>,
}

impl FilterNotesResponse {
    /// Note identifiers present in the response.
    ///
    /// Keys that are not integers are skipped.
    #[must_use]
    pub fn note_ids(&self) -> BTreeSet<i64> {
        self.notes.keys().filter_map(|key| key.parse().ok()).collect()
    }
}

/// Body of a `4xx` response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Diagnostic message
    pub error: String,
}

fn uuid_v4<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Uuid::deserialize(deserializer)?;
    match id.get_version_num() {
        4 => Ok(id),
        other => Err(D::Error::custom(format!(
            "expected a version 4 UUID, got version {other}"
        ))),
    }
}
