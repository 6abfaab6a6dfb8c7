//! Create-note cases for the webserver

use notes_harness_core::models::Note;
use notes_harness_testing::{generate_long_string, generate_test_string};
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::{Uuid, uuid};

/// Owner of the fixture space
pub const USER_ID: i64 = 123_456_789;

/// A user id that does not exist
pub const UNKNOWN_USER_ID: i64 = 123;

/// Space owned by [`USER_ID`]
pub const VALID_SPACE_ID: Uuid = uuid!("869dc163-62aa-4889-9019-07f9c764ce38");

/// Existing space not owned by [`USER_ID`]
pub const INVALID_SPACE_ID: Uuid = uuid!("6eabae90-5724-4445-84d8-510774bdee03");

/// Length of the generated long texts
pub const RANDOM_STRING_LENGTH: usize = 100_000;

/// One request to `create_note` and its expected outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateNoteCase {
    /// Case identifier
    pub name: &'static str,
    /// Request body; `None` sends an empty body
    pub body: Option<Value>,
    /// Expected status
    pub expected_status: StatusCode,
    /// Expected body of a rejection, compared in full
    pub expected_response: Option<Value>,
    /// Note expected on the queue after a `202`
    pub expected_message: Option<Note>,
}

impl CreateNoteCase {
    fn accepted(name: &'static str, note: Note) -> Self {
        Self {
            name,
            body: Some(note_body(&note)),
            expected_status: StatusCode::ACCEPTED,
            expected_response: None,
            expected_message: Some(note),
        }
    }

    fn rejected(name: &'static str, body: Option<Value>, error: &str) -> Self {
        Self {
            name,
            body,
            expected_status: StatusCode::BAD_REQUEST,
            expected_response: Some(json!({ "error": error })),
            expected_message: None,
        }
    }
}

fn note_body(note: &Note) -> Value {
    json!({
        "user_id": note.user_id,
        "text": note.text,
        "space_id": note.space_id,
        "type": note.note_type,
    })
}

/// Every create-note case.
///
/// The "space does not exist" case uses a fresh random space id on each call.
#[must_use]
pub fn create_note_cases() -> Vec<CreateNoteCase> {
    vec![
        CreateNoteCase::accepted(
            "create text note success",
            Note::text(USER_ID, "Test Note1", VALID_SPACE_ID),
        ),
        CreateNoteCase::rejected(
            "space not belongs to user",
            Some(json!({
                "user_id": USER_ID,
                "text": "Test Note2",
                "space_id": INVALID_SPACE_ID,
                "type": "text",
            })),
            "space not belongs to user",
        ),
        CreateNoteCase::rejected(
            "space does not exist",
            Some(json!({
                "user_id": USER_ID,
                "text": "Test Note3",
                "space_id": Uuid::new_v4(),
                "type": "text",
            })),
            "space does not exist",
        ),
        CreateNoteCase::rejected(
            "type is required",
            Some(json!({
                "user_id": USER_ID,
                "text": "Test Note4",
                "space_id": VALID_SPACE_ID,
            })),
            "field `type` not filled",
        ),
        CreateNoteCase::rejected(
            "field user_id is required",
            Some(json!({
                "text": "Test Note5",
                "space_id": VALID_SPACE_ID,
                "type": "text",
            })),
            "unknown user",
        ),
        CreateNoteCase::rejected(
            "unknown user",
            Some(json!({
                "user_id": UNKNOWN_USER_ID,
                "text": "Test Note6",
                "space_id": VALID_SPACE_ID,
                "type": "text",
            })),
            "unknown user",
        ),
        CreateNoteCase::rejected(
            "space not filled",
            Some(json!({
                "user_id": USER_ID,
                "text": "Test Note7",
                "type": "text",
            })),
            "space does not exist",
        ),
        CreateNoteCase::rejected(
            "text not filled",
            Some(json!({
                "user_id": USER_ID,
                "space_id": VALID_SPACE_ID,
                "type": "text",
            })),
            "field `text` not filled",
        ),
        CreateNoteCase::rejected(
            "invalid UUID",
            Some(json!({
                "user_id": USER_ID,
                "text": "Test Note8",
                "space_id": "1234",
                "type": "text",
            })),
            "invalid UUID length: 4",
        ),
        CreateNoteCase::rejected(
            "invalid type of field user_id",
            Some(json!({
                "user_id": "1234",
                "text": "Test Note9",
                "space_id": VALID_SPACE_ID,
                "type": "text",
            })),
            "json: cannot unmarshal string into Go struct field CreateNoteRequest.user_id of type int64",
        ),
        CreateNoteCase::rejected(
            "invalid type of field text",
            Some(json!({
                "user_id": USER_ID,
                "text": 123_456,
                "space_id": VALID_SPACE_ID,
                "type": "text",
            })),
            "json: cannot unmarshal number into Go struct field CreateNoteRequest.text of type string",
        ),
        CreateNoteCase::rejected(
            "invalid type of field type",
            Some(json!({
                "user_id": USER_ID,
                "text": "Test Note10",
                "space_id": VALID_SPACE_ID,
                "type": 123_456,
            })),
            "json: cannot unmarshal number into Go struct field CreateNoteRequest.type of type model.NoteType",
        ),
        CreateNoteCase::rejected("empty JSON", None, "unexpected end of JSON input"),
        CreateNoteCase::accepted(
            "very long text",
            Note::text(
                USER_ID,
                generate_long_string(RANDOM_STRING_LENGTH, 'a'),
                VALID_SPACE_ID,
            ),
        ),
        CreateNoteCase::accepted(
            "very long text with different characters",
            Note::text(
                USER_ID,
                generate_test_string(RANDOM_STRING_LENGTH),
                VALID_SPACE_ID,
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_fifteen_uniquely_named_cases() {
        let cases = create_note_cases();
        assert_eq!(cases.len(), 15);
        let names: HashSet<_> = cases.iter().map(|case| case.name).collect();
        assert_eq!(names.len(), cases.len());
    }

    #[test]
    fn accepted_cases_expect_the_submitted_note() {
        for case in create_note_cases() {
            match &case.expected_message {
                Some(note) => {
                    assert_eq!(case.expected_status, StatusCode::ACCEPTED);
                    assert_eq!(case.body.as_ref(), Some(&note_body(note)));
                    assert!(case.expected_response.is_none());
                }
                None => {
                    assert_eq!(case.expected_status, StatusCode::BAD_REQUEST);
                    assert!(case.expected_response.is_some(), "{}", case.name);
                }
            }
        }
    }

    #[test]
    fn long_texts_have_requested_length() {
        let cases = create_note_cases();
        let long: Vec<_> = cases
            .iter()
            .filter_map(|case| case.expected_message.as_ref())
            .filter(|note| note.text.len() == RANDOM_STRING_LENGTH)
            .collect();
        assert_eq!(long.len(), 2);
        assert!(
            long[1]
                .text
                .starts_with("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZabc")
        );
    }

    #[test]
    fn unknown_space_is_fresh_each_time() {
        let space = |cases: Vec<CreateNoteCase>| cases[2].body.clone().unwrap()["space_id"].clone();
        assert_ne!(space(create_note_cases()), space(create_note_cases()));
    }

    #[test]
    fn success_body_matches_wire_shape() {
        let cases = create_note_cases();
        assert_eq!(
            cases[0].body,
            Some(json!({
                "user_id": 123_456_789,
                "text": "Test Note1",
                "space_id": "869dc163-62aa-4889-9019-07f9c764ce38",
                "type": "text",
            }))
        );
    }
}
