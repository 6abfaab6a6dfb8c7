//! Filter-notes cases for the auth service

use chrono::{DateTime, Duration, Utc};
use notes_harness_token::TokenClaims;
use reqwest::StatusCode;
use serde_json::{Map, Value, json};

/// One hour, in seconds
pub const ONE_HOUR_SECONDS: i64 = 3600;

/// Upper bound (exclusive) of the generated id lists
pub const MAX_NOTE_ID: i64 = 1000;

/// A user that belongs to no space in the fixture data
pub const NON_MEMBER_USER_ID: i64 = 10_000_000;

/// Ids 4..1000: none of them exist in space 1.
#[must_use]
pub fn big_list_without_existing_notes() -> Vec<i64> {
    (4..MAX_NOTE_ID).collect()
}

/// Ids 4..1000 followed by the existing ids 1, 2, 3.
#[must_use]
pub fn big_list_with_existing_notes() -> Vec<i64> {
    let mut ids = big_list_without_existing_notes();
    ids.extend([1, 2, 3]);
    ids
}

/// What goes into the token of a case.
///
/// `exp_offset` is relative to the moment the case runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenFields {
    /// `user_id` claim
    pub user_id: Option<i64>,
    /// Seconds from now until expiry (negative: already expired)
    pub exp_offset: Option<i64>,
}

impl TokenFields {
    /// Token for `user_id`, valid for an hour.
    #[must_use]
    pub const fn valid_for(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            exp_offset: Some(ONE_HOUR_SECONDS),
        }
    }

    /// Claims for these fields at `now`.
    #[must_use]
    pub fn claims(&self, now: DateTime<Utc>) -> TokenClaims {
        TokenClaims {
            user_id: self.user_id,
            exp: self
                .exp_offset
                .map(|offset| (now + Duration::seconds(offset)).timestamp().into()),
        }
    }
}

/// One request to `filter_notes` and its expected outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterNotesCase {
    /// Case identifier
    pub name: &'static str,
    /// Token to send; `None` sends no `Authorization` header
    pub token_fields: Option<TokenFields>,
    /// Request body; `None` sends an empty body
    pub body: Option<Value>,
    /// Expected status
    pub expected_status: StatusCode,
    /// Expected body, compared in full
    pub expected_response: Option<Value>,
    /// Expected `error` field
    pub expected_error: Option<&'static str>,
}

impl FilterNotesCase {
    fn rejected(
        name: &'static str,
        token_fields: Option<TokenFields>,
        body: Option<Value>,
        status: StatusCode,
        error: &'static str,
    ) -> Self {
        Self {
            name,
            token_fields,
            body,
            expected_status: status,
            expected_response: None,
            expected_error: Some(error),
        }
    }

    fn allowed(
        name: &'static str,
        user_id: i64,
        space_id: i64,
        note_ids: &[i64],
        visible: &[i64],
    ) -> Self {
        Self {
            name,
            token_fields: Some(TokenFields::valid_for(user_id)),
            body: Some(json!({ "note_ids": note_ids, "space_id": space_id })),
            expected_status: StatusCode::OK,
            expected_response: Some(full_access(visible)),
            expected_error: None,
        }
    }
}

/// `{"notes": {...}}` granting read and edit on each of `ids`.
#[must_use]
pub fn full_access(ids: &[i64]) -> Value {
    let notes: Map<String, Value> = ids
        .iter()
        .map(|id| (id.to_string(), json!({ "can_read": true, "can_edit": true })))
        .collect();
    json!({ "notes": notes })
}

/// Every filter-notes case.
#[must_use]
pub fn filter_notes_cases() -> Vec<FilterNotesCase> {
    let real_ids = [1, 2, 3];
    let mixed_ids = [1, 2, 3, 5, 100, 10_000, 4566, 2112, 5_343_543, 123];
    let unknown_ids = [5, 100, 10_000, 4566, 2112, 5_343_543, 123];
    let editor_ids = [4, 5, 6];

    vec![
        FilterNotesCase::rejected(
            "expired token",
            Some(TokenFields {
                user_id: Some(1),
                exp_offset: Some(-ONE_HOUR_SECONDS),
            }),
            None,
            StatusCode::UNAUTHORIZED,
            "invalid token: token has invalid claims: token is expired",
        ),
        FilterNotesCase::rejected(
            "no token",
            None,
            None,
            StatusCode::UNAUTHORIZED,
            "invalid token: no prefix Bearer",
        ),
        FilterNotesCase::rejected(
            "token without user_id",
            Some(TokenFields {
                user_id: None,
                exp_offset: Some(ONE_HOUR_SECONDS),
            }),
            None,
            StatusCode::UNAUTHORIZED,
            "invalid token: field 'user_id' not found",
        ),
        FilterNotesCase::rejected(
            "space_id < 1",
            Some(TokenFields::valid_for(1)),
            Some(json!({ "note_ids": real_ids, "space_id": -1 })),
            StatusCode::BAD_REQUEST,
            "empty space id",
        ),
        FilterNotesCase::rejected(
            "note_ids is empty",
            Some(TokenFields::valid_for(1)),
            Some(json!({ "space_id": 1 })),
            StatusCode::BAD_REQUEST,
            "empty note id list",
        ),
        FilterNotesCase::rejected(
            "user is not member",
            Some(TokenFields::valid_for(NON_MEMBER_USER_ID)),
            Some(json!({ "note_ids": real_ids, "space_id": 1 })),
            StatusCode::FORBIDDEN,
            "user is not member",
        ),
        FilterNotesCase::allowed("valid request: only real IDs", 1, 1, &real_ids, &real_ids),
        FilterNotesCase::allowed("valid request: real + not real IDs", 1, 1, &mixed_ids, &real_ids),
        FilterNotesCase::allowed("valid request: only not real IDs", 1, 1, &unknown_ids, &[]),
        FilterNotesCase::allowed(
            "valid request: generated IDs without existing notes",
            1,
            1,
            &big_list_without_existing_notes(),
            &[],
        ),
        FilterNotesCase::allowed(
            "valid request: generated IDs with existing notes",
            1,
            1,
            &big_list_with_existing_notes(),
            &real_ids,
        ),
        FilterNotesCase::allowed(
            "editor: space notes, only existing",
            2,
            2,
            &editor_ids,
            &editor_ids,
        ),
        FilterNotesCase::allowed(
            "editor: space notes, existing and generated",
            2,
            2,
            &big_list_with_existing_notes(),
            &editor_ids,
        ),
    ]
}
