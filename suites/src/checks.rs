//! Assertion helpers shared by the scenarios

use crate::error::ScenarioFailure;
use chrono::{DateTime, Utc};
use notes_harness_clients::ApiResponse;
use notes_harness_core::models::FullMessage;
use reqwest::StatusCode;
use std::time::Duration;

/// Fail unless `response` has status `expected`.
///
/// # Errors
///
/// Returns [`ScenarioFailure::StatusMismatch`] carrying the body text
pub fn assert_status(response: &ApiResponse, expected: StatusCode) -> Result<(), ScenarioFailure> {
    if response.status() == expected {
        return Ok(());
    }
    Err(ScenarioFailure::StatusMismatch {
        expected: expected.as_u16(),
        actual: response.status().as_u16(),
        body: response.text().into_owned(),
    })
}

/// Fail unless the JSON object in `response` has every key in `keys`.
///
/// # Errors
///
/// - [`ScenarioFailure::Schema`] if the body is not a JSON object
/// - [`ScenarioFailure::MissingKeys`] listing every absent key
pub fn assert_response_contains(
    response: &ApiResponse,
    keys: &[&str],
) -> Result<(), ScenarioFailure> {
    let body = response
        .json_value()
        .map_err(|e| ScenarioFailure::schema("response body", &e))?;
    let object = body.as_object().ok_or_else(|| ScenarioFailure::Schema {
        record: "response body",
        reason: format!("expected a JSON object, got {body}"),
    })?;

    let missing: Vec<String> = keys
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| (*key).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ScenarioFailure::MissingKeys { missing })
    }
}

/// `created` of a queued message as a timestamp.
///
/// # Errors
///
/// - [`ScenarioFailure::MissingTimestamp`] if the message has none
/// - [`ScenarioFailure::Schema`] if it is out of range
pub fn created_at(message: &FullMessage) -> Result<DateTime<Utc>, ScenarioFailure> {
    let created = message.created.ok_or(ScenarioFailure::MissingTimestamp)?;
    DateTime::from_timestamp(created, 0).ok_or_else(|| ScenarioFailure::Schema {
        record: "FullMessage",
        reason: format!("created {created} is out of range"),
    })
}

/// Fail if `message_time` and `now` are more than `tolerance` apart, in
/// either direction.
///
/// # Errors
///
/// Returns [`ScenarioFailure::ClockSkew`] with the measured difference
pub fn check_time_difference(
    message_time: DateTime<Utc>,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), ScenarioFailure> {
    let difference = (now - message_time).abs().to_std().unwrap_or(Duration::MAX);
    if difference <= tolerance {
        Ok(())
    } else {
        Err(ScenarioFailure::ClockSkew {
            difference,
            tolerance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use serde_json::json;

    fn response(status: StatusCode, body: &serde_json::Value) -> ApiResponse {
        ApiResponse::new(status, HeaderMap::new(), body.to_string().into_bytes())
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn time_difference_is_symmetric_and_inclusive() {
        let tolerance = Duration::from_secs(2);
        assert!(check_time_difference(at(100), at(102), tolerance).is_ok());
        assert!(check_time_difference(at(102), at(100), tolerance).is_ok());
        assert!(matches!(
            check_time_difference(at(100), at(103), tolerance),
            Err(ScenarioFailure::ClockSkew { difference, .. })
                if difference == Duration::from_secs(3)
        ));
        assert!(check_time_difference(at(103), at(100), tolerance).is_err());
    }

    #[test]
    fn sub_second_offsets_count() {
        let now = at(100) + chrono::Duration::milliseconds(2_500);
        assert!(check_time_difference(at(100), now, Duration::from_secs(2)).is_err());
    }

    #[test]
    fn response_contains_reports_missing_keys() {
        let response = response(StatusCode::OK, &json!({"status": "ok", "uptime": 5}));
        assert!(assert_response_contains(&response, &["status", "uptime"]).is_ok());

        match assert_response_contains(&response, &["status", "timestamp", "version"]) {
            Err(ScenarioFailure::MissingKeys { missing }) => {
                assert_eq!(missing, vec!["timestamp", "version"]);
            }
            other => panic!("expected missing keys, got {other:?}"),
        }
    }

    #[test]
    fn response_contains_requires_object() {
        let response = response(StatusCode::OK, &json!([1, 2]));
        assert!(matches!(
            assert_response_contains(&response, &["status"]),
            Err(ScenarioFailure::Schema { .. })
        ));
    }

    #[test]
    fn status_mismatch_carries_body() {
        let response = response(StatusCode::BAD_REQUEST, &json!({"error": "empty space id"}));
        assert!(assert_status(&response, StatusCode::BAD_REQUEST).is_ok());
        match assert_status(&response, StatusCode::OK) {
            Err(ScenarioFailure::StatusMismatch {
                expected,
                actual,
                body,
            }) => {
                assert_eq!((expected, actual), (200, 400));
                assert!(body.contains("empty space id"));
            }
            other => panic!("expected status mismatch, got {other:?}"),
        }
    }

    #[test]
    fn missing_created_is_reported() {
        let message = FullMessage::expected(
            notes_harness_core::models::Note::text(1, "t", uuid::Uuid::new_v4()),
            uuid::Uuid::new_v4(),
        );
        assert!(matches!(
            created_at(&message),
            Err(ScenarioFailure::MissingTimestamp)
        ));

        let message = FullMessage {
            created: Some(1_700_000_000),
            ..message
        };
        assert_eq!(created_at(&message).unwrap(), at(1_700_000_000));
    }
}
