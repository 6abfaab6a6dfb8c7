//! Claims carried by a token fixture

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeMap;

/// Claim key for the user identifier.
pub const USER_ID_CLAIM: &str = "user_id";

/// Claim key for the expiry.
pub const EXP_CLAIM: &str = "exp";

/// Token expiry, either raw epoch seconds or a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiry {
    /// Absolute expiry in seconds since the Unix epoch
    EpochSeconds(i64),
    /// Absolute expiry as a UTC timestamp
    At(DateTime<Utc>),
}

impl Expiry {
    /// Expiry as seconds since the Unix epoch (sub-second precision is truncated).
    #[must_use]
    pub fn epoch_seconds(&self) -> i64 {
        match self {
            Self::EpochSeconds(seconds) => *seconds,
            Self::At(at) => at.timestamp(),
        }
    }
}

impl From<i64> for Expiry {
    fn from(seconds: i64) -> Self {
        Self::EpochSeconds(seconds)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Expiry {
    fn from(at: DateTime<Tz>) -> Self {
        Self::At(at.with_timezone(&Utc))
    }
}

/// A timestamp without an offset is taken to be UTC.
impl From<NaiveDateTime> for Expiry {
    fn from(at: NaiveDateTime) -> Self {
        Self::At(at.and_utc())
    }
}

/// Optional claims of a token fixture.
///
/// Unset claims are omitted from the payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject user identifier
    pub user_id: Option<i64>,
    /// Expiry
    pub exp: Option<Expiry>,
}

impl TokenClaims {
    /// Create an empty claim set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            user_id: None,
            exp: None,
        }
    }

    /// Set the subject user identifier.
    #[must_use]
    pub const fn user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set an absolute expiry.
    #[must_use]
    pub fn expires_at(mut self, exp: impl Into<Expiry>) -> Self {
        self.exp = Some(exp.into());
        self
    }

    /// Set the expiry `offset_secs` after `now` (negative for an already expired token).
    #[must_use]
    pub fn expires_in(mut self, offset_secs: i64, now: DateTime<Utc>) -> Self {
        self.exp = Some(Expiry::EpochSeconds(
            (now + Duration::seconds(offset_secs)).timestamp(),
        ));
        self
    }

    /// Claims that are present, keyed and ordered by claim name.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<&'static str, i64> {
        let mut payload = BTreeMap::new();
        if let Some(user_id) = self.user_id {
            payload.insert(USER_ID_CLAIM, user_id);
        }
        if let Some(exp) = self.exp {
            payload.insert(EXP_CLAIM, exp.epoch_seconds());
        }
        payload
    }

    /// Compact JSON payload with keys in sorted order.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn payload_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.to_map())
    }
}
