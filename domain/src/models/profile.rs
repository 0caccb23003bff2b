use derive_more::Display;
use ordered_float::OrderedFloat;
use serde_json::{Map, Value};

use super::ConnectCode;

/// The scalar the leaderboard is sorted by. Treated as opaque input.
#[derive(Debug, Display, Clone, Copy, PartialEq, PartialOrd)]
pub struct RatingOrdinal(pub f64);

impl RatingOrdinal {
    pub fn sort_key(self) -> OrderedFloat<f64> {
        OrderedFloat(self.0)
    }
}

/// What the `rankedNetplayProfile` field of a user object turned out to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankedProfile {
    Absent,
    /// The profile exists but `ratingOrdinal` is missing or not a number.
    WithoutRating,
    Rated(RatingOrdinal),
}

impl RankedProfile {
    fn decode(user: &Map<String, Value>) -> Self {
        match user.get("rankedNetplayProfile") {
            Some(Value::Object(profile)) => match profile.get("ratingOrdinal") {
                Some(Value::Number(number)) => number
                    .as_f64()
                    .map_or(Self::WithoutRating, |rating| Self::Rated(RatingOrdinal(rating))),
                _ => Self::WithoutRating,
            },
            _ => Self::Absent,
        }
    }
}

/// One user object returned by the profile service.
///
/// The object is kept verbatim in `payload` so that everything the ranking does not
/// look at (per-character stats, placements, subscription...) is published untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub identifier: ConnectCode,
    pub display_name: Option<String>,
    pub ranked_profile: RankedProfile,
    pub payload: Map<String, Value>,
}

impl ProfileRecord {
    pub fn from_user_object(identifier: ConnectCode, user: Map<String, Value>) -> Self {
        let display_name = user
            .get("displayName")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(ToOwned::to_owned);

        Self {
            identifier,
            display_name,
            ranked_profile: RankedProfile::decode(&user),
            payload: user,
        }
    }

    /// The connect code embedded in the user object itself (`connectCode.code`).
    pub fn embedded_connect_code(user: &Map<String, Value>) -> Option<ConnectCode> {
        user.get("connectCode")?
            .get("code")?
            .as_str()
            .and_then(|code| ConnectCode::from_string(code).ok())
    }

    pub fn has_ranked_profile(&self) -> bool {
        !matches!(self.ranked_profile, RankedProfile::Absent)
    }

    pub fn rating(&self) -> Option<RatingOrdinal> {
        match self.ranked_profile {
            RankedProfile::Rated(rating) => Some(rating),
            _ => None,
        }
    }

    pub fn name_for_logs(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Unknown user")
    }
}
