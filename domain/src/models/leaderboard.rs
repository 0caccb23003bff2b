use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Reverse;
use thiserror::Error;

use super::{ProfileRecord, RatingOrdinal};
use crate::types::TimeStamped;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rating: RatingOrdinal,
    pub record: ProfileRecord,
}

/// Rated profiles ordered by rating, highest first.
///
/// Equal ratings keep the order in which the records were handed to
/// [`Leaderboard::rank`]. Serialized as the JSON array of the underlying user objects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    into = "Vec<Map<String, Value>>",
    try_from = "Vec<Map<String, Value>>"
)]
pub struct Leaderboard {
    entries: Vec<RankedEntry>,
}

pub type LeaderboardSnapshot = TimeStamped<Leaderboard>;

impl Leaderboard {
    /// Keeps the records carrying a numeric rating and sorts them.
    pub fn rank(records: impl IntoIterator<Item = ProfileRecord>) -> Self {
        let mut entries = records
            .into_iter()
            .filter_map(|record| {
                record
                    .rating()
                    .map(|rating| RankedEntry { rating, record })
            })
            .collect::<Vec<_>>();

        // sort_by_key is stable
        entries.sort_by_key(|entry| Reverse(entry.rating.sort_key()));

        Self { entries }
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Leaderboard> for Vec<Map<String, Value>> {
    fn from(leaderboard: Leaderboard) -> Self {
        leaderboard
            .entries
            .into_iter()
            .map(|entry| entry.record.payload)
            .collect()
    }
}

#[derive(Debug, Error)]
#[error("published record #{index} is invalid: {reason}")]
pub struct InvalidPublishedRecord {
    pub index: usize,
    pub reason: &'static str,
}

impl TryFrom<Vec<Map<String, Value>>> for Leaderboard {
    type Error = InvalidPublishedRecord;

    fn try_from(users: Vec<Map<String, Value>>) -> Result<Self, Self::Error> {
        let records = users
            .into_iter()
            .enumerate()
            .map(|(index, user)| {
                let identifier = ProfileRecord::embedded_connect_code(&user).ok_or(
                    InvalidPublishedRecord {
                        index,
                        reason: "connectCode.code is missing",
                    },
                )?;
                let record = ProfileRecord::from_user_object(identifier, user);

                if record.rating().is_none() {
                    return Err(InvalidPublishedRecord {
                        index,
                        reason: "rankedNetplayProfile.ratingOrdinal is not a number",
                    });
                }
                Ok(record)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::rank(records))
    }
}
