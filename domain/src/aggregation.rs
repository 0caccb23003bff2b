use std::fmt;

use crate::models::{FetchOutcome, Leaderboard, ProfileRecord, RankedProfile};

/// How many fetch outcomes ended up where.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationCounts {
    pub total: usize,
    /// The service answered with a parseable body.
    pub succeeded: usize,
    /// Network errors and malformed bodies.
    pub failed: usize,
    /// Answers carrying a user object.
    pub valid_profiles: usize,
    pub ranked: usize,
    pub unranked: usize,
}

impl fmt::Display for AggregationCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} results total, {} successful, {} failed, {} valid user objects, {} with ranked profiles, {} without",
            self.total, self.succeeded, self.failed, self.valid_profiles, self.ranked, self.unranked
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub leaderboard: Leaderboard,
    pub counts: AggregationCounts,
}

/// Turns the outcomes of one fetch round into a leaderboard.
///
/// Pure apart from logging: the same outcomes always produce the same leaderboard.
/// An empty leaderboard is a valid result.
pub fn aggregate(outcomes: &[FetchOutcome]) -> Aggregation {
    let mut counts = AggregationCounts {
        total: outcomes.len(),
        ..AggregationCounts::default()
    };
    let mut profiles: Vec<&ProfileRecord> = Vec::new();

    for outcome in outcomes {
        match outcome {
            FetchOutcome::Fetched(record) => {
                counts.succeeded += 1;
                profiles.push(record);
            }
            FetchOutcome::Failed(failure) if failure.is_hard_failure() => {
                counts.failed += 1;
            }
            FetchOutcome::Failed(failure) => {
                counts.succeeded += 1;
                tracing::debug!("{failure}");
            }
        }
    }
    counts.valid_profiles = profiles.len();

    let ranked = profiles
        .into_iter()
        .filter(|record| match record.ranked_profile {
            RankedProfile::Rated(_) => true,
            RankedProfile::Absent | RankedProfile::WithoutRating => {
                tracing::warn!("No ranked profile for {}", record.name_for_logs());
                false
            }
        })
        .cloned()
        .collect::<Vec<_>>();

    counts.ranked = ranked.len();
    counts.unranked = counts.valid_profiles - counts.ranked;

    Aggregation {
        leaderboard: Leaderboard::rank(ranked),
        counts,
    }
}
