mod connect_code;
mod fetch_outcome;
mod leaderboard;
mod profile;

pub use connect_code::{unique_connect_codes, ConnectCode};
pub use fetch_outcome::{FetchFailure, FetchOutcome};
pub use leaderboard::{InvalidPublishedRecord, Leaderboard, LeaderboardSnapshot, RankedEntry};
pub use profile::{ProfileRecord, RankedProfile, RatingOrdinal};
