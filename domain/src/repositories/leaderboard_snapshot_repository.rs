use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Leaderboard, LeaderboardSnapshot};

#[derive(Debug, Error)]
pub enum SnapshotWriteError {
    #[error("failed to stage the new snapshot")]
    Stage(#[source] anyhow::Error),
    #[error("failed to rotate the current snapshot into the previous slot")]
    Rotate(#[source] anyhow::Error),
    #[error("failed to replace the current snapshot")]
    Commit(#[source] anyhow::Error),
    #[error("failed to write the timestamp record")]
    Timestamp(#[source] anyhow::Error),
}

/// Storage of the published leaderboard in two rotating slots plus a timestamp record.
#[async_trait::async_trait]
pub trait LeaderboardSnapshotRepository: Send + Sync {
    /// Moves the current slot into the previous slot (skipped when there is no current
    /// slot yet), then replaces the current slot and the timestamp.
    ///
    /// Readers of the current slot observe either the old or the new leaderboard.
    async fn rotate_and_write(&self, snapshot: &LeaderboardSnapshot)
        -> Result<(), SnapshotWriteError>;

    async fn read_current(&self) -> anyhow::Result<Option<Leaderboard>>;

    async fn read_previous(&self) -> anyhow::Result<Option<Leaderboard>>;

    async fn read_timestamp(&self) -> anyhow::Result<Option<DateTime<Utc>>>;
}
