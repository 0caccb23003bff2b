use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use config::SnapshotConfig;
use domain::models::{Leaderboard, LeaderboardSnapshot};
use domain::repositories::{LeaderboardSnapshotRepository, SnapshotWriteError};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
struct TimestampRecord {
    /// Milliseconds since the unix epoch.
    updated: i64,
}

/// Keeps the published leaderboard as JSON files in one directory.
///
/// Every file is replaced by writing a sibling staging file and renaming it over the
/// target, so a reader sees either the old or the new content of a slot. The previous
/// slot is filled with a copy of the current slot, which therefore never goes missing
/// during a rotation.
#[derive(Debug, Clone)]
pub struct FileSnapshotRepository {
    data_dir: PathBuf,
    current: PathBuf,
    previous: PathBuf,
    timestamp: PathBuf,
}

fn staging_path_of(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().map_or_else(OsString::new, ToOwned::to_owned);
    file_name.push(".staging");
    path.with_file_name(file_name)
}

async fn write_synced(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(())
}

async fn replace_atomically(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    let staging = staging_path_of(path);
    write_synced(&staging, contents).await?;
    tokio::fs::rename(&staging, path)
        .await
        .with_context(|| format!("failed to move {} into place", path.display()))
}

async fn read_if_exists(path: &Path) -> anyhow::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(anyhow!(error).context(format!("failed to read {}", path.display()))),
    }
}

impl FileSnapshotRepository {
    pub fn new(config: &SnapshotConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            current: config.data_dir.join(&config.current_file_name),
            previous: config.data_dir.join(&config.previous_file_name),
            timestamp: config.data_dir.join(&config.timestamp_file_name),
        }
    }

    /// Writes the new leaderboard next to the current slot without touching it.
    async fn stage_current(&self, leaderboard: &Leaderboard) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let contents = serde_json::to_vec_pretty(leaderboard)?;
        write_synced(&staging_path_of(&self.current), &contents).await
    }

    /// Copies the current slot into the previous slot. Returns `false` when there is no
    /// current slot yet.
    async fn rotate_previous(&self) -> anyhow::Result<bool> {
        let staging = staging_path_of(&self.previous);
        match tokio::fs::copy(&self.current, &staging).await {
            Ok(_) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(false),
            Err(error) => return Err(anyhow!(error).context("failed to copy the current slot")),
        }

        tokio::fs::rename(&staging, &self.previous).await?;
        Ok(true)
    }

    async fn commit_current(&self) -> anyhow::Result<()> {
        tokio::fs::rename(staging_path_of(&self.current), &self.current)
            .await
            .context("failed to move the staged snapshot into the current slot")
    }

    async fn write_timestamp(&self, utc_timestamp: DateTime<Utc>) -> anyhow::Result<()> {
        let record = TimestampRecord {
            updated: utc_timestamp.timestamp_millis(),
        };
        replace_atomically(&self.timestamp, &serde_json::to_vec(&record)?).await
    }

    async fn read_leaderboard(path: &Path) -> anyhow::Result<Option<Leaderboard>> {
        read_if_exists(path)
            .await?
            .map(|contents| {
                serde_json::from_slice::<Leaderboard>(&contents)
                    .with_context(|| format!("{} is not a valid leaderboard", path.display()))
            })
            .transpose()
    }
}

#[async_trait::async_trait]
impl LeaderboardSnapshotRepository for FileSnapshotRepository {
    #[tracing::instrument(skip(self, snapshot), fields(entries = snapshot.data.len()))]
    async fn rotate_and_write(
        &self,
        snapshot: &LeaderboardSnapshot,
    ) -> Result<(), SnapshotWriteError> {
        self.stage_current(&snapshot.data)
            .await
            .map_err(SnapshotWriteError::Stage)?;

        if self
            .rotate_previous()
            .await
            .map_err(SnapshotWriteError::Rotate)?
        {
            tracing::info!("Rotated existing data file.");
        } else {
            tracing::warn!("Old data file not found, skipping rotation.");
        }

        self.commit_current()
            .await
            .map_err(SnapshotWriteError::Commit)?;
        self.write_timestamp(snapshot.utc_timestamp)
            .await
            .map_err(SnapshotWriteError::Timestamp)?;

        tracing::info!("Wrote new data file and timestamp.");
        Ok(())
    }

    async fn read_current(&self) -> anyhow::Result<Option<Leaderboard>> {
        Self::read_leaderboard(&self.current).await
    }

    async fn read_previous(&self) -> anyhow::Result<Option<Leaderboard>> {
        Self::read_leaderboard(&self.previous).await
    }

    async fn read_timestamp(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        let Some(contents) = read_if_exists(&self.timestamp).await? else {
            return Ok(None);
        };

        let record = serde_json::from_slice::<TimestampRecord>(&contents)?;
        DateTime::from_timestamp_millis(record.updated)
            .map(Some)
            .ok_or_else(|| anyhow!("timestamp {} is out of range", record.updated))
    }
}
