use chrono::Utc;
use domain::aggregation::{aggregate, Aggregation, AggregationCounts};
use domain::repositories::{
    DeployError, Deployer, LeaderboardSnapshotRepository, PlayerProfileRepository, PublishGate,
    RosterError, RosterRepository, SnapshotWriteError, WorkingTreeStatus,
};
use domain::types::TimeStamped;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::fetch::fetch_all;
use crate::rate_limiter::RateLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    FetchingRoster,
    Fetching,
    Aggregating,
    Publishing,
    GateCheck,
    Deploying,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::FetchingRoster => "fetching the roster",
            Self::Fetching => "fetching profiles",
            Self::Aggregating => "aggregating",
            Self::Publishing => "publishing the snapshot",
            Self::GateCheck => "checking the working tree",
            Self::Deploying => "deploying",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AbortReason {
    #[error("could not set up the run")]
    Setup(#[source] anyhow::Error),
    #[error(transparent)]
    SourceUnavailable(#[from] RosterError),
    #[error("no ranked profiles were fetched, keeping the published snapshot")]
    EmptyLeaderboard,
    #[error(transparent)]
    SnapshotWriteFailure(#[from] SnapshotWriteError),
}

#[derive(Debug)]
pub enum DeployStatus {
    Deployed,
    Skipped(WorkingTreeStatus),
    Failed(DeployError),
}

#[derive(Debug)]
pub enum RunOutcome {
    Published(DeployStatus),
    Aborted {
        state: PipelineState,
        reason: AbortReason,
    },
}

/// Summary of one run, emitted whatever the run's outcome.
#[derive(Debug)]
pub struct RunReport {
    pub roster_size: usize,
    pub counts: AggregationCounts,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Report of a run whose collaborators could not even be constructed.
    pub fn not_started(error: anyhow::Error) -> Self {
        Self {
            roster_size: 0,
            counts: AggregationCounts::default(),
            outcome: RunOutcome::Aborted {
                state: PipelineState::Idle,
                reason: AbortReason::Setup(error),
            },
        }
    }

    /// 0 when published, 1 when aborted, 2 when published but not deployed because the
    /// deploy command failed.
    pub fn exit_code(&self) -> u8 {
        match self.outcome {
            RunOutcome::Published(DeployStatus::Deployed | DeployStatus::Skipped(_)) => 0,
            RunOutcome::Aborted { .. } => 1,
            RunOutcome::Published(DeployStatus::Failed(_)) => 2,
        }
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "roster of {} players; {}; ", self.roster_size, self.counts)?;

        match &self.outcome {
            RunOutcome::Published(DeployStatus::Deployed) => write!(f, "published and deployed"),
            RunOutcome::Published(DeployStatus::Skipped(WorkingTreeStatus::Dirty {
                pending_changes,
            })) => write!(
                f,
                "published, deploy skipped: dirty tree ({pending_changes} pending changes)"
            ),
            RunOutcome::Published(DeployStatus::Skipped(status)) => {
                write!(f, "published, deploy skipped: working tree state unknown ({status:?})")
            }
            RunOutcome::Published(DeployStatus::Failed(error)) => {
                write!(f, "published, deploy failed: {}", error_chain(error))
            }
            RunOutcome::Aborted { state, reason } => {
                write!(f, "aborted while {state}: {}", error_chain(reason))
            }
        }
    }
}

/// Sequences one fetch-aggregate-publish run over the given collaborators.
pub struct Pipeline<'a> {
    pub roster: &'a dyn RosterRepository,
    pub profiles: &'a dyn PlayerProfileRepository,
    pub snapshots: &'a dyn LeaderboardSnapshotRepository,
    pub gate: &'a dyn PublishGate,
    pub deployer: &'a dyn Deployer,
    pub limiter: &'a RateLimiter,
    pub project_root: &'a Path,
}

#[derive(Debug)]
struct Progress {
    state: PipelineState,
    roster_size: usize,
    counts: AggregationCounts,
}

impl Progress {
    fn enter(&mut self, next: PipelineState) {
        tracing::debug!("{} -> {}", self.state, next);
        self.state = next;
    }
}

impl Pipeline<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> RunReport {
        let mut progress = Progress {
            state: PipelineState::Idle,
            roster_size: 0,
            counts: AggregationCounts::default(),
        };

        let outcome = match self.publish(&mut progress).await {
            Ok(deploy_status) => RunOutcome::Published(deploy_status),
            Err(reason) => RunOutcome::Aborted {
                state: progress.state,
                reason,
            },
        };

        RunReport {
            roster_size: progress.roster_size,
            counts: progress.counts,
            outcome,
        }
    }

    async fn publish(&self, progress: &mut Progress) -> Result<DeployStatus, AbortReason> {
        tracing::info!("Date logged = {}", Utc::now());

        progress.enter(PipelineState::FetchingRoster);
        let codes = self.roster.list_players().await?;
        progress.roster_size = codes.len();
        tracing::info!("Found {} player codes", codes.len());

        progress.enter(PipelineState::Fetching);
        let outcomes = fetch_all(self.profiles, self.limiter, &codes).await;

        progress.enter(PipelineState::Aggregating);
        let Aggregation {
            leaderboard,
            counts,
        } = aggregate(&outcomes);
        progress.counts = counts;
        tracing::info!("{counts}");

        if leaderboard.is_empty() {
            return Err(AbortReason::EmptyLeaderboard);
        }

        progress.enter(PipelineState::Publishing);
        self.snapshots
            .rotate_and_write(&TimeStamped::now(leaderboard))
            .await?;

        progress.enter(PipelineState::GateCheck);
        let tree_status = self.gate.check_clean(self.project_root).await;
        if !tree_status.is_clean() {
            tracing::warn!("Pending git changes... aborting deploy: {tree_status:?}");
            progress.enter(PipelineState::Done);
            return Ok(DeployStatus::Skipped(tree_status));
        }

        progress.enter(PipelineState::Deploying);
        tracing::info!("Deploying.");
        let deploy_status = match self.deployer.deploy(self.project_root).await {
            Ok(()) => {
                tracing::info!("Deploy complete.");
                DeployStatus::Deployed
            }
            Err(error) => {
                tracing::error!("Deploy failed: {}", error_chain(&error));
                DeployStatus::Failed(error)
            }
        };

        progress.enter(PipelineState::Done);
        Ok(deploy_status)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::anyhow;
    use chrono::{DateTime, Utc};
    use domain::models::{
        ConnectCode, FetchFailure, FetchOutcome, Leaderboard, LeaderboardSnapshot, ProfileRecord,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeRoster(Option<Vec<&'static str>>);

    #[async_trait::async_trait]
    impl RosterRepository for FakeRoster {
        async fn list_players(&self) -> Result<Vec<ConnectCode>, RosterError> {
            match &self.0 {
                Some(codes) => Ok(codes
                    .iter()
                    .map(|code| ConnectCode::from_string(code).unwrap())
                    .collect()),
                None => Err(RosterError::SourceUnavailable(anyhow!("sheet is gone"))),
            }
        }
    }

    enum Scripted {
        Rated(f64),
        Unranked,
        NetworkError,
    }

    struct ScriptedProfiles(HashMap<&'static str, Scripted>);

    #[async_trait::async_trait]
    impl PlayerProfileRepository for ScriptedProfiles {
        async fn fetch_profile(&self, code: &ConnectCode) -> FetchOutcome {
            let ranked = match &self.0[code.as_str()] {
                Scripted::Rated(rating) => json!({ "ratingOrdinal": rating }),
                Scripted::Unranked => Value::Null,
                Scripted::NetworkError => {
                    return FetchOutcome::Failed(FetchFailure::Network {
                        code: code.clone(),
                        message: "connection reset".to_owned(),
                    })
                }
            };
            let Value::Object(user) = json!({
                "connectCode": { "code": code.as_str() },
                "rankedNetplayProfile": ranked,
            }) else {
                unreachable!()
            };
            FetchOutcome::Fetched(ProfileRecord::from_user_object(code.clone(), user))
        }
    }

    #[derive(Default)]
    struct MemorySnapshots {
        current: Mutex<Option<Leaderboard>>,
        previous: Mutex<Option<Leaderboard>>,
        writes: AtomicUsize,
        fail_writes: bool,
    }

    #[async_trait::async_trait]
    impl LeaderboardSnapshotRepository for MemorySnapshots {
        async fn rotate_and_write(
            &self,
            snapshot: &LeaderboardSnapshot,
        ) -> Result<(), SnapshotWriteError> {
            if self.fail_writes {
                return Err(SnapshotWriteError::Stage(anyhow!("disk full")));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut current = self.current.lock().unwrap();
            if let Some(old) = current.take() {
                *self.previous.lock().unwrap() = Some(old);
            }
            *current = Some(snapshot.data.clone());
            Ok(())
        }

        async fn read_current(&self) -> anyhow::Result<Option<Leaderboard>> {
            Ok(self.current.lock().unwrap().clone())
        }

        async fn read_previous(&self) -> anyhow::Result<Option<Leaderboard>> {
            Ok(self.previous.lock().unwrap().clone())
        }

        async fn read_timestamp(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
            Ok(None)
        }
    }

    struct FakeGate(WorkingTreeStatus);

    #[async_trait::async_trait]
    impl PublishGate for FakeGate {
        async fn check_clean(&self, _project_root: &Path) -> WorkingTreeStatus {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct RecordingDeployer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Deployer for RecordingDeployer {
        async fn deploy(&self, _project_root: &Path) -> Result<(), DeployError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DeployError::Failed {
                    status: "exit status: 1".to_owned(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        roster: FakeRoster,
        profiles: ScriptedProfiles,
        snapshots: MemorySnapshots,
        gate: FakeGate,
        deployer: RecordingDeployer,
        limiter: RateLimiter,
    }

    impl Fixture {
        fn new(roster: Option<Vec<&'static str>>, profiles: Vec<(&'static str, Scripted)>) -> Self {
            Self {
                roster: FakeRoster(roster),
                profiles: ScriptedProfiles(profiles.into_iter().collect()),
                snapshots: MemorySnapshots::default(),
                gate: FakeGate(WorkingTreeStatus::Clean),
                deployer: RecordingDeployer::default(),
                limiter: RateLimiter::per_second(),
            }
        }

        async fn run(&self) -> RunReport {
            Pipeline {
                roster: &self.roster,
                profiles: &self.profiles,
                snapshots: &self.snapshots,
                gate: &self.gate,
                deployer: &self.deployer,
                limiter: &self.limiter,
                project_root: Path::new("."),
            }
            .run()
            .await
        }

        async fn current_codes(&self) -> Option<Vec<String>> {
            self.snapshots.read_current().await.unwrap().map(|leaderboard| {
                leaderboard
                    .entries()
                    .iter()
                    .map(|entry| entry.record.identifier.to_string())
                    .collect()
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_and_deploys_ranked_leaderboard() {
        let fixture = Fixture::new(
            Some(vec!["AAAA#111", "BBBB#222"]),
            vec![
                ("AAAA#111", Scripted::Rated(1500.0)),
                ("BBBB#222", Scripted::Rated(1700.0)),
            ],
        );

        let report = fixture.run().await;

        assert!(matches!(
            report.outcome,
            RunOutcome::Published(DeployStatus::Deployed)
        ));
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            fixture.current_codes().await,
            Some(vec!["BBBB#222".to_owned(), "AAAA#111".to_owned()])
        );
        assert_eq!(fixture.deployer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_failures_still_publish() {
        let fixture = Fixture::new(
            Some(vec!["AAAA#111", "BBBB#222", "CCCC#333"]),
            vec![
                ("AAAA#111", Scripted::NetworkError),
                ("BBBB#222", Scripted::Unranked),
                ("CCCC#333", Scripted::Rated(1200.0)),
            ],
        );

        let report = fixture.run().await;

        assert_eq!(report.roster_size, 3);
        assert_eq!(report.counts.failed, 1);
        assert_eq!(report.counts.unranked, 1);
        assert_eq!(report.counts.ranked, 1);
        assert!(matches!(report.outcome, RunOutcome::Published(_)));
        assert_eq!(
            fixture.current_codes().await,
            Some(vec!["CCCC#333".to_owned()])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_leaderboard_aborts_before_writing() {
        let fixture = Fixture::new(
            Some(vec!["AAAA#111", "BBBB#222"]),
            vec![
                ("AAAA#111", Scripted::Unranked),
                ("BBBB#222", Scripted::NetworkError),
            ],
        );
        *fixture.snapshots.current.lock().unwrap() = Some(Leaderboard::default());

        let report = fixture.run().await;

        assert!(matches!(
            report.outcome,
            RunOutcome::Aborted {
                state: PipelineState::Aggregating,
                reason: AbortReason::EmptyLeaderboard,
            }
        ));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(fixture.snapshots.writes.load(Ordering::SeqCst), 0);
        assert_eq!(fixture.current_codes().await, Some(vec![]));
        assert_eq!(fixture.snapshots.read_previous().await.unwrap(), None);
        assert_eq!(fixture.deployer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dirty_tree_skips_deploy_after_publishing() {
        let mut fixture = Fixture::new(
            Some(vec!["AAAA#111"]),
            vec![("AAAA#111", Scripted::Rated(1500.0))],
        );
        fixture.gate = FakeGate(WorkingTreeStatus::Dirty { pending_changes: 1 });

        let report = fixture.run().await;

        assert!(matches!(
            report.outcome,
            RunOutcome::Published(DeployStatus::Skipped(WorkingTreeStatus::Dirty {
                pending_changes: 1
            }))
        ));
        assert_eq!(report.exit_code(), 0);
        assert!(report.to_string().contains("skipped: dirty tree"));
        assert_eq!(fixture.snapshots.writes.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.deployer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_tree_state_fails_closed() {
        let mut fixture = Fixture::new(
            Some(vec!["AAAA#111"]),
            vec![("AAAA#111", Scripted::Rated(1500.0))],
        );
        fixture.gate = FakeGate(WorkingTreeStatus::Unknown {
            reason: "git not found".to_owned(),
        });

        let report = fixture.run().await;

        assert!(matches!(
            report.outcome,
            RunOutcome::Published(DeployStatus::Skipped(_))
        ));
        assert_eq!(fixture.deployer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_roster_aborts_before_fetching() {
        let fixture = Fixture::new(None, vec![]);

        let report = fixture.run().await;

        assert!(matches!(
            report.outcome,
            RunOutcome::Aborted {
                state: PipelineState::FetchingRoster,
                reason: AbortReason::SourceUnavailable(_),
            }
        ));
        assert_eq!(report.roster_size, 0);
        assert!(report.to_string().contains("sheet is gone"));
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_write_failure_aborts_without_deploying() {
        let mut fixture = Fixture::new(
            Some(vec!["AAAA#111"]),
            vec![("AAAA#111", Scripted::Rated(1500.0))],
        );
        fixture.snapshots.fail_writes = true;

        let report = fixture.run().await;

        assert!(matches!(
            report.outcome,
            RunOutcome::Aborted {
                state: PipelineState::Publishing,
                reason: AbortReason::SnapshotWriteFailure(_),
            }
        ));
        assert_eq!(fixture.deployer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deploy_failure_leaves_run_published_but_degraded() {
        let mut fixture = Fixture::new(
            Some(vec!["AAAA#111"]),
            vec![("AAAA#111", Scripted::Rated(1500.0))],
        );
        fixture.deployer.fail = true;

        let report = fixture.run().await;

        assert!(matches!(
            report.outcome,
            RunOutcome::Published(DeployStatus::Failed(_))
        ));
        assert_eq!(report.exit_code(), 2);
        assert_eq!(fixture.current_codes().await, Some(vec!["AAAA#111".to_owned()]));
    }

    #[test]
    fn setup_failure_still_reports_counts() {
        let report = RunReport::not_started(anyhow!("builder error"));

        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.counts, AggregationCounts::default());
        let summary = report.to_string();
        assert!(summary.starts_with("roster of 0 players; 0 results total"));
        assert!(summary.contains("aborted while idle: could not set up the run: builder error"));
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_rotates_previous() {
        let fixture = Fixture::new(
            Some(vec!["AAAA#111"]),
            vec![("AAAA#111", Scripted::Rated(1500.0))],
        );

        fixture.run().await;
        fixture.run().await;

        assert_eq!(fixture.snapshots.writes.load(Ordering::SeqCst), 2);
        assert!(fixture.snapshots.read_previous().await.unwrap().is_some());
    }
}
