pub mod fetch;
pub mod pipeline;
pub mod rate_limiter;

use config::AppConfig;
use infra_publish_impl::{CommandDeployer, GitWorkingTreeGate};
use infra_roster_repository_impl::CsvRosterRepository;
use infra_snapshot_repository_impl::FileSnapshotRepository;
use infra_upstream_repository_impl::GraphqlUpstreamRepository;
use std::time::Duration;

pub use pipeline::{Pipeline, RunReport};
pub use rate_limiter::RateLimiter;

/// Runs the pipeline once against the collaborators described by `config`.
pub async fn run_once(config: &AppConfig) -> RunReport {
    let roster = match CsvRosterRepository::try_new(&config.roster_config) {
        Ok(roster) => roster,
        Err(error) => return RunReport::not_started(error),
    };
    let profiles = match GraphqlUpstreamRepository::try_new(&config.profile_service_config) {
        Ok(profiles) => profiles,
        Err(error) => return RunReport::not_started(error),
    };
    let snapshots = FileSnapshotRepository::new(&config.snapshot_config);
    let gate = GitWorkingTreeGate::new(&config.publish_config);
    let deployer = CommandDeployer::new(&config.publish_config);
    let limiter = RateLimiter::new(Duration::from_millis(
        config.profile_service_config.request_interval_millis,
    ));

    let pipeline = Pipeline {
        roster: &roster,
        profiles: &profiles,
        snapshots: &snapshots,
        gate: &gate,
        deployer: &deployer,
        limiter: &limiter,
        project_root: &config.publish_config.project_root,
    };

    pipeline.run().await
}
