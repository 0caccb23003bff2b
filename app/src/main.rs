#![deny(clippy::all, clippy::cargo)]
#![warn(clippy::nursery, clippy::pedantic)]
#![allow(clippy::cargo_common_metadata, clippy::multiple_crate_versions)]

use config::{AppConfig, FromEnv, ScheduleConfig};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // initialize tracing
    // see https://github.com/tokio-rs/axum/blob/79a0a54bc9f0f585c974b5e6793541baff980662/examples/tracing-aka-logging/src/main.rs
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Reading config...");
    let config = Arc::new(AppConfig::from_env()?);
    let schedule = ScheduleConfig::from_env()?;

    let mut scheduler = scheduled_leaderboard_publishing(config, &schedule.cron).await?;
    scheduler.start().await?;
    tracing::info!("Scheduled leaderboard runs with {:?}", schedule.cron);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down scheduler");
    scheduler.shutdown().await?;

    Ok(())
}

async fn scheduled_leaderboard_publishing(
    config: Arc<AppConfig>,
    cron: &str,
) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    // held for the whole run; a tick that finds it taken is skipped
    let running = Arc::new(Mutex::new(()));

    scheduler
        .add(Job::new_async(cron, move |_uuid, _l| {
            let config = Arc::clone(&config);
            let running = Arc::clone(&running);

            Box::pin(async move {
                let Ok(_running) = running.try_lock() else {
                    tracing::warn!("Previous run is still in progress, skipping this tick");
                    return;
                };

                let report = ingestor::run_once(&config).await;
                tracing::info!("{report}");
            })
        })?)
        .await?;

    Ok(scheduler)
}
