#![deny(clippy::all, clippy::cargo)]
#![warn(clippy::nursery, clippy::pedantic)]
#![allow(clippy::cargo_common_metadata, clippy::multiple_crate_versions)]

use config::{AppConfig, FromEnv, SentryConfig};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let sentry_config = SentryConfig::from_env()?;

    // setup sentry
    // only send sentry events when it's not running locally
    let _guard = match (&sentry_config.dsn, sentry_config.environment_name.as_str()) {
        (Some(dsn), environment_name) if environment_name != "local" => {
            let guard = sentry::init((
                dsn.as_str(),
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    traces_sample_rate: 0.1,
                    environment: Some(environment_name.to_owned().into()),
                    ..Default::default()
                },
            ));
            sentry::configure_scope(|scope| scope.set_level(Some(sentry::Level::Warning)));
            Some(guard)
        }
        _ => None,
    };

    // initialize tracing
    // see https://github.com/tokio-rs/axum/blob/79a0a54bc9f0f585c974b5e6793541baff980662/examples/tracing-aka-logging/src/main.rs
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry::integrations::tracing::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Starting player fetch.");
    let report = ingestor::run_once(&config).await;
    tracing::info!("{report}");

    Ok(ExitCode::from(report.exit_code()))
}
