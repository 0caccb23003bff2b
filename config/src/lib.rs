use anyhow::Result;
use envy::Error;
use serde::Deserialize;
use std::path::PathBuf;

pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, Error>;
}

pub trait FromEnvLikeKeyValuePairs: Sized {
    fn from_iter(iter: impl Iterator<Item = (String, String)> + Clone) -> Result<Self, Error>;
}

impl<T: FromEnvLikeKeyValuePairs> FromEnv for T {
    fn from_env() -> Result<Self, Error> {
        // std::env::Vars is not Clone
        Self::from_iter(std::env::vars().collect::<Vec<_>>().into_iter())
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub profile_service_config: ProfileServiceConfig,
    pub roster_config: RosterConfig,
    pub snapshot_config: SnapshotConfig,
    pub publish_config: PublishConfig,
}

impl FromEnvLikeKeyValuePairs for AppConfig {
    fn from_iter(iter: impl Iterator<Item = (String, String)> + Clone) -> Result<Self, Error> {
        Ok(Self {
            profile_service_config: ProfileServiceConfig::from_iter(iter.clone())?,
            roster_config: RosterConfig::from_iter(iter.clone())?,
            snapshot_config: SnapshotConfig::from_iter(iter.clone())?,
            publish_config: PublishConfig::from_iter(iter)?,
        })
    }
}

/// Which GraphQL query shape the profile service speaks.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSchema {
    /// `getUser(fbUid:, connectCode:)`, answered as `data.getUser`.
    #[default]
    GetUser,
    /// `getConnectCode(code:)`, answered as `data.getConnectCode.user`.
    GetConnectCode,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProfileServiceConfig {
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default)]
    pub response_schema: ResponseSchema,
    #[serde(default = "default_request_interval_millis")]
    pub request_interval_millis: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint_url() -> String {
    "https://internal.slippi.gg/".to_owned()
}

fn default_request_interval_millis() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Deserialize, Debug, Clone)]
pub struct RosterConfig {
    /// An http(s) URL of a CSV export, or a path to a CSV file.
    pub csv_location: String,
    #[serde(default = "default_code_column")]
    pub code_column: usize,
    #[serde(default = "default_skipped_rows")]
    pub skipped_rows: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_code_column() -> usize {
    1
}

fn default_skipped_rows() -> usize {
    2
}

#[derive(Deserialize, Debug, Clone)]
pub struct SnapshotConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_current_file_name")]
    pub current_file_name: String,
    #[serde(default = "default_previous_file_name")]
    pub previous_file_name: String,
    #[serde(default = "default_timestamp_file_name")]
    pub timestamp_file_name: String,
}

fn default_current_file_name() -> String {
    "players-new.json".to_owned()
}

fn default_previous_file_name() -> String {
    "players-old.json".to_owned()
}

fn default_timestamp_file_name() -> String {
    "timestamp.json".to_owned()
}

#[derive(Deserialize, Debug, Clone)]
pub struct PublishConfig {
    pub project_root: PathBuf,
    #[serde(default = "default_git_program")]
    pub git_program: String,
    #[serde(default = "default_deploy_program")]
    pub deploy_program: String,
    #[serde(default = "default_deploy_args")]
    pub deploy_args: Vec<String>,
}

fn default_git_program() -> String {
    "git".to_owned()
}

fn default_deploy_program() -> String {
    "npm".to_owned()
}

fn default_deploy_args() -> Vec<String> {
    vec!["run".to_owned(), "deploy".to_owned()]
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_cron")]
    pub cron: String,
}

fn default_cron() -> String {
    "0 0,30 * * * *".to_owned()
}

#[derive(Deserialize, Debug, Clone)]
pub struct SentryConfig {
    #[serde(default = "default_environment_name")]
    pub environment_name: String,
    pub dsn: Option<String>,
}

fn default_environment_name() -> String {
    "local".to_owned()
}

impl FromEnvLikeKeyValuePairs for ProfileServiceConfig {
    fn from_iter(iter: impl Iterator<Item = (String, String)>) -> Result<Self, Error> {
        envy::prefixed("SLIPPI_API_").from_iter(iter)
    }
}

impl FromEnvLikeKeyValuePairs for RosterConfig {
    fn from_iter(iter: impl Iterator<Item = (String, String)>) -> Result<Self, Error> {
        envy::prefixed("ROSTER_").from_iter(iter)
    }
}

impl FromEnvLikeKeyValuePairs for SnapshotConfig {
    fn from_iter(iter: impl Iterator<Item = (String, String)>) -> Result<Self, Error> {
        envy::prefixed("SNAPSHOT_").from_iter(iter)
    }
}

impl FromEnvLikeKeyValuePairs for PublishConfig {
    fn from_iter(iter: impl Iterator<Item = (String, String)>) -> Result<Self, Error> {
        envy::prefixed("PUBLISH_").from_iter(iter)
    }
}

impl FromEnvLikeKeyValuePairs for ScheduleConfig {
    fn from_iter(iter: impl Iterator<Item = (String, String)>) -> Result<Self, Error> {
        envy::prefixed("SCHEDULE_").from_iter(iter)
    }
}

impl FromEnvLikeKeyValuePairs for SentryConfig {
    fn from_iter(iter: impl Iterator<Item = (String, String)>) -> Result<Self, Error> {
        envy::prefixed("SENTRY_").from_iter(iter)
    }
}
