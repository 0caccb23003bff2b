use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkingTreeStatus {
    Clean,
    Dirty { pending_changes: usize },
    /// The check itself could not be completed. Never treated as clean.
    Unknown { reason: String },
}

impl WorkingTreeStatus {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }
}

#[async_trait::async_trait]
pub trait PublishGate: Send + Sync {
    async fn check_clean(&self, project_root: &Path) -> WorkingTreeStatus;
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to launch the deploy command")]
    Launch(#[source] std::io::Error),
    #[error("deploy command exited with {status}")]
    Failed { status: String },
}

#[async_trait::async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, project_root: &Path) -> Result<(), DeployError>;
}
