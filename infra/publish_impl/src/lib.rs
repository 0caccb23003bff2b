use config::PublishConfig;
use domain::repositories::{DeployError, Deployer, PublishGate, WorkingTreeStatus};
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

/// Refuses to publish unless `git status --porcelain` reports nothing.
#[derive(Debug, Clone)]
pub struct GitWorkingTreeGate {
    git_program: String,
}

impl GitWorkingTreeGate {
    pub fn new(config: &PublishConfig) -> Self {
        Self {
            git_program: config.git_program.clone(),
        }
    }
}

fn interpret_porcelain_status(output: &Output) -> WorkingTreeStatus {
    if !output.status.success() {
        return WorkingTreeStatus::Unknown {
            reason: format!(
                "git status exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        };
    }

    if !output.stdout.is_empty() {
        let pending_changes = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count();

        // any output at all means not clean, even if it holds no path
        WorkingTreeStatus::Dirty {
            pending_changes: pending_changes.max(1),
        }
    } else if !output.stderr.is_empty() {
        WorkingTreeStatus::Unknown {
            reason: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        }
    } else {
        WorkingTreeStatus::Clean
    }
}

#[async_trait::async_trait]
impl PublishGate for GitWorkingTreeGate {
    #[tracing::instrument(skip(self))]
    async fn check_clean(&self, project_root: &Path) -> WorkingTreeStatus {
        let output = Command::new(&self.git_program)
            .arg("-C")
            .arg(project_root)
            .args(["status", "--porcelain"])
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => interpret_porcelain_status(&output),
            Err(error) => WorkingTreeStatus::Unknown {
                reason: format!("failed to run {}: {error}", self.git_program),
            },
        }
    }
}

/// Runs an external deploy command from the project root.
#[derive(Debug, Clone)]
pub struct CommandDeployer {
    program: String,
    args: Vec<String>,
}

impl CommandDeployer {
    pub fn new(config: &PublishConfig) -> Self {
        Self {
            program: config.deploy_program.clone(),
            args: config.deploy_args.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Deployer for CommandDeployer {
    #[tracing::instrument(skip(self), fields(program = %self.program))]
    async fn deploy(&self, project_root: &Path) -> Result<(), DeployError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(project_root)
            .output()
            .await
            .map_err(DeployError::Launch)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            tracing::info!("{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            tracing::error!("{}", stderr.trim_end());
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(DeployError::Failed {
                status: output.status.to_string(),
            })
        }
    }
}
