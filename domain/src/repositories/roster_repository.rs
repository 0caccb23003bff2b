use thiserror::Error;

use crate::models::ConnectCode;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster source is unavailable")]
    SourceUnavailable(#[source] anyhow::Error),
}

#[async_trait::async_trait]
pub trait RosterRepository: Send + Sync {
    /// Connect codes to track, deduplicated, in roster order.
    async fn list_players(&self) -> Result<Vec<ConnectCode>, RosterError>;
}
