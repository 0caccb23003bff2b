use crate::models::{ConnectCode, FetchOutcome};

#[async_trait::async_trait]
pub trait PlayerProfileRepository: Send + Sync {
    /// Issues exactly one profile query. Failures are reported in the outcome,
    /// never raised.
    async fn fetch_profile(&self, code: &ConnectCode) -> FetchOutcome;
}
