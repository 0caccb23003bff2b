use domain::models::{ConnectCode, FetchOutcome};
use domain::repositories::PlayerProfileRepository;
use futures_util::future::join_all;

use crate::rate_limiter::RateLimiter;

/// Fetches every code concurrently, starting requests no faster than `limiter` allows.
///
/// Returns one outcome per code, in the order of `codes`.
pub async fn fetch_all(
    repository: &dyn PlayerProfileRepository,
    limiter: &RateLimiter,
    codes: &[ConnectCode],
) -> Vec<FetchOutcome> {
    join_all(codes.iter().map(|code| async move {
        limiter.acquire().await;
        repository.fetch_profile(code).await
    }))
    .await
}
