use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Admits at most one caller per `interval`, across every task sharing the limiter.
///
/// The first caller is admitted immediately. Waiting callers are admitted in the order
/// they asked, each one `interval` after the previous admission.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_admission: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_admission: Mutex::new(None),
        }
    }

    pub fn per_second() -> Self {
        Self::new(Duration::from_secs(1))
    }

    pub async fn acquire(&self) {
        let admission = {
            let mut next_admission = self.next_admission.lock().await;
            let now = Instant::now();
            let admission = next_admission.map_or(now, |next| next.max(now));
            *next_admission = Some(admission + self.interval);
            admission
        };

        tokio::time::sleep_until(admission).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures_util::future::join_all;

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquisitions_are_spaced_by_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(250));
        let start = Instant::now();

        let mut admitted = join_all((0..6).map(|_| async {
            limiter.acquire().await;
            Instant::now()
        }))
        .await;
        admitted.sort();

        assert_eq!(admitted[0], start);
        for pair in admitted.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_limiter_admits_immediately() {
        let limiter = RateLimiter::per_second();

        limiter.acquire().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_tasks_share_the_limiter() {
        let limiter = std::sync::Arc::new(RateLimiter::per_second());
        let start = Instant::now();

        let handles = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect::<Vec<_>>();

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();

        assert_eq!(
            admitted,
            vec![
                start,
                start + Duration::from_secs(1),
                start + Duration::from_secs(2)
            ]
        );
    }
}
