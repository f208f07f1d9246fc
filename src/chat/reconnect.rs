//! Bounded reconnection: exponential backoff with a cap, jitter and a
//! maximum attempt count. Exhausting the budget surfaces a terminal
//! `Transport` error instead of retrying forever.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::shared::error::SupportError;

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
    /// Number of retries after the initial attempt.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(30),
            max_attempts: 6,
        }
    }
}

impl ReconnectPolicy {
    /// Deterministic backoff before retry `attempt` (0-based): doubles
    /// from `base` up to `cap`, `None` once the retry budget is spent.
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt);
        Some(self.base.saturating_mul(factor).min(self.cap))
    }

    /// Backoff with equal jitter: half the deterministic delay fixed,
    /// half randomized, so simultaneous clients do not reconnect in
    /// lockstep.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        self.backoff(attempt).map(|delay| {
            let millis = delay.as_millis() as u64;
            let half = millis / 2;
            let jitter = rand::thread_rng().gen_range(0..=half);
            Duration::from_millis(half + jitter)
        })
    }
}

/// Drives `connect` until it succeeds or the retry budget is exhausted.
/// Each failed attempt waits the policy's next (jittered) delay.
pub async fn with_reconnect<T, C, Fut>(
    policy: &ReconnectPolicy,
    mut connect: C,
) -> Result<T, SupportError>
where
    C: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, SupportError>>,
{
    let mut attempt = 0u32;
    loop {
        match connect(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let Some(delay) = policy.next_delay(attempt) else {
                    warn!(attempt, "reconnect budget exhausted: {e}");
                    return Err(SupportError::Transport(format!(
                        "disconnected after {} attempts: {e}",
                        attempt + 1
                    )));
                };
                warn!(attempt, ?delay, "connection attempt failed, retrying: {e}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            base: Duration::from_millis(100),
            cap: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }

    #[test]
    fn backoff_is_nondecreasing_up_to_the_cap() {
        let p = policy();
        let delays: Vec<Duration> = (0..p.max_attempts)
            .map(|n| p.backoff(n).unwrap())
            .collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(*delays.last().unwrap(), Duration::from_millis(1000));
    }

    #[test]
    fn backoff_stops_after_max_attempts() {
        let p = policy();
        assert!(p.backoff(4).is_some());
        assert!(p.backoff(5).is_none());
    }

    #[test]
    fn jittered_delay_stays_within_bounds() {
        let p = policy();
        for _ in 0..100 {
            let delay = p.next_delay(3).unwrap();
            let full = p.backoff(3).unwrap();
            assert!(delay >= full / 2);
            assert!(delay <= full);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_reconnect(&policy(), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SupportError::Transport("connection reset".into()))
                } else {
                    Ok("connected")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "connected");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_disconnected_after_budget_exhaustion() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_reconnect(&policy(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SupportError::Transport("refused".into())) }
        })
        .await;
        assert!(matches!(result, Err(SupportError::Transport(_))));
        // Initial attempt plus max_attempts retries.
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }
}
