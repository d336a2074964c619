//! Retry policy with per-attempt recovery hooks.
//!
//! Tunnel creation races the provider's per-account quota; the dominant
//! failure mode is self-inflicted (abandoned sessions holding tunnels
//! open) and mechanically fixable by evicting inactive tunnels. The
//! policy keeps the retry budget and the recovery action as separate,
//! independently testable pieces.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Decision taken after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Retry after backoff, no side effects first.
    Retry,
    /// Run the recovery action, then retry after backoff.
    RetryAfterRecovery,
    /// Stop immediately and surface the error.
    Fail,
}

/// Bounded retry with exponential backoff between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(4),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// `classify` inspects each failure; `recover` runs before the next
    /// attempt when the classification asks for it. The recovery action
    /// handles its own failures; a failed recovery still leads to a
    /// retry. Exhausting the budget surfaces the last error.
    pub async fn run<T, E, Op, Fut, Classify, Rec, RecFut>(
        &self,
        mut operation: Op,
        mut classify: Classify,
        mut recover: Rec,
    ) -> Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classify: FnMut(&E) -> Recovery,
        Rec: FnMut() -> RecFut,
        RecFut: Future<Output = ()>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= self.max_attempts {
                        return Err(error);
                    }
                    match classify(&error) {
                        Recovery::Fail => return Err(error),
                        Recovery::Retry => {}
                        Recovery::RetryAfterRecovery => recover().await,
                    }
                    debug!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying after failed attempt"
                    );
                    sleep(backoff).await;
                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
            multiplier: 2.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_spending_budget() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let result: Result<u32, &str> = fast_policy()
            .run(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(7) }
                },
                |_| Recovery::Retry,
                || async {},
            )
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_runs_only_when_classified() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let recoveries = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&attempts);
        let r = Arc::clone(&recoveries);

        let result: Result<u32, &str> = fast_policy()
            .run(
                move || {
                    let n = a.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err("quota")
                        } else {
                            Ok(1)
                        }
                    }
                },
                |error| {
                    if *error == "quota" {
                        Recovery::RetryAfterRecovery
                    } else {
                        Recovery::Retry
                    }
                },
                move || {
                    r.fetch_add(1, Ordering::SeqCst);
                    async {}
                },
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(recoveries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_surfaces_last_error() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let result: Result<u32, String> = fast_policy()
            .run(
                move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Err(format!("failure {n}")) }
                },
                |_| Recovery::Retry,
                || async {},
            )
            .await;

        assert_eq!(result.unwrap_err(), "failure 3");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fail_classification_stops_early() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let result: Result<u32, &str> = fast_policy()
            .run(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err("fatal") }
                },
                |_| Recovery::Fail,
                || async {},
            )
            .await;

        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
