//! Bounded exponential backoff polling.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, timeout, Instant};

/// Exponential backoff schedule with random jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
    /// Extra random delay as a fraction of the base delay.
    pub jitter: f64,
    /// Checks before giving up.
    pub max_attempts: u32,
}

impl Backoff {
    /// Base delay after `attempt` failed checks, capped at `max`.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let millis = (self.initial.as_millis() as f64 * factor).min(self.max.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }

    /// Base delay plus up to `jitter` of it at random.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let range_ms = (base.as_millis() as f64 * self.jitter.clamp(0.0, 1.0)) as u64;
        if range_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=range_ms))
    }
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    /// Every attempt came back empty.
    Exhausted,
    /// The ceiling elapsed before a check succeeded.
    TimedOut,
}

/// Run `check` until it yields a value, attempts run out or `ceiling` elapses.
///
/// `check` receives the zero-based attempt number. With a ceiling, each
/// check only gets the time left before it; a check still running when the
/// ceiling passes is dropped. Sleeps never overshoot the ceiling, and one
/// last check runs when it is reached.
pub async fn poll<T, F, Fut>(backoff: &Backoff, ceiling: Option<Duration>, mut check: F) -> PollOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        let checked = match ceiling {
            Some(ceiling) => {
                let remaining = ceiling.saturating_sub(started.elapsed());
                match timeout(remaining, check(attempt)).await {
                    Ok(checked) => checked,
                    Err(_) => return PollOutcome::TimedOut,
                }
            }
            None => check(attempt).await,
        };
        if let Some(value) = checked {
            return PollOutcome::Ready(value);
        }
        attempt = attempt.saturating_add(1);
        if attempt >= backoff.max_attempts {
            return PollOutcome::Exhausted;
        }

        let mut delay = backoff.delay(attempt - 1);
        if let Some(ceiling) = ceiling {
            let elapsed = started.elapsed();
            if elapsed >= ceiling {
                return PollOutcome::TimedOut;
            }
            delay = delay.min(ceiling - elapsed);
        }
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn schedule(max_attempts: u32) -> Backoff {
        Backoff {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(1_000),
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts,
        }
    }

    #[test]
    fn base_delay_grows_and_caps() {
        let backoff = schedule(10);
        assert_eq!(backoff.base_delay(0), Duration::from_millis(100));
        assert_eq!(backoff.base_delay(1), Duration::from_millis(200));
        assert_eq!(backoff.base_delay(3), Duration::from_millis(800));
        assert_eq!(backoff.base_delay(4), Duration::from_millis(1_000));
        assert_eq!(backoff.base_delay(40), Duration::from_millis(1_000));
    }

    #[test]
    fn jitter_stays_within_fraction() {
        let backoff = Backoff {
            jitter: 0.2,
            ..schedule(10)
        };
        for _ in 0..50 {
            let delay = backoff.delay(1);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(240));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn poll_returns_first_value() {
        let calls = AtomicU32::new(0);
        let outcome = poll(&schedule(10), None, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { (attempt == 2).then_some("ok") }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Ready("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let outcome: PollOutcome<()> = poll(&schedule(4), None, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_stops_at_ceiling() {
        let started = Instant::now();
        let outcome: PollOutcome<()> = poll(&schedule(u32::MAX), Some(Duration::from_secs(3)), |_| async {
            None
        })
        .await;
        assert_eq!(outcome, PollOutcome::TimedOut);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_check_is_cut_off_at_ceiling() {
        let started = Instant::now();
        let outcome: PollOutcome<()> = poll(&schedule(u32::MAX), Some(Duration::from_secs(3)), |_| async {
            sleep(Duration::from_secs(120)).await;
            None
        })
        .await;
        assert_eq!(outcome, PollOutcome::TimedOut);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn ready_check_wins_at_ceiling() {
        let outcome = poll(&schedule(u32::MAX), Some(Duration::ZERO), |_| async { Some(7) }).await;
        assert_eq!(outcome, PollOutcome::Ready(7));
    }
}
