//! Single-flight execution keyed by request source.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

/// What asked for a cached value to be re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshTrigger {
    /// Explicit user or operator request.
    Manual,
    /// A transaction affecting the value was confirmed.
    Confirmation,
    /// Delayed re-read after a confirmation.
    FollowUp,
    /// Backoff polling while waiting for a value to settle.
    Poller,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Confirmation => "confirmation",
            Self::FollowUp => "follow-up",
            Self::Poller => "poller",
        })
    }
}

type Flight<T> = Shared<BoxFuture<'static, T>>;

/// Concurrent calls with the same key share one in-flight future.
///
/// The entry is removed once the shared future resolves, so the next call
/// after completion starts a fresh run.
pub struct SingleFlight<K, T: Clone> {
    flights: Mutex<HashMap<K, (u64, Flight<T>)>>,
    next_id: AtomicU64,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run `start()` unless a run for `key` is already in flight, in which
    /// case wait for and share its result.
    pub async fn run<F, Fut>(&self, key: K, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (id, flight) = {
            let mut flights = self.flights.lock();
            match flights.get(&key) {
                Some((id, flight)) => (*id, flight.clone()),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let flight = start().boxed().shared();
                    flights.insert(key.clone(), (id, flight.clone()));
                    (id, flight)
                }
            }
        };

        let output = flight.await;

        let mut flights = self.flights.lock();
        if flights.get(&key).is_some_and(|(current, _)| *current == id) {
            flights.remove(&key);
        }
        output
    }

    /// Whether a run for `key` is currently in flight.
    #[must_use]
    pub fn is_running(&self, key: &K) -> bool {
        self.flights.lock().contains_key(key)
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn concurrent_calls_share_one_run() {
        let flights = Arc::new(SingleFlight::<RefreshTrigger, u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let flights = flights.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                flights
                    .run(RefreshTrigger::Manual, move || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        7
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!flights.is_running(&RefreshTrigger::Manual));
    }

    #[tokio::test(start_paused = true)]
    async fn different_keys_run_independently() {
        let flights = Arc::new(SingleFlight::<RefreshTrigger, u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let a = {
            let runs = runs.clone();
            flights.run(RefreshTrigger::Manual, move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                1
            })
        };
        let b = {
            let runs = runs.clone();
            flights.run(RefreshTrigger::Confirmation, move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                2
            })
        };

        let (a, b) = tokio::join!(a, b);
        assert_eq!((a, b), (1, 2));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn completed_key_starts_fresh() {
        let flights = SingleFlight::<u8, u32>::new();
        assert_eq!(flights.run(1, || async { 10 }).await, 10);
        assert_eq!(flights.run(1, || async { 20 }).await, 20);
    }
}
