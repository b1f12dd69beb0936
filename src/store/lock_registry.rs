use crate::error::ReplicaError;
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Base delay for the first retry, in nanoseconds (§4.1: "base delay O(10 ns)").
const BASE_DELAY_NS: f64 = 10.0;
/// Growth factor applied to the delay after every failed attempt.
const GROWTH_FACTOR: f64 = 1.1;
/// Jitter fraction applied symmetrically around the computed delay.
const JITTER: f64 = 0.2;
/// Hard cap on retry attempts, independent of the elapsed-time cap below.
const MAX_RETRIES: u32 = 1000;
/// Total wall-clock budget for acquiring one key's lock before giving up.
const MAX_WAIT: Duration = Duration::from_secs(5);

/// A sharded, per-key mutual-exclusion registry keyed by ClientId.
///
/// A global lock would serialize unrelated clients; here the contended unit
/// is exactly one ClientId, so disjoint keys never block each other. Callers
/// that lose the race retry with exponential backoff and jitter rather than
/// blocking indefinitely — `try_acquire` gives up and reports a timeout
/// instead of admitting without accounting (§4.1, §9).
pub struct KeyedLockRegistry<V> {
    locks: DashMap<String, Arc<Mutex<V>>>,
}

impl<V: Default> Default for KeyedLockRegistry<V> {
    fn default() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }
}

impl<V: Default> KeyedLockRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys with a live record. Observability only —
    /// not part of the accounting contract (§4.1).
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    fn mutex_for(&self, key: &str) -> Arc<Mutex<V>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(V::default())))
            .clone()
    }

    /// Attempt to acquire the lock for `key`, retrying with exponential
    /// backoff and jitter until either the lock is obtained or both the
    /// retry count and wall-clock budget are exhausted.
    pub async fn try_acquire(&self, key: &str) -> Result<OwnedMutexGuard<V>, ReplicaError> {
        let mutex = self.mutex_for(key);
        acquire_with_backoff(mutex).await
    }
}

async fn acquire_with_backoff<V>(mutex: Arc<Mutex<V>>) -> Result<OwnedMutexGuard<V>, ReplicaError> {
    let start = Instant::now();
    let mut delay_ns = BASE_DELAY_NS;

    for _ in 0..MAX_RETRIES {
        if let Ok(guard) = mutex.clone().try_lock_owned() {
            return Ok(guard);
        }

        if start.elapsed() >= MAX_WAIT {
            break;
        }

        let jitter_factor = 1.0 + rand::thread_rng().gen_range(-JITTER..=JITTER);
        let sleep_ns = (delay_ns * jitter_factor).max(0.0) as u64;
        tokio::time::sleep(Duration::from_nanos(sleep_ns)).await;
        delay_ns *= GROWTH_FACTOR;
    }

    Err(ReplicaError::LockTimeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disjoint_keys_never_block_each_other() {
        let registry: KeyedLockRegistry<u32> = KeyedLockRegistry::new();
        let guard_a = registry.try_acquire("a").await.unwrap();
        // "b" must acquire immediately even while "a" is held.
        let guard_b = registry.try_acquire("b").await.unwrap();
        drop(guard_a);
        drop(guard_b);
    }

    #[tokio::test]
    async fn same_key_serializes_and_eventually_succeeds() {
        let registry = Arc::new(KeyedLockRegistry::<u32>::new());
        let guard = registry.try_acquire("x").await.unwrap();

        let registry2 = registry.clone();
        let waiter = tokio::spawn(async move { registry2.try_acquire("x").await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);

        let result = waiter.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn len_reflects_distinct_keys_observed() {
        let registry: KeyedLockRegistry<u32> = KeyedLockRegistry::new();
        let _a = registry.try_acquire("a").await.unwrap();
        let _b = registry.try_acquire("b").await.unwrap();
        assert_eq!(registry.len(), 2);
    }
}
