use super::lock_registry::KeyedLockRegistry;
use super::record::AccessRecord;
use crate::gossip::digest::PeerDigest;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Outcome of an admit decision (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Deny,
    /// The per-key lock could not be acquired within the retry horizon.
    /// Treated as throttled at the gateway boundary (§7, conservative:
    /// deny rather than admit without accounting).
    Transient,
}

/// Per-client sliding-window counters with per-key mutual exclusion (§3, §4.1).
///
/// Records are created lazily and never evicted in this design (§9) — see
/// `SPEC_FULL.md` for the idle-eviction sweep a production deployment would add.
pub struct AccessStore {
    records: KeyedLockRegistry<AccessRecord>,
    window: Duration,
    threshold: u64,
}

impl AccessStore {
    pub fn new(window: Duration, threshold: u64) -> Self {
        Self {
            records: KeyedLockRegistry::new(),
            window,
            threshold,
        }
    }

    /// Number of distinct ClientIds currently tracked. Observability only.
    pub fn tracked_clients(&self) -> usize {
        self.records.len()
    }

    /// Decide admission for a single local request and, on admit, record the event.
    pub async fn admit(&self, client_id: &str) -> Decision {
        let now = Utc::now();

        let mut guard = match self.records.try_acquire(client_id).await {
            Ok(guard) => guard,
            Err(_) => {
                debug!("store: admit: lock timeout, client_id={}", client_id);
                return Decision::Transient;
            }
        };

        if guard.events.is_empty() {
            if self.threshold == 0 {
                debug!(
                    "store: admit: deny, client_id={}, threshold=0",
                    client_id
                );
                return Decision::Deny;
            }
            *guard = AccessRecord::single(now, 1);
            debug!("store: admit: first observation, client_id={}", client_id);
            return Decision::Admit;
        }

        guard.trim(now, self.window);

        if guard.in_window_count >= self.threshold {
            debug!(
                "store: admit: deny, client_id={}, in_window_count={}, threshold={}",
                client_id, guard.in_window_count, self.threshold
            );
            return Decision::Deny;
        }

        guard.push(now, 1);
        debug!(
            "store: admit: admit, client_id={}, in_window_count={}",
            client_id, guard.in_window_count
        );
        Decision::Admit
    }

    /// Apply a batch of remote updates without making admission decisions for
    /// them (§4.1). Entries whose lock cannot be acquired are skipped silently
    /// — the update is lost for that client this round (§9).
    pub async fn merge(&self, digest: PeerDigest) {
        for entry in digest.entries() {
            let (client_id, timestamp, count): (&str, DateTime<Utc>, u32) =
                (entry.client_id(), entry.last_request(), entry.count());

            let mut guard = match self.records.try_acquire(client_id).await {
                Ok(guard) => guard,
                Err(_) => {
                    debug!(
                        "store: merge: lock timeout, dropping entry, client_id={}",
                        client_id
                    );
                    continue;
                }
            };

            if guard.events.is_empty() {
                *guard = AccessRecord::single(timestamp, count);
            } else {
                guard.push(timestamp, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gossip::digest::{AccessEntry, PeerDigest};

    #[tokio::test]
    async fn p2_threshold_enforcement_single_replica() {
        let store = AccessStore::new(Duration::from_secs(60), 3);
        let mut admits = 0;
        let mut denies = 0;
        for _ in 0..4 {
            match store.admit("client-a").await {
                Decision::Admit => admits += 1,
                Decision::Deny => denies += 1,
                Decision::Transient => panic!("unexpected transient"),
            }
        }
        assert_eq!(admits, 3);
        assert_eq!(denies, 1);
    }

    #[tokio::test]
    async fn t_zero_denies_everything() {
        let store = AccessStore::new(Duration::from_secs(60), 0);
        // First-ever observation of this client must also be denied.
        assert_eq!(store.admit("client-a").await, Decision::Deny);
        // And it stays denied on subsequent calls.
        assert_eq!(store.admit("client-a").await, Decision::Deny);
    }

    #[tokio::test]
    async fn p4_per_key_isolation() {
        let store = AccessStore::new(Duration::from_secs(60), 1);
        assert_eq!(store.admit("a").await, Decision::Admit);
        assert_eq!(store.admit("a").await, Decision::Deny);
        // Client "b" is unaffected by "a" exceeding its threshold.
        assert_eq!(store.admit("b").await, Decision::Admit);
    }

    #[tokio::test]
    async fn p1_count_consistency_after_merge() {
        let store = AccessStore::new(Duration::from_secs(60), 100);
        store.admit("a").await;
        store.admit("a").await;

        let digest = PeerDigest::from_entries(vec![AccessEntry::new(
            "a".to_string(),
            Utc::now(),
            5,
        )]);
        store.merge(digest).await;

        let mut guard = store.records.try_acquire("a").await.unwrap();
        let sum: u64 = guard.events.iter().map(|e| e.count as u64).sum();
        assert_eq!(sum, guard.in_window_count);
        assert_eq!(guard.in_window_count, 7);
        guard.events.clear();
    }

    #[tokio::test]
    async fn p5_merge_commutativity_for_disjoint_clients() {
        let store_a = AccessStore::new(Duration::from_secs(60), 100);
        let store_b = AccessStore::new(Duration::from_secs(60), 100);

        let now = Utc::now();
        let d1 = PeerDigest::from_entries(vec![AccessEntry::new("x".into(), now, 2)]);
        let d2 = PeerDigest::from_entries(vec![AccessEntry::new("y".into(), now, 3)]);

        store_a.merge(d1.clone()).await;
        store_a.merge(d2.clone()).await;

        store_b.merge(d2).await;
        store_b.merge(d1).await;

        let a_x = store_a.records.try_acquire("x").await.unwrap().in_window_count;
        let a_y = store_a.records.try_acquire("y").await.unwrap().in_window_count;
        let b_x = store_b.records.try_acquire("x").await.unwrap().in_window_count;
        let b_y = store_b.records.try_acquire("y").await.unwrap().in_window_count;

        assert_eq!(a_x, b_x);
        assert_eq!(a_y, b_y);
    }

    #[tokio::test]
    async fn p6_concurrent_admits_same_key_serialize() {
        use std::sync::Arc;

        let store = Arc::new(AccessStore::new(Duration::from_secs(60), 1000));
        let mut handles = Vec::new();
        for _ in 0..100 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.admit("hot-key").await },
            ));
        }

        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() == Decision::Admit {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 100);

        let guard = store.records.try_acquire("hot-key").await.unwrap();
        assert_eq!(guard.in_window_count, 100);
        assert_eq!(guard.events.len(), 100);
    }

    #[tokio::test]
    async fn scenario_3_denied_requests_not_recorded() {
        // W=10s, T=2. Using direct record manipulation via admit isn't
        // time-travel friendly, so this test drives the record through
        // trim/push directly to assert the documented end state.
        let store = AccessStore::new(Duration::from_secs(10), 2);
        assert_eq!(store.admit("c").await, Decision::Admit);
        assert_eq!(store.admit("c").await, Decision::Admit);
        assert_eq!(store.admit("c").await, Decision::Deny);

        let guard = store.records.try_acquire("c").await.unwrap();
        // Exactly two retained events — the denied request added nothing.
        assert_eq!(guard.events.len(), 2);
        assert_eq!(guard.in_window_count, 2);
    }
}
