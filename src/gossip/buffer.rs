use super::digest::{AccessEntry, PeerDigest};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Per-interval accumulation of local admissions, owned by the updater (§3, §4.2).
///
/// For a given ClientId within one interval, retains `(max timestamp seen, sum
/// of counts)`. Cleared atomically at each broadcast by swapping in a fresh,
/// empty buffer (`take`).
#[derive(Debug, Default)]
pub struct UpdateBuffer {
    entries: HashMap<String, (DateTime<Utc>, u32)>,
}

impl UpdateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one local admission for `client_id` at `timestamp`.
    pub fn record(&mut self, client_id: &str, timestamp: DateTime<Utc>) {
        let slot = self
            .entries
            .entry(client_id.to_string())
            .or_insert((timestamp, 0));
        if timestamp > slot.0 {
            slot.0 = timestamp;
        }
        slot.1 += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Atomically take the current contents, leaving an empty buffer behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn into_digest(self) -> PeerDigest {
        let entries = self
            .entries
            .into_iter()
            .map(|(client_id, (timestamp, count))| AccessEntry::new(client_id, timestamp, count))
            .collect();
        PeerDigest::from_entries(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_same_client_within_one_interval() {
        let mut buf = UpdateBuffer::new();
        let t1 = DateTime::from_timestamp(100, 0).unwrap();
        let t2 = DateTime::from_timestamp(101, 0).unwrap();

        buf.record("a", t1);
        buf.record("a", t2);
        buf.record("b", t1);

        let digest = buf.into_digest();
        assert_eq!(digest.len(), 2);
        let a = digest.entries().find(|e| e.client_id() == "a").unwrap();
        assert_eq!(a.count(), 2);
        assert_eq!(a.last_request(), t2);
    }

    #[test]
    fn take_clears_the_buffer() {
        let mut buf = UpdateBuffer::new();
        buf.record("a", Utc::now());
        let taken = buf.take();
        assert!(buf.is_empty());
        assert!(!taken.is_empty());
    }
}
