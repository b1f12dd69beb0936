use chrono::{DateTime, Utc};
use std::time::Duration;

/// One or more requests coalesced at a single timestamp (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessEvent {
    pub timestamp: DateTime<Utc>,
    pub count: u32,
}

/// Per-client sliding-window state. `events` is kept in insertion order,
/// which coincides with chronological order for locally generated events;
/// peer merges are appended without reordering (§4.1).
#[derive(Debug, Clone, Default)]
pub struct AccessRecord {
    pub events: Vec<AccessEvent>,
    pub in_window_count: u64,
}

impl AccessRecord {
    pub fn single(timestamp: DateTime<Utc>, count: u32) -> Self {
        Self {
            events: vec![AccessEvent { timestamp, count }],
            in_window_count: count as u64,
        }
    }

    /// Drop events whose window has fully elapsed as of `now`: while the
    /// oldest event's `timestamp + window <= now`, subtract its count and
    /// remove it. The window is half-open, so an event at exactly
    /// `now - window` is stale (§4.1 step 4, "ties at the boundary").
    pub fn trim(&mut self, now: DateTime<Utc>, window: Duration) {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero());
        let mut drop = 0;
        for event in &self.events {
            if event.timestamp + window <= now {
                self.in_window_count = self.in_window_count.saturating_sub(event.count as u64);
                drop += 1;
            } else {
                break;
            }
        }
        if drop > 0 {
            self.events.drain(..drop);
        }
    }

    /// Append a new local admission, already assumed accounted for by the caller.
    pub fn push(&mut self, timestamp: DateTime<Utc>, count: u32) {
        self.events.push(AccessEvent { timestamp, count });
        self.in_window_count += count as u64;
    }
}
