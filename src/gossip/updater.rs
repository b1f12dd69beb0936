use super::buffer::UpdateBuffer;
use super::digest::PeerDigest;
use crate::store::AccessStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, warn};

/// One local-admission notification, as submitted by the access store (§4.2).
pub struct Submission {
    client_id: String,
    timestamp: DateTime<Utc>,
}

/// Accumulates local admissions for one broadcast interval and fans them out
/// to configured peers; also ingests inbound peer digests and hands them to
/// the access store (§4.2).
///
/// The local-buffer mutation and the broadcast-and-reset are serialized by a
/// single mutex on the updater. The concurrent per-peer sends happen after
/// the buffer has been taken, so they never hold that mutex (§4.2, §5).
pub struct GossipUpdater {
    buffer: Mutex<UpdateBuffer>,
    submit_tx: mpsc::Sender<Submission>,
    peers: Vec<String>,
    http: reqwest::Client,
}

impl GossipUpdater {
    /// Build the updater and the receiving half of its local-admission
    /// channel. The caller spawns `run_consumer` and `run_broadcaster` once,
    /// from bootstrap.
    pub fn new(
        peers: Vec<String>,
        channel_depth: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Submission>) {
        let (submit_tx, submit_rx) = mpsc::channel(channel_depth);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("failed to build peer HTTP client");

        let updater = Arc::new(Self {
            buffer: Mutex::new(UpdateBuffer::new()),
            submit_tx,
            peers,
            http,
        });
        (updater, submit_rx)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Non-blocking submission of a local admit. If the channel is saturated
    /// the submission is dropped — the admit is already recorded locally;
    /// the only loss is peer visibility of this one admit (§4.2).
    pub fn submit(&self, client_id: &str, timestamp: DateTime<Utc>) {
        let submission = Submission {
            client_id: client_id.to_string(),
            timestamp,
        };
        if self.submit_tx.try_send(submission).is_err() {
            debug!(
                "gossip: submission dropped, channel saturated, client_id={}",
                client_id
            );
        }
    }

    /// Drain local-admission notifications into the buffer until the channel
    /// closes or `shutdown` fires.
    pub async fn run_consumer(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<Submission>,
        shutdown: Arc<Notify>,
    ) {
        loop {
            tokio::select! {
                submission = rx.recv() => {
                    match submission {
                        Some(s) => {
                            let mut buffer = self.buffer.lock().await;
                            buffer.record(&s.client_id, s.timestamp);
                        }
                        None => return,
                    }
                }
                _ = shutdown.notified() => return,
            }
        }
    }

    /// Timer-driven broadcast loop: wait `interval`, take the buffer, and
    /// fan the digest out to every configured peer concurrently (§4.2).
    pub async fn run_broadcaster(self: Arc<Self>, interval: Duration, shutdown: Arc<Notify>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.notified() => return,
            }
            self.broadcast_tick().await;
        }
    }

    /// Take the current buffer and fan it out to peers. Exposed so tests can
    /// trigger a broadcast deterministically instead of waiting on the timer;
    /// `run_broadcaster` calls this on every tick.
    pub async fn broadcast_tick(&self) {
        let taken = {
            let mut buffer = self.buffer.lock().await;
            buffer.take()
        };

        if taken.is_empty() {
            return;
        }

        let digest = taken.into_digest();
        metrics::histogram!("rate_limiter_gossip_broadcast_entries").record(digest.len() as f64);

        let sends = self.peers.iter().map(|peer| self.send_to_peer(peer, &digest));
        futures_util::future::join_all(sends).await;
    }

    async fn send_to_peer(&self, peer: &str, digest: &PeerDigest) {
        let url = peer_update_url(peer);
        let result = self.http.post(&url).json(digest).send().await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!(
                    "gossip: sent digest, peer={}, entries={}",
                    peer,
                    digest.len()
                );
                metrics::counter!(
                    "rate_limiter_gossip_sent_total",
                    "peer" => peer.to_string(),
                    "result" => "success",
                )
                .increment(1);
            }
            Ok(resp) => {
                warn!(
                    "gossip: peer returned non-success, peer={}, status={}",
                    peer,
                    resp.status()
                );
                metrics::counter!(
                    "rate_limiter_gossip_sent_total",
                    "peer" => peer.to_string(),
                    "result" => "non_success",
                )
                .increment(1);
            }
            Err(e) if e.is_timeout() => {
                warn!("gossip: peer send timed out, peer={}", peer);
                metrics::counter!(
                    "rate_limiter_gossip_sent_total",
                    "peer" => peer.to_string(),
                    "result" => "timeout",
                )
                .increment(1);
            }
            Err(e) => {
                warn!("gossip: peer send failed, peer={}, error={}", peer, e);
                metrics::counter!(
                    "rate_limiter_gossip_sent_total",
                    "peer" => peer.to_string(),
                    "result" => "error",
                )
                .increment(1);
            }
        }
    }

    /// Ingest an inbound peer digest, handing it to the access store (§4.2).
    pub async fn ingest(&self, store: &AccessStore, digest: PeerDigest) {
        store.merge(digest).await;
    }
}

/// Peer addresses are bare `host:port`; this prepends the transport scheme.
/// Addresses must not be pre-qualified in configuration (§9).
fn peer_update_url(peer: &str) -> String {
    if peer.starts_with("http://") || peer.starts_with("https://") {
        format!("{}/updates", peer.trim_end_matches('/'))
    } else {
        format!("http://{}/updates", peer.trim_end_matches('/'))
    }
}
