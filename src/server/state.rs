use crate::config::ReplicaConfig;
use crate::gossip::GossipUpdater;
use crate::metrics::Metrics;
use crate::store::AccessStore;
use std::sync::Arc;

/// Shared replica state, cheaply cloneable (§4, §5).
///
/// Composed of the two core components — the `AccessStore` (admission
/// decisions) and the `GossipUpdater` (peer synchronization) — plus the
/// metrics handle and the static config snapshot admin endpoints report.
#[derive(Clone)]
pub struct ReplicaState {
    pub store: Arc<AccessStore>,
    pub updater: Arc<GossipUpdater>,
    pub metrics: Metrics,
    pub config: Arc<ReplicaConfig>,
}

impl ReplicaState {
    pub fn new(config: ReplicaConfig) -> (Self, tokio::sync::mpsc::Receiver<crate::gossip::Submission>) {
        let store = Arc::new(AccessStore::new(config.window(), config.threshold));
        let (updater, submit_rx) = GossipUpdater::new(config.peers.clone(), config.channel_depth);
        let metrics = Metrics::install();

        let state = Self {
            store,
            updater,
            metrics,
            config: Arc::new(config),
        };
        (state, submit_rx)
    }
}
