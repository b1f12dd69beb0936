use serde::{Deserialize, Serialize};

/// On-disk / environment-overridable configuration for a replica (§6, §4.5).
///
/// Loadable from TOML or JSON; a missing file is not an error — built-in
/// defaults apply so the replica can start with zero configuration for local
/// development. An empty peer list is valid and simply disables gossip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicaConfig {
    /// Address the admit/gossip listener binds to.
    pub listen: String,
    /// Address the admin listener (health/readiness/metrics) binds to.
    pub admin_listen: String,
    /// Window `W`, in seconds, over which the threshold applies.
    pub window_secs: u64,
    /// Threshold `T`: maximum admitted events per client per window.
    pub threshold: u64,
    /// Static list of peer `host:port` addresses (bare, no scheme — §9).
    pub peers: Vec<String>,
    /// Broadcast interval `I`, in seconds.
    pub broadcast_interval_secs: u64,
    /// Maximum buffered local admissions per interval (`Q`).
    pub channel_depth: usize,
    /// Print debug-level logs.
    pub verbose: bool,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            admin_listen: "0.0.0.0:9091".to_string(),
            window_secs: 60,
            threshold: 500,
            peers: Vec::new(),
            broadcast_interval_secs: 5,
            channel_depth: 1000,
            verbose: false,
        }
    }
}

impl ReplicaConfig {
    pub fn window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.window_secs)
    }

    pub fn broadcast_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.broadcast_interval_secs)
    }
}

/// Configuration for the load-generating client simulator (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSimConfig {
    /// Address of the replica's admit endpoint, e.g. `http://localhost:8080/foo`.
    pub server_addr: String,
    /// Number of concurrently simulated clients.
    pub num_clients: u32,
    /// Maximum distinct ClientId — simulated clients are assigned
    /// `i % max_client_id`, so several simulated tasks can share one id.
    pub max_client_id: u32,
    pub verbose: bool,
}

impl Default for ClientSimConfig {
    fn default() -> Self {
        Self {
            server_addr: "http://localhost:8080/foo".to_string(),
            num_clients: 100,
            max_client_id: i32::MAX as u32,
            verbose: false,
        }
    }
}
