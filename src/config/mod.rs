pub mod types;


pub use types::{ClientSimConfig, ReplicaConfig};

use anyhow::Result;
use std::path::Path;

impl ReplicaConfig {
    /// Load configuration from a file (if it exists), then apply environment
    /// variable overrides. When the file does not exist, built-in defaults
    /// are used — allowing the replica to start with zero configuration for
    /// local development (§4.5).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: ReplicaConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                Some(ext) => anyhow::bail!("unsupported config format: .{ext}, use .toml or .json"),
                None => anyhow::bail!("config file has no extension, use .toml or .json"),
            }
        } else {
            tracing::info!(
                "config file not found at {}, using defaults",
                path.display()
            );
            ReplicaConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!("loaded replica configuration");
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RATE_LIMITER_LISTEN") {
            self.listen = v;
        }
        if let Ok(v) = std::env::var("RATE_LIMITER_ADMIN_LISTEN") {
            self.admin_listen = v;
        }
        if let Ok(v) = std::env::var("RATE_LIMITER_WINDOW_SECS") {
            if let Ok(n) = v.parse() {
                self.window_secs = n;
            }
        }
        if let Ok(v) = std::env::var("RATE_LIMITER_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.threshold = n;
            }
        }
        if let Ok(v) = std::env::var("RATE_LIMITER_PEERS") {
            self.peers = split_peers(&v);
        }
        if let Ok(v) = std::env::var("RATE_LIMITER_BROADCAST_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.broadcast_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("RATE_LIMITER_CHANNEL_DEPTH") {
            if let Ok(n) = v.parse() {
                self.channel_depth = n;
            }
        }
        if let Ok(v) = std::env::var("RATE_LIMITER_VERBOSE") {
            self.verbose = v == "true" || v == "1";
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            anyhow::bail!("window_secs must be a positive integer");
        }
        for peer in &self.peers {
            if peer.starts_with("http://") || peer.starts_with("https://") {
                anyhow::bail!(
                    "peer address must not be pre-qualified with a scheme: {}",
                    peer
                );
            }
        }
        Ok(())
    }
}

/// Parse a comma-delimited peer list, trimming whitespace and dropping empty
/// entries (an empty/blank `--peers` flag must yield an empty list, not a
/// list containing one empty string).
pub fn split_peers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
