use std::fmt;

/// Error taxonomy for the replica. Request-scoped variants are converted to
/// responses at the gateway and never propagate further (§7); `Config` and
/// `Internal` are bootstrap-time or background-task errors.
#[derive(Debug)]
#[allow(dead_code)]
pub enum ReplicaError {
    /// Missing or duplicate `clientId` query parameter.
    MissingClientId,
    /// Gossip body was not valid JSON in the authoritative shape.
    MalformedGossipBody(String),
    /// Per-key lock could not be acquired within the retry horizon.
    LockTimeout,
    /// A peer broadcast failed (timeout, transport error, non-success status).
    PeerSendFailure { peer: String, reason: String },
    Config(String),
    Internal(String),
}

impl fmt::Display for ReplicaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaError::MissingClientId => write!(f, "missing or duplicate clientId parameter"),
            ReplicaError::MalformedGossipBody(msg) => write!(f, "malformed gossip body: {}", msg),
            ReplicaError::LockTimeout => write!(f, "per-key lock timeout"),
            ReplicaError::PeerSendFailure { peer, reason } => {
                write!(f, "peer send failure, peer={}, reason={}", peer, reason)
            }
            ReplicaError::Config(msg) => write!(f, "config error: {}", msg),
            ReplicaError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ReplicaError {}
