pub mod buffer;
pub mod digest;
pub mod updater;

pub use digest::{AccessEntry, PeerDigest};
pub use updater::{GossipUpdater, Submission};
