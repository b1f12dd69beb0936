pub mod access_store;
pub mod lock_registry;
pub mod record;

pub use access_store::{AccessStore, Decision};
pub use record::{AccessEvent, AccessRecord};
