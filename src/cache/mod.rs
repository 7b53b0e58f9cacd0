//! Local order cache: pure merge rules, the owning service and durable storage.

pub mod merge;
pub mod service;
pub mod store;

pub use merge::apply_status;
pub use service::{CacheClient, CacheService};
pub use store::{JsonFile, JsonFileStore, OrderStore};
