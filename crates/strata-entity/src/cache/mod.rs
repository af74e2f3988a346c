//! Live cache state value objects.

pub mod info;

pub use info::{CacheInfo, PendingEntryInfo};
