//! # strata-cache
//!
//! The in-memory debounce/batch cache engine. Bursts of rapid edits to the
//! same file are buffered here and collapsed into a single commit through
//! the [`committer::VersionCommitter`] seam once the burst goes quiet (or a
//! hard batch deadline expires).
//!
//! The engine is an explicit instance with a constructor and a shutdown
//! method — inject it where needed; there is no singleton accessor.

pub mod committer;
pub mod engine;
pub mod pending;
pub mod sync;

pub use committer::{CommitRequest, VersionCommitter};
pub use engine::{FlushSummary, QueueVersionParams, VersionCache};
pub use pending::PendingVersion;
pub use sync::SyncVersionCache;
