//! # strata-service
//!
//! Business logic service layer for Strata. Each service orchestrates the
//! version store, blob storage, and configuration to implement the commit
//! and retention use cases.
//!
//! Services follow constructor injection — all dependencies are provided
//! at construction time via `Arc` references.

pub mod commit;
pub mod retention;

pub use commit::{CommitService, CreateVersionParams, VersionDecision};
pub use retention::{CleanupReport, RetentionService};
