//! # strata-blob
//!
//! Physical payload storage for Strata. Blobs are content-addressed by
//! SHA-256 checksum and laid out in a two-level sharded tree. The
//! [`strata_core::traits::BlobStorage`] trait is implemented for the local
//! filesystem and for memory (single-node deployments and tests).

pub mod compress;
pub mod digest;
pub mod providers;

pub use providers::local::LocalBlobStorage;
pub use providers::memory::MemoryBlobStorage;
