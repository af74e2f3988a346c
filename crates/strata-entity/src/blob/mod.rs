//! Deduplicated blob entities.

pub mod model;

pub use model::VersionBlob;
