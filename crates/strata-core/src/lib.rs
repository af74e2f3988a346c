//! # strata-core
//!
//! Core crate for Strata, the version-caching layer. Contains the trait
//! seams, configuration schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Strata crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
