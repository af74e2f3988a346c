//! # strata-entity
//!
//! Domain entity models for Strata. Every struct in this crate represents
//! a database table row or a domain value object. All entities derive
//! `Debug`, `Clone`, `Serialize`, `Deserialize`, and database entities
//! additionally derive `sqlx::FromRow`.

pub mod blob;
pub mod cache;
pub mod settings;
pub mod version;
