//! Storage type and change type enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a version's payload is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "storage_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// This version owns new physical bytes in the blob store.
    Stored,
    /// This version reuses an existing blob via its checksum.
    Reference,
}

impl StorageType {
    /// Whether this version contributes stored bytes to the owner's quota.
    pub fn counts_against_quota(&self) -> bool {
        matches!(self, Self::Stored)
    }

    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of write produced a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "change_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// First version of a new file.
    Create,
    /// Direct single update.
    Update,
    /// Full overwrite of existing content.
    Overwrite,
    /// Collapsed from a burst of edits by the debounce cache.
    Batched,
}

impl ChangeType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Overwrite => "overwrite",
            Self::Batched => "batched",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
