//! File version entities and enums.

pub mod kind;
pub mod model;

pub use kind::{ChangeType, StorageType};
pub use model::{FileVersion, NewVersion};
