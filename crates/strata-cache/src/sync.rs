//! Blocking adapter for callers outside the async runtime.

use std::sync::Arc;

use tokio::runtime::Handle;
use uuid::Uuid;

use strata_core::result::AppResult;
use strata_entity::cache::CacheInfo;
use strata_entity::version::FileVersion;

use crate::engine::{FlushSummary, QueueVersionParams, VersionCache};
use crate::pending::PendingVersion;

/// Synchronous facade over a shared [`VersionCache`].
///
/// Holds a handle to the process's one runtime and blocks the calling
/// thread only until the specific operation completes. Never constructs a
/// runtime of its own — every adapter instance drives the same scheduler
/// the async callers use.
///
/// Must be called from threads that are not themselves running on the
/// runtime; `Handle::block_on` panics inside an async context.
#[derive(Debug, Clone)]
pub struct SyncVersionCache {
    /// The shared engine.
    cache: Arc<VersionCache>,
    /// Handle to the process-wide runtime.
    handle: Handle,
}

impl SyncVersionCache {
    /// Wrap a shared cache with the runtime handle to drive it.
    pub fn new(cache: Arc<VersionCache>, handle: Handle) -> Self {
        Self { cache, handle }
    }

    /// Blocking [`VersionCache::queue_version`].
    pub fn queue_version(&self, params: QueueVersionParams) -> AppResult<()> {
        self.handle.block_on(self.cache.queue_version(params))
    }

    /// Blocking [`VersionCache::flush_version`].
    pub fn flush_version(&self, file_id: Uuid) -> AppResult<Option<FileVersion>> {
        self.handle.block_on(self.cache.flush_version(file_id))
    }

    /// Blocking [`VersionCache::flush_all`].
    pub fn flush_all(&self) -> FlushSummary {
        self.handle.block_on(self.cache.flush_all())
    }

    /// Blocking [`VersionCache::flush_user_versions`].
    pub fn flush_user_versions(&self, owner_id: Uuid) -> FlushSummary {
        self.handle.block_on(self.cache.flush_user_versions(owner_id))
    }

    /// Blocking [`VersionCache::has_pending`].
    pub fn has_pending(&self, file_id: Uuid) -> bool {
        self.handle.block_on(self.cache.has_pending(file_id))
    }

    /// Blocking [`VersionCache::pending_for_file`].
    pub fn pending_for_file(&self, file_id: Uuid) -> Option<PendingVersion> {
        self.handle.block_on(self.cache.pending_for_file(file_id))
    }

    /// Blocking [`VersionCache::pending_count`].
    pub fn pending_count(&self) -> usize {
        self.handle.block_on(self.cache.pending_count())
    }

    /// Blocking [`VersionCache::cache_info`].
    pub fn cache_info(&self) -> CacheInfo {
        self.handle.block_on(self.cache.cache_info())
    }

    /// Blocking [`VersionCache::clear_cache`].
    pub fn clear_cache(&self) -> usize {
        self.handle.block_on(self.cache.clear_cache())
    }
}
