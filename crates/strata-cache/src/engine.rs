//! The debounce/batch cache engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use strata_blob::digest::sha256_hex;
use strata_core::config::cache::CacheConfig;
use strata_core::error::AppError;
use strata_core::result::AppResult;
use strata_entity::cache::{CacheInfo, PendingEntryInfo};
use strata_entity::version::{ChangeType, FileVersion};

use crate::committer::{CommitRequest, VersionCommitter};
use crate::pending::PendingVersion;

/// Parameters for queueing one write into the cache.
#[derive(Debug, Clone)]
pub struct QueueVersionParams {
    /// The file being written.
    pub file_id: Uuid,
    /// User who owns the write.
    pub owner_id: Uuid,
    /// The new content.
    pub content: Bytes,
    /// Precomputed checksum; computed on the spot when absent.
    pub checksum: Option<String>,
    /// Protect the eventual version from retention sweeps.
    pub is_high_priority: bool,
    /// Optional comment describing the change.
    pub comment: Option<String>,
    /// Per-call debounce window; the owner's settings apply when absent.
    pub debounce_window: Option<Duration>,
    /// Per-call batch cap; the owner's settings apply when absent.
    pub max_batch_window: Option<Duration>,
}

impl QueueVersionParams {
    /// A plain write with no overrides.
    pub fn new(file_id: Uuid, owner_id: Uuid, content: Bytes) -> Self {
        Self {
            file_id,
            owner_id,
            content,
            checksum: None,
            is_high_priority: false,
            comment: None,
            debounce_window: None,
            max_batch_window: None,
        }
    }
}

/// Outcome counts of a bulk flush.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlushSummary {
    /// Entries committed successfully.
    pub committed: usize,
    /// Entries whose commit failed (logged, not propagated).
    pub failed: usize,
}

/// Mutable cache state. Everything here is guarded by one mutex scoped to
/// the whole cache: `queue_version`, bulk flushes, and the timer callbacks
/// all read and write the same maps.
#[derive(Debug, Default)]
struct CacheInner {
    /// Pending entry per file.
    entries: HashMap<Uuid, PendingVersion>,
    /// Live debounce timer per file, replaced on every queue.
    debounce_timers: HashMap<Uuid, JoinHandle<()>>,
    /// Hard-deadline timer per file, armed once per entry lifetime.
    deadline_timers: HashMap<Uuid, JoinHandle<()>>,
}

/// The debounce/batch cache.
///
/// Buffers the newest content per file and commits it through the
/// [`VersionCommitter`] once the file has been idle for its debounce
/// window, or unconditionally once the batch window since the first
/// buffered write expires. Only the last buffered content of a burst is
/// ever committed.
///
/// A commit failure after the entry has left the map loses the buffered
/// edit; a `CommitFailed` error in the log means exactly one lost burst.
/// The one exception is a quota rejection, which re-inserts the entry so
/// the caller can run cleanup and retry.
#[derive(Debug, Clone)]
pub struct VersionCache {
    /// Shared mutable state.
    inner: Arc<Mutex<CacheInner>>,
    /// Commit seam.
    committer: Arc<dyn VersionCommitter>,
    /// Engine knobs.
    config: CacheConfig,
}

impl VersionCache {
    /// Create a new cache engine over the given committer.
    pub fn new(committer: Arc<dyn VersionCommitter>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            committer,
            config,
        }
    }

    /// Register or update the pending entry for a file and (re)schedule
    /// its flush.
    ///
    /// Returns after the map mutation — or after a synchronous commit when
    /// the entry has already been buffered for its whole batch window.
    pub async fn queue_version(&self, params: QueueVersionParams) -> AppResult<()> {
        if params.content.len() as u64 > self.config.max_payload_bytes {
            return Err(AppError::validation(format!(
                "Payload of {} bytes exceeds the cache ceiling of {} bytes",
                params.content.len(),
                self.config.max_payload_bytes
            )));
        }

        // Resolve windows before taking the lock; the settings lookup may
        // hit the database and must not stall other files.
        let (debounce_window, max_batch_window) =
            match (params.debounce_window, params.max_batch_window) {
                (Some(debounce), Some(batch)) => (debounce, batch),
                (debounce, batch) => {
                    let settings = self.committer.settings_for(params.owner_id).await?;
                    (
                        debounce.unwrap_or(Duration::from_secs(
                            settings.debounce_window_seconds.max(0) as u64,
                        )),
                        batch.unwrap_or(Duration::from_secs(
                            settings.max_batch_window_seconds.max(0) as u64,
                        )),
                    )
                }
            };

        let checksum = match params.checksum {
            Some(checksum) => checksum,
            None => sha256_hex(&params.content),
        };
        let now = Instant::now();

        let hard_capped = {
            let mut inner = self.inner.lock().await;
            match inner.entries.get_mut(&params.file_id) {
                Some(entry) => {
                    entry.content = params.content;
                    entry.checksum = checksum;
                    entry.last_modified = now;
                    entry.is_high_priority |= params.is_high_priority;
                    if let Some(comment) = params.comment.filter(|c| !c.is_empty()) {
                        entry.comment = Some(comment);
                    }
                    entry.debounce_window = debounce_window;
                    entry.max_batch_window = max_batch_window;
                    entry.time_in_cache(now) >= entry.max_batch_window
                }
                None => {
                    inner.entries.insert(
                        params.file_id,
                        PendingVersion {
                            file_id: params.file_id,
                            owner_id: params.owner_id,
                            content: params.content,
                            checksum,
                            is_high_priority: params.is_high_priority,
                            comment: params.comment.filter(|c| !c.is_empty()),
                            first_modified: now,
                            last_modified: now,
                            debounce_window,
                            max_batch_window,
                        },
                    );
                    let deadline = self.spawn_deadline_timer(params.file_id, now, max_batch_window);
                    if let Some(stale) = inner.deadline_timers.insert(params.file_id, deadline) {
                        stale.abort();
                    }
                    false
                }
            }
        };

        if hard_capped {
            debug!(file_id = %params.file_id, "Batch window exhausted, committing synchronously");
            self.flush_entry(params.file_id).await?;
            return Ok(());
        }

        self.schedule_flush(params.file_id, debounce_window).await;
        Ok(())
    }

    /// Force-commit a specific file's pending entry immediately.
    ///
    /// A file with nothing pending is a no-op (`Ok(None)`).
    pub async fn flush_version(&self, file_id: Uuid) -> AppResult<Option<FileVersion>> {
        self.flush_entry(file_id).await
    }

    /// Commit every pending entry, continuing past individual failures.
    ///
    /// Used on process shutdown; per-file errors are logged, never
    /// propagated, and every file is attempted.
    pub async fn flush_all(&self) -> FlushSummary {
        let file_ids: Vec<Uuid> = self.inner.lock().await.entries.keys().copied().collect();
        let summary = self.flush_many(&file_ids).await;
        info!(
            committed = summary.committed,
            failed = summary.failed,
            "Flushed all pending versions"
        );
        summary
    }

    /// Commit only the pending entries owned by one user.
    ///
    /// Used on logout; other users' entries stay untouched.
    pub async fn flush_user_versions(&self, owner_id: Uuid) -> FlushSummary {
        let file_ids: Vec<Uuid> = self
            .inner
            .lock()
            .await
            .entries
            .values()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.file_id)
            .collect();
        let summary = self.flush_many(&file_ids).await;
        info!(
            owner_id = %owner_id,
            committed = summary.committed,
            failed = summary.failed,
            "Flushed user's pending versions"
        );
        summary
    }

    /// Whether a file currently has a buffered edit.
    pub async fn has_pending(&self, file_id: Uuid) -> bool {
        self.inner.lock().await.entries.contains_key(&file_id)
    }

    /// Snapshot of a file's pending entry, if any.
    pub async fn pending_for_file(&self, file_id: Uuid) -> Option<PendingVersion> {
        self.inner.lock().await.entries.get(&file_id).cloned()
    }

    /// Number of files with buffered edits.
    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Aggregate statistics over the pending map, oldest entry first.
    pub async fn cache_info(&self) -> CacheInfo {
        let inner = self.inner.lock().await;
        let now = Instant::now();

        let mut entries: Vec<PendingEntryInfo> = inner
            .entries
            .values()
            .map(|entry| PendingEntryInfo {
                file_id: entry.file_id,
                owner_id: entry.owner_id,
                age_seconds: entry.time_in_cache(now).as_secs(),
                size_bytes: entry.size_bytes(),
                is_high_priority: entry.is_high_priority,
            })
            .collect();
        entries.sort_by(|a, b| b.age_seconds.cmp(&a.age_seconds));

        CacheInfo {
            pending_count: entries.len(),
            total_buffered_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            oldest_age_seconds: entries.first().map(|e| e.age_seconds),
            entries,
        }
    }

    /// Discard all pending entries **without** committing them.
    ///
    /// Destructive: every buffered edit is lost. Intended for tests and
    /// emergency recovery only, never normal operation. Returns the number
    /// of discarded entries.
    pub async fn clear_cache(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let discarded = inner.entries.len();
        inner.entries.clear();
        for (_, handle) in inner.debounce_timers.drain() {
            handle.abort();
        }
        for (_, handle) in inner.deadline_timers.drain() {
            handle.abort();
        }
        warn!(discarded, "Cache cleared without committing pending versions");
        discarded
    }

    /// Flush everything, then stop all timers. Call on process shutdown.
    pub async fn shutdown(&self) -> FlushSummary {
        let summary = self.flush_all().await;
        let mut inner = self.inner.lock().await;
        for (_, handle) in inner.debounce_timers.drain() {
            handle.abort();
        }
        for (_, handle) in inner.deadline_timers.drain() {
            handle.abort();
        }
        info!("Version cache shut down");
        summary
    }

    /// Flush the given files sequentially, logging failures and moving on.
    async fn flush_many(&self, file_ids: &[Uuid]) -> FlushSummary {
        let mut summary = FlushSummary::default();
        for &file_id in file_ids {
            match self.flush_entry(file_id).await {
                Ok(Some(_)) => summary.committed += 1,
                Ok(None) => {}
                Err(e) => {
                    summary.failed += 1;
                    error!(file_id = %file_id, error = %e, "Flush failed, continuing");
                }
            }
        }
        summary
    }

    /// Replace the file's debounce timer with a fresh one.
    async fn schedule_flush(&self, file_id: Uuid, delay: Duration) {
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            cache.run_debounce_timer(file_id, delay).await;
        });

        let mut inner = self.inner.lock().await;
        if let Some(stale) = inner.debounce_timers.insert(file_id, handle) {
            // A stale timer already mid-fire loses the race: it observes
            // no pending entry and exits.
            stale.abort();
        }
    }

    /// Timer body: wait out the debounce window, then commit if the file
    /// stayed quiet. A write that raced the timer pushes the flush out by
    /// the remaining idle time plus a fixed margin.
    async fn run_debounce_timer(&self, file_id: Uuid, delay: Duration) {
        tokio::time::sleep(delay).await;
        loop {
            enum TimerStep {
                Commit,
                Retry(Duration),
                Done,
            }

            let step = {
                let inner = self.inner.lock().await;
                match inner.entries.get(&file_id) {
                    None => TimerStep::Done,
                    Some(entry) => {
                        let idle = entry.idle_for(Instant::now());
                        if idle >= entry.debounce_window {
                            TimerStep::Commit
                        } else {
                            let margin = Duration::from_millis(self.config.reschedule_margin_ms);
                            TimerStep::Retry(entry.debounce_window - idle + margin)
                        }
                    }
                }
            };

            match step {
                TimerStep::Done => return,
                TimerStep::Commit => {
                    if let Err(e) = self.flush_entry(file_id).await {
                        error!(file_id = %file_id, error = %e, "Scheduled flush failed");
                    }
                    return;
                }
                TimerStep::Retry(remaining) => tokio::time::sleep(remaining).await,
            }
        }
    }

    /// Arm the per-entry hard deadline: even if the caller stops sending
    /// writes right at the boundary, the entry commits once the batch
    /// window since its first write has elapsed.
    fn spawn_deadline_timer(
        &self,
        file_id: Uuid,
        born: Instant,
        window: Duration,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            // Only fire for the generation that armed this timer.
            let current = {
                let inner = cache.inner.lock().await;
                inner
                    .entries
                    .get(&file_id)
                    .is_some_and(|entry| entry.first_modified == born)
            };
            if current {
                debug!(file_id = %file_id, "Hard batch deadline reached, forcing flush");
                if let Err(e) = cache.flush_entry(file_id).await {
                    error!(file_id = %file_id, error = %e, "Deadline flush failed");
                }
            }
        })
    }

    /// The commit path shared by every flush trigger.
    ///
    /// The entry is taken out of the map under the lock first, so a timer
    /// racing a forced flush finds nothing and no-ops; the commit itself
    /// runs without the lock held.
    async fn flush_entry(&self, file_id: Uuid) -> AppResult<Option<FileVersion>> {
        let entry = {
            let mut inner = self.inner.lock().await;
            let Some(entry) = inner.entries.remove(&file_id) else {
                return Ok(None);
            };
            // Handles are dropped from the registry but not aborted here:
            // this may be running *inside* one of them, and an orphaned
            // timer that wakes later observes no entry and exits.
            inner.debounce_timers.remove(&file_id);
            inner.deadline_timers.remove(&file_id);
            entry
        };

        let cache_duration = entry.time_in_cache(Instant::now());
        let request = CommitRequest {
            file_id,
            owner_id: entry.owner_id,
            content: entry.content.clone(),
            checksum: entry.checksum.clone(),
            is_high_priority: entry.is_high_priority,
            change_type: ChangeType::Batched,
            comment: entry.comment.clone(),
            was_cached: true,
            cache_duration_seconds: Some(cache_duration.as_secs() as i64),
        };

        match self.committer.commit_version(request).await {
            Ok(version) => {
                info!(
                    file_id = %file_id,
                    version = version.version_number,
                    cached_seconds = cache_duration.as_secs(),
                    "Committed batched version"
                );
                Ok(Some(version))
            }
            Err(e) if e.is_quota_exceeded() => {
                // Keep the edit: after cleanup the caller can flush again.
                warn!(file_id = %file_id, error = %e, "Commit rejected by quota, entry retained");
                let mut inner = self.inner.lock().await;
                inner.entries.entry(file_id).or_insert(entry);
                Err(e)
            }
            Err(e) => {
                error!(file_id = %file_id, error = %e, "Version commit failed, buffered edit lost");
                Err(e)
            }
        }
    }
}
