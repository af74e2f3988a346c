//! Shared test fixtures: an in-memory version store with the same
//! transactional semantics as the PostgreSQL implementation, and a
//! pre-wired service harness.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use strata_blob::MemoryBlobStorage;
use strata_core::config::blob::BlobConfig;
use strata_core::config::versioning::VersioningConfig;
use strata_core::error::AppError;
use strata_core::result::AppResult;
use strata_database::store::{BlobDisposition, PurgeOutcome, VersionStore};
use strata_entity::blob::VersionBlob;
use strata_entity::settings::CacheSettings;
use strata_entity::version::{ChangeType, FileVersion, NewVersion, StorageType};
use strata_service::{CommitService, CreateVersionParams, RetentionService};

#[derive(Debug, Default)]
struct State {
    versions: Vec<FileVersion>,
    blobs: HashMap<String, VersionBlob>,
    settings: HashMap<Uuid, CacheSettings>,
}

/// In-memory [`VersionStore`] mirroring the SQL semantics: monotonic
/// version numbers per file, unique blob checksums, refcount lifecycle,
/// and usage accounting for stored commits.
#[derive(Debug)]
pub struct MemoryVersionStore {
    state: Mutex<State>,
    defaults: VersioningConfig,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            defaults: VersioningConfig::default(),
        }
    }

    pub async fn blob(&self, checksum: &str) -> Option<VersionBlob> {
        self.state.lock().await.blobs.get(checksum).cloned()
    }

    pub async fn usage(&self, user_id: Uuid) -> i64 {
        self.state
            .lock()
            .await
            .settings
            .get(&user_id)
            .map(|s| s.current_usage_bytes)
            .unwrap_or(0)
    }

    pub async fn all_versions(&self) -> Vec<FileVersion> {
        self.state.lock().await.versions.clone()
    }

    pub async fn blob_count(&self) -> usize {
        self.state.lock().await.blobs.len()
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn find_version(&self, id: Uuid) -> AppResult<Option<FileVersion>> {
        Ok(self
            .state
            .lock()
            .await
            .versions
            .iter()
            .find(|v| v.id == id)
            .cloned())
    }

    async fn latest_version(&self, file_id: Uuid) -> AppResult<Option<FileVersion>> {
        Ok(self
            .state
            .lock()
            .await
            .versions
            .iter()
            .filter(|v| v.file_id == file_id)
            .max_by_key(|v| v.version_number)
            .cloned())
    }

    async fn find_versions(&self, file_id: Uuid) -> AppResult<Vec<FileVersion>> {
        let mut versions: Vec<FileVersion> = self
            .state
            .lock()
            .await
            .versions
            .iter()
            .filter(|v| v.file_id == file_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    async fn version_count(&self, file_id: Uuid) -> AppResult<i64> {
        Ok(self
            .state
            .lock()
            .await
            .versions
            .iter()
            .filter(|v| v.file_id == file_id)
            .count() as i64)
    }

    async fn find_blob(&self, checksum: &str) -> AppResult<Option<VersionBlob>> {
        Ok(self.state.lock().await.blobs.get(checksum).cloned())
    }

    async fn commit_version(
        &self,
        new: &NewVersion,
        disposition: &BlobDisposition,
    ) -> AppResult<FileVersion> {
        let mut state = self.state.lock().await;

        let version_number = state
            .versions
            .iter()
            .filter(|v| v.file_id == new.file_id)
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0)
            + 1;

        let (storage_type, blob) = match disposition {
            BlobDisposition::Reference { checksum } => {
                let blob = state.blobs.get_mut(checksum).ok_or_else(|| {
                    AppError::conflict(format!("No blob exists for checksum {checksum}"))
                })?;
                blob.reference_count += 1;
                blob.is_pinned |= new.is_high_priority;
                blob.last_accessed = Utc::now();
                (StorageType::Reference, blob.clone())
            }
            BlobDisposition::Stored {
                checksum,
                storage_path,
                original_size,
                compressed_size,
            } => {
                if state.blobs.contains_key(checksum) {
                    return Err(AppError::conflict(format!("Blob {checksum} already exists")));
                }
                let blob = VersionBlob {
                    id: Uuid::new_v4(),
                    checksum: checksum.clone(),
                    storage_path: storage_path.clone(),
                    original_size: *original_size,
                    compressed_size: *compressed_size,
                    reference_count: 1,
                    is_pinned: new.is_high_priority,
                    created_at: Utc::now(),
                    last_accessed: Utc::now(),
                };
                state.blobs.insert(checksum.clone(), blob.clone());
                (StorageType::Stored, blob)
            }
        };

        let version = FileVersion {
            id: Uuid::new_v4(),
            file_id: new.file_id,
            owner_id: new.owner_id,
            version_number,
            storage_type,
            blob_checksum: blob.checksum.clone(),
            original_size: blob.original_size,
            compressed_size: blob.compressed_size,
            is_high_priority: new.is_high_priority,
            change_type: new.change_type,
            comment: new.comment.clone(),
            was_cached: new.was_cached,
            cache_duration_seconds: new.cache_duration_seconds,
            created_at: Utc::now(),
        };
        state.versions.push(version.clone());

        if let BlobDisposition::Stored { compressed_size, .. } = disposition {
            let defaults = self.defaults.clone();
            let entry = state
                .settings
                .entry(new.owner_id)
                .or_insert_with(|| CacheSettings::from_defaults(new.owner_id, &defaults));
            entry.current_usage_bytes += compressed_size;
        }

        Ok(version)
    }

    async fn find_settings(&self, user_id: Uuid) -> AppResult<Option<CacheSettings>> {
        Ok(self.state.lock().await.settings.get(&user_id).cloned())
    }

    async fn save_settings(&self, settings: &CacheSettings) -> AppResult<CacheSettings> {
        self.state
            .lock()
            .await
            .settings
            .insert(settings.user_id, settings.clone());
        Ok(settings.clone())
    }

    async fn users_with_versions(&self) -> AppResult<Vec<Uuid>> {
        let mut users: Vec<Uuid> = self
            .state
            .lock()
            .await
            .versions
            .iter()
            .map(|v| v.owner_id)
            .collect();
        users.sort();
        users.dedup();
        Ok(users)
    }

    async fn versions_beyond_depth(
        &self,
        owner_id: Uuid,
        depth: i32,
    ) -> AppResult<Vec<FileVersion>> {
        let state = self.state.lock().await;

        let mut by_file: HashMap<Uuid, Vec<&FileVersion>> = HashMap::new();
        for version in state.versions.iter().filter(|v| v.owner_id == owner_id) {
            by_file.entry(version.file_id).or_default().push(version);
        }

        let mut candidates = Vec::new();
        for versions in by_file.values_mut() {
            versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
            for version in versions.iter().skip(depth.max(0) as usize) {
                if !version.is_high_priority {
                    candidates.push((*version).clone());
                }
            }
        }

        candidates.sort_by(|a, b| {
            (a.file_id, a.version_number).cmp(&(b.file_id, b.version_number))
        });
        Ok(candidates)
    }

    async fn purge_versions(&self, version_ids: &[Uuid]) -> AppResult<PurgeOutcome> {
        let mut state = self.state.lock().await;

        let victims: Vec<FileVersion> = state
            .versions
            .iter()
            .filter(|v| version_ids.contains(&v.id))
            .cloned()
            .collect();
        if victims.is_empty() {
            return Ok(PurgeOutcome::default());
        }

        state.versions.retain(|v| !version_ids.contains(&v.id));

        let mut decrements: HashMap<String, i32> = HashMap::new();
        for victim in &victims {
            *decrements.entry(victim.blob_checksum.clone()).or_default() += 1;
        }

        let mut reclaimable = Vec::new();
        for (checksum, count) in decrements {
            let deletable = match state.blobs.get_mut(&checksum) {
                Some(blob) => {
                    blob.reference_count = (blob.reference_count - count).max(0);
                    blob.can_delete()
                }
                None => false,
            };
            if deletable {
                if let Some(blob) = state.blobs.remove(&checksum) {
                    reclaimable.push(blob);
                }
            }
        }

        let mut released: HashMap<Uuid, i64> = HashMap::new();
        for victim in &victims {
            if victim.storage_type.counts_against_quota() {
                *released.entry(victim.owner_id).or_default() += victim.compressed_size;
            }
        }
        for (owner_id, bytes) in &released {
            if let Some(settings) = state.settings.get_mut(owner_id) {
                settings.current_usage_bytes = (settings.current_usage_bytes - bytes).max(0);
            }
        }

        Ok(PurgeOutcome {
            deleted_versions: victims.len() as u64,
            freed_bytes: released.values().sum(),
            reclaimable_blobs: reclaimable,
        })
    }
}

/// Pre-wired services over in-memory stores.
pub struct TestHarness {
    pub store: Arc<MemoryVersionStore>,
    pub blobs: Arc<MemoryBlobStorage>,
    pub commit: CommitService,
    pub retention: Arc<RetentionService>,
}

pub fn harness() -> TestHarness {
    let store = Arc::new(MemoryVersionStore::new());
    let blobs = Arc::new(MemoryBlobStorage::new());
    let retention = Arc::new(RetentionService::new(
        store.clone(),
        blobs.clone(),
        VersioningConfig::default(),
    ));
    let commit = CommitService::new(
        store.clone(),
        blobs.clone(),
        retention.clone(),
        VersioningConfig::default(),
        BlobConfig::default(),
    );
    TestHarness {
        store,
        blobs,
        commit,
        retention,
    }
}

/// Settings row with an explicit quota, defaults elsewhere.
pub fn settings_with_quota(user_id: Uuid, max: i64, used: i64) -> CacheSettings {
    CacheSettings {
        user_id,
        max_size_bytes: max,
        current_usage_bytes: used,
        depth: 10,
        headroom_percent: 90,
        is_enabled: true,
        compression_enabled: false,
        dedupe_enabled: true,
        debounce_window_seconds: 30,
        max_batch_window_seconds: 300,
    }
}

/// Settings row with an explicit retention depth, a roomy quota, and
/// compression off for exact byte arithmetic.
pub fn settings_with_depth(user_id: Uuid, depth: i32) -> CacheSettings {
    CacheSettings {
        user_id,
        max_size_bytes: 1_000_000,
        current_usage_bytes: 0,
        depth,
        headroom_percent: 90,
        is_enabled: true,
        compression_enabled: false,
        dedupe_enabled: true,
        debounce_window_seconds: 30,
        max_batch_window_seconds: 300,
    }
}

/// Plain update params for the given content.
pub fn create_params(file_id: Uuid, owner_id: Uuid, content: &[u8]) -> CreateVersionParams {
    CreateVersionParams {
        file_id,
        owner_id,
        content: Bytes::copy_from_slice(content),
        checksum: None,
        is_high_priority: false,
        change_type: ChangeType::Update,
        comment: None,
        was_cached: false,
        cache_duration_seconds: None,
    }
}
