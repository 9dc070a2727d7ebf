//! The persistent analysis state store.

use crate::persistence::{self, CacheFiles, LoadSource, DEFAULT_CACHE_FILE};
use crate::registry::{self, ComponentRegistry};
use crate::{Result, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sonar_core::{
    AnalysisState, ComponentRecord, DependencyKind, DependencyRecord, Insights, ProgressMetrics,
    RepositoryRecord,
};
use sonar_fs::{FileSystem, NativeFileSystem};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Sizes and locations of the cache files.
#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    pub storage_dir: PathBuf,
    pub cache_file: PathBuf,
    pub cache_file_exists: bool,
    pub cache_file_size: Option<u64>,
    pub cache_file_modified: Option<DateTime<Utc>>,
    pub backup_file: PathBuf,
    pub backup_file_exists: bool,
    pub backup_file_size: Option<u64>,
    /// Where the in-memory state was last loaded from
    pub loaded_from: LoadSource,
    pub repositories: usize,
    pub components: usize,
}

/// Single owner of the discovery state.
///
/// All mutations are serialised by an internal lock held across
/// modify-and-save. A mutation works on a copy of the state, persists it and
/// only then publishes it, so a failed save leaves both the file and the
/// in-memory state untouched. Readers always get whole snapshots.
pub struct AnalysisStateStore<F: FileSystem = NativeFileSystem> {
    fs: Arc<F>,
    files: CacheFiles,
    state: Mutex<AnalysisState>,
    loaded_from: Mutex<LoadSource>,
}

impl AnalysisStateStore {
    /// Open (creating if needed) the cache directory and load its state.
    pub async fn open(cache_dir: impl AsRef<Path>, cache_file: &str) -> Result<Self> {
        let cache_dir = cache_dir.as_ref();
        tokio::fs::create_dir_all(cache_dir).await?;
        let fs = Arc::new(NativeFileSystem::new(cache_dir)?);
        Self::with_filesystem(fs, cache_file).await
    }

    /// [`open`](Self::open) with the default cache file name.
    pub async fn open_default(cache_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(cache_dir, DEFAULT_CACHE_FILE).await
    }
}

impl<F: FileSystem> AnalysisStateStore<F> {
    /// Load state through a custom filesystem rooted at the cache directory.
    pub async fn with_filesystem(fs: Arc<F>, cache_file: &str) -> Result<Self> {
        if !is_plain_file_name(cache_file) {
            return Err(StoreError::InvalidFileName(cache_file.to_string()));
        }
        let files = CacheFiles::new(cache_file);
        let (state, loaded_from) = persistence::load(fs.as_ref(), &files).await;
        tracing::debug!(
            %loaded_from,
            repositories = state.repositories.len(),
            "Opened discovery state store"
        );

        Ok(Self {
            fs,
            files,
            state: Mutex::new(state),
            loaded_from: Mutex::new(loaded_from),
        })
    }

    pub fn files(&self) -> &CacheFiles {
        &self.files
    }

    /// Absolute path of the cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.fs.root().join(&self.files.cache)
    }

    pub async fn loaded_from(&self) -> LoadSource {
        *self.loaded_from.lock().await
    }

    /// A consistent copy of the whole state.
    pub async fn snapshot(&self) -> AnalysisState {
        self.state.lock().await.clone()
    }

    pub async fn repository(&self, name: &str) -> Option<RepositoryRecord> {
        self.state.lock().await.repositories.get(name).cloned()
    }

    pub async fn metrics(&self) -> ProgressMetrics {
        ProgressMetrics::compute(&*self.state.lock().await)
    }

    /// Re-read the cache file, picking up writes from other processes.
    pub async fn reload(&self) -> LoadSource {
        let mut state = self.state.lock().await;
        let (loaded, source) = persistence::load(self.fs.as_ref(), &self.files).await;
        *state = loaded;
        *self.loaded_from.lock().await = source;
        source
    }

    /// Apply `change` to a copy of the state, persist it, then publish it.
    async fn mutate<T, C>(&self, change: C) -> Result<T>
    where
        C: FnOnce(&mut AnalysisState) -> sonar_core::Result<T>,
    {
        let mut current = self.state.lock().await;
        let mut next = current.clone();
        let value = change(&mut next)?;
        next.refresh_counters();
        next.metadata.last_updated = Some(Utc::now());
        persistence::save(self.fs.as_ref(), &self.files, &next).await?;
        *current = next;
        Ok(value)
    }

    /// Insert or merge one scanned record.
    pub async fn upsert_repository(&self, record: RepositoryRecord) -> Result<()> {
        self.mutate(|state| {
            registry::upsert_repository(state, record);
            Ok(())
        })
        .await
    }

    /// Merge a batch of scanned records in one save.
    pub async fn upsert_repositories(&self, records: Vec<RepositoryRecord>) -> Result<()> {
        self.mutate(|state| {
            for record in records {
                registry::upsert_repository(state, record);
            }
            Ok(())
        })
        .await
    }

    /// Merge the output of a full analysis run and stamp its start and end.
    pub async fn record_analysis(
        &self,
        base_repos_path: &Path,
        records: Vec<RepositoryRecord>,
        started: DateTime<Utc>,
    ) -> Result<()> {
        let count = records.len();
        self.mutate(|state| {
            for record in records {
                registry::upsert_repository(state, record);
            }
            state.metadata.base_repos_path = Some(base_repos_path.to_path_buf());
            state.metadata.analysis_started = Some(started);
            state.metadata.analysis_completed = Some(Utc::now());
            Ok(())
        })
        .await?;
        tracing::info!(repositories = count, "Persisted analysis batch");
        Ok(())
    }

    pub async fn store_insights(&self, name: &str, insights: Insights) -> Result<RepositoryRecord> {
        self.mutate(|state| registry::store_insights(state, name, insights))
            .await
    }

    pub async fn store_deep_analysis(
        &self,
        name: &str,
        markdown_summary: &str,
        deep_insights: Insights,
    ) -> Result<RepositoryRecord> {
        self.mutate(|state| {
            registry::store_deep_analysis(state, name, markdown_summary, deep_insights, Utc::now())
        })
        .await
    }

    pub async fn add_component(
        &self,
        name: &str,
        purpose: &str,
        rationale: &str,
    ) -> Result<ComponentRecord> {
        self.mutate(|state| {
            ComponentRegistry::new(state).add_component(name, purpose, rationale, Utc::now())
        })
        .await
    }

    /// Returns `false` when the repository was already a member.
    pub async fn assign_repository(&self, repository: &str, component: &str) -> Result<bool> {
        self.mutate(|state| ComponentRegistry::new(state).assign(repository, component))
            .await
    }

    /// Returns `false` when the repository was not a member.
    pub async fn unassign_repository(&self, repository: &str, component: &str) -> Result<bool> {
        self.mutate(|state| ComponentRegistry::new(state).unassign(repository, component))
            .await
    }

    pub async fn set_component_standalone(&self, component: &str, standalone: bool) -> Result<()> {
        self.mutate(|state| ComponentRegistry::new(state).set_standalone(component, standalone))
            .await
    }

    pub async fn add_dependency(
        &self,
        source: &str,
        target: &str,
        kind: DependencyKind,
        description: &str,
        evidence: &str,
    ) -> Result<DependencyRecord> {
        self.mutate(|state| {
            ComponentRegistry::new(state).add_dependency(
                source,
                target,
                kind,
                description,
                evidence,
                Utc::now(),
            )
        })
        .await
    }

    /// Copy the current cache file to a named snapshot in the cache directory.
    ///
    /// Without a name, `discovery_backup_<YYYYmmdd_HHMMSS>.json` is used.
    /// Returns `None` when there is no cache file to copy yet.
    pub async fn create_backup(&self, name: Option<&str>) -> Result<Option<PathBuf>> {
        let _guard = self.state.lock().await;
        self.backup_unlocked(name).await
    }

    async fn backup_unlocked(&self, name: Option<&str>) -> Result<Option<PathBuf>> {
        let name = match name {
            Some(name) => {
                if !is_plain_file_name(name) {
                    return Err(StoreError::InvalidFileName(name.to_string()));
                }
                name.to_string()
            }
            None => format!(
                "discovery_backup_{}.json",
                Utc::now().format("%Y%m%d_%H%M%S")
            ),
        };

        if !self.fs.exists(&self.files.cache).await? {
            return Ok(None);
        }

        let target = PathBuf::from(&name);
        self.fs.copy(&self.files.cache, &target).await?;
        tracing::info!(backup = %name, "Created discovery state backup");
        Ok(Some(self.fs.root().join(target)))
    }

    /// Reset to an empty state, keeping a timestamped backup of the old one.
    ///
    /// The base repository path survives the reset.
    pub async fn clear(&self) -> Result<Option<PathBuf>> {
        let mut current = self.state.lock().await;
        let backup = self.backup_unlocked(None).await?;

        let mut fresh = AnalysisState::new(current.metadata.base_repos_path.clone());
        fresh.metadata.last_updated = Some(Utc::now());
        persistence::save(self.fs.as_ref(), &self.files, &fresh).await?;
        *current = fresh;
        tracing::info!("Cleared discovery state");
        Ok(backup)
    }

    pub async fn storage_info(&self) -> Result<StorageInfo> {
        let state = self.state.lock().await;
        let cache = self.fs.metadata(&self.files.cache).await?;
        let backup = self.fs.metadata(&self.files.backup).await?;
        let root = self.fs.root();

        Ok(StorageInfo {
            storage_dir: root.to_path_buf(),
            cache_file: root.join(&self.files.cache),
            cache_file_exists: cache.exists,
            cache_file_size: cache.exists.then_some(cache.size),
            cache_file_modified: cache.modified.map(DateTime::<Utc>::from),
            backup_file: root.join(&self.files.backup),
            backup_file_exists: backup.exists,
            backup_file_size: backup.exists.then_some(backup.size),
            loaded_from: *self.loaded_from.lock().await,
            repositories: state.repositories.len(),
            components: state.components.len(),
        })
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl<F: FileSystem> std::fmt::Debug for AnalysisStateStore<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisStateStore")
            .field("root", &self.fs.root())
            .field("files", &self.files)
            .finish()
    }
}
