use chrono::Utc;
use sonar_core::{AnalysisStatus, DependencyKind, Insights, RepositoryRecord, SizeCategory, ValidationEngine};
use sonar_store::{AnalysisStateStore, LoadSource, StoreError, DEFAULT_CACHE_FILE};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn analyzed(name: &str) -> RepositoryRecord {
    let mut record = RepositoryRecord::new(name, name);
    record.analysis_status = AnalysisStatus::Analyzed;
    record.total_files = 10;
    record
}

async fn seeded_store(dir: &Path) -> AnalysisStateStore {
    let store = AnalysisStateStore::open_default(dir).await.unwrap();
    store
        .record_analysis(
            Path::new("/repos"),
            vec![analyzed("svc-a"), analyzed("svc-b"), analyzed("web")],
            Utc::now(),
        )
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_fresh_store_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = AnalysisStateStore::open_default(temp_dir.path().join("cache"))
        .await
        .unwrap();

    assert_eq!(store.loaded_from().await, LoadSource::Fresh);
    let state = store.snapshot().await;
    assert!(state.is_unpopulated());
    assert_eq!(state.metadata.total_repositories, 0);
    assert!(!store.cache_path().exists());
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = seeded_store(temp_dir.path()).await;
        store.add_component("backend", "APIs", "Same team").await.unwrap();
        store.assign_repository("svc-a", "backend").await.unwrap();
        store.assign_repository("svc-b", "backend").await.unwrap();
    }

    let store = AnalysisStateStore::open_default(temp_dir.path()).await.unwrap();
    assert_eq!(store.loaded_from().await, LoadSource::Primary);

    let state = store.snapshot().await;
    assert_eq!(state.metadata.total_repositories, 3);
    assert_eq!(state.metadata.analyzed_repositories, 3);
    assert_eq!(state.metadata.components_created, 1);
    assert!(state.metadata.analysis_completed.is_some());
    assert_eq!(state.components["backend"].repositories, vec!["svc-a", "svc-b"]);
    assert_eq!(state.repositories["svc-a"].assigned_components, vec!["backend"]);

    let report = ValidationEngine::default().validate(&state);
    let backend = report.component("backend").unwrap();
    assert_eq!(backend.size_category, SizeCategory::TooSmall);
    assert_eq!(backend.repository_count, 2);
}

#[tokio::test]
async fn test_corrupt_cache_recovers_from_backup() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = seeded_store(temp_dir.path()).await;
        // Second save rotates the seeded state into the backup
        store.add_component("backend", "", "").await.unwrap();
    }

    let cache = temp_dir.path().join(DEFAULT_CACHE_FILE);
    fs::write(&cache, "{ \"repositories\": [ truncated").unwrap();

    let store = AnalysisStateStore::open_default(temp_dir.path()).await.unwrap();
    assert_eq!(store.loaded_from().await, LoadSource::Backup);
    let state = store.snapshot().await;
    assert_eq!(state.repositories.len(), 3);
    assert!(state.components.is_empty());

    // The corrupt file is set aside, not rotated into the backup
    assert!(temp_dir
        .path()
        .join(format!("{DEFAULT_CACHE_FILE}.corrupt"))
        .exists());
    store.add_component("frontend", "", "").await.unwrap();
    let backup = fs::read_to_string(temp_dir.path().join(format!("{DEFAULT_CACHE_FILE}.backup"))).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&backup).is_ok());
}

#[tokio::test]
async fn test_corrupt_cache_and_backup_start_fresh() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(DEFAULT_CACHE_FILE), "not json").unwrap();
    fs::write(
        temp_dir.path().join(format!("{DEFAULT_CACHE_FILE}.backup")),
        "also not json",
    )
    .unwrap();

    let store = AnalysisStateStore::open_default(temp_dir.path()).await.unwrap();
    assert_eq!(store.loaded_from().await, LoadSource::Fresh);
    assert!(store.snapshot().await.repositories.is_empty());
}

#[tokio::test]
async fn test_unreadable_cache_is_not_quarantined() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = seeded_store(temp_dir.path()).await;
        store.add_component("backend", "", "").await.unwrap();
    }

    // A directory in place of the cache file fails to read without being corrupt
    let cache = temp_dir.path().join(DEFAULT_CACHE_FILE);
    fs::remove_file(&cache).unwrap();
    fs::create_dir(&cache).unwrap();

    let store = AnalysisStateStore::open_default(temp_dir.path()).await.unwrap();
    assert_eq!(store.loaded_from().await, LoadSource::Backup);
    assert_eq!(store.snapshot().await.repositories.len(), 3);

    assert!(cache.is_dir());
    assert!(!temp_dir
        .path()
        .join(format!("{DEFAULT_CACHE_FILE}.corrupt"))
        .exists());
}

#[tokio::test]
async fn test_rejected_mutation_leaves_file_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let store = seeded_store(temp_dir.path()).await;
    let before = fs::read_to_string(store.cache_path()).unwrap();

    let err = store.assign_repository("svc-a", "missing").await.unwrap_err();
    assert!(err.is_not_found());
    let err = store.store_insights("ghost", Insights::new()).await.unwrap_err();
    assert!(err.is_not_found());
    let err = store.add_component("svc a", "", "").await.unwrap_err();
    assert!(matches!(err, StoreError::State(sonar_core::Error::InvalidName { .. })));

    assert_eq!(fs::read_to_string(store.cache_path()).unwrap(), before);
}

#[tokio::test]
async fn test_insights_rescan_and_deep_analysis() {
    let temp_dir = TempDir::new().unwrap();
    let store = seeded_store(temp_dir.path()).await;

    let mut insights = Insights::new();
    insights.insert("business_domain".into(), "payments".into());
    store.store_insights("svc-a", insights).await.unwrap();
    store
        .store_deep_analysis("svc-a", "## Architecture\nLayered.", Insights::new())
        .await
        .unwrap();

    let mut rescanned = analyzed("svc-a");
    rescanned.total_files = 99;
    store.upsert_repository(rescanned).await.unwrap();

    let record = store.repository("svc-a").await.unwrap();
    assert_eq!(record.total_files, 99);
    assert_eq!(record.analysis_status, AnalysisStatus::InsightEnriched);
    assert!(record.insights.contains_key("business_domain"));
    assert!(record.deep_analysis.is_some());

    let metrics = store.metrics().await;
    assert_eq!(metrics.insight_enriched_repositories, 1);
    assert!((metrics.investigation_progress - 100.0 / 3.0).abs() < 1e-9);

    let unanalyzed = store.snapshot().await.unanalyzed_repositories();
    assert_eq!(unanalyzed.keys().collect::<Vec<_>>(), vec!["svc-b", "web"]);
}

#[tokio::test]
async fn test_dependencies_persist() {
    let temp_dir = TempDir::new().unwrap();
    let store = seeded_store(temp_dir.path()).await;
    store
        .add_dependency("web", "svc-a", DependencyKind::Runtime, "REST calls", "openapi client")
        .await
        .unwrap();
    assert!(store
        .add_dependency("web", "svc-a", DependencyKind::Runtime, "", "")
        .await
        .is_err());

    store.reload().await;
    let state = store.snapshot().await;
    assert_eq!(state.dependency_records.len(), 1);
    assert_eq!(state.outgoing_dependencies("web").len(), 1);
    assert_eq!(state.incoming_dependencies("svc-a").len(), 1);
}

#[tokio::test]
async fn test_concurrent_assignments_are_serialised() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(seeded_store(temp_dir.path()).await);
    for name in ["c1", "c2", "c3", "c4"] {
        store.add_component(name, "", "").await.unwrap();
    }

    let mut handles = Vec::new();
    for component in ["c1", "c2", "c3", "c4"] {
        for repo in ["svc-a", "svc-b", "web"] {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.assign_repository(repo, component).await.unwrap();
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    store.reload().await;
    let state = store.snapshot().await;
    for component in state.components.values() {
        assert_eq!(component.repositories.len(), 3);
    }
    for repo in state.repositories.values() {
        assert_eq!(repo.assigned_components.len(), 4);
    }
    assert_eq!(state.multi_assigned_repositories().len(), 3);
}

#[tokio::test]
async fn test_backup_clear_and_storage_info() {
    let temp_dir = TempDir::new().unwrap();
    let store = seeded_store(temp_dir.path()).await;

    let named = store.create_backup(Some("before-review.json")).await.unwrap().unwrap();
    assert!(named.exists());
    assert!(matches!(
        store.create_backup(Some("../escape.json")).await,
        Err(StoreError::InvalidFileName(_))
    ));

    let info = store.storage_info().await.unwrap();
    assert!(info.cache_file_exists);
    assert!(info.cache_file_size.unwrap_or(0) > 0);
    assert_eq!(info.repositories, 3);

    let snapshot = store.clear().await.unwrap().unwrap();
    let name = snapshot.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("discovery_backup_"));
    assert!(name.ends_with(".json"));

    let state = store.snapshot().await;
    assert!(state.repositories.is_empty());
    assert_eq!(state.metadata.base_repos_path.as_deref(), Some(Path::new("/repos")));

    let kept: serde_json::Value = serde_json::from_str(&fs::read_to_string(snapshot).unwrap()).unwrap();
    assert_eq!(kept["repositories"].as_object().map(|m| m.len()), Some(3));
}
