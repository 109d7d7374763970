//! Integration tests for the directory-backed cache storage
//!
//! These tests verify the storage against a real temporary directory:
//! - Save record naming and lifecycle across restarts
//! - Uniqueness of handles under concurrent creation
//! - Restore scan isolation (corrupt, rejected and duplicate records)
//! - Cleanup when the save record cannot be written
//! - Live count and total size views
//! - Lifecycle events on the event bus

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::{BridgeError, FileMetadata, FileSystemAccess};
use bytes::Bytes;
use core_cache::{
    CacheEngine, CacheError, CacheHandle, CacheMetadata, CacheState, CacheStorageConfig,
    DirectoryCacheStorage, DummyCacheEngine, MediaCacheStorage, MediaSourceKind,
    MediaSourceLocation, OriginMedia, ResourceLocation, RestoreReport, SaveRecord,
};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use mockall::mock;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fixtures
// ============================================================================

fn origin(id: &str) -> OriginMedia {
    OriginMedia::new(
        id,
        "dmhy",
        ResourceLocation::MagnetUri {
            uri: format!("magnet:?xt=urn:btih:{}", id),
        },
        format!("[Group] Show - {}", id),
    )
}

fn metadata() -> CacheMetadata {
    CacheMetadata::new("subject-1", "episode-3")
        .with_subject_names(["Show"])
        .with_episode_sort("3")
}

fn records_dir(root: &Path) -> PathBuf {
    root.join("local")
}

fn config(root: &Path) -> CacheStorageConfig {
    CacheStorageConfig::builder()
        .media_source_id("local")
        .metadata_dir(records_dir(root))
        .file_system(Arc::new(TokioFileSystem::with_directories(
            root.to_path_buf(),
            root.to_path_buf(),
        )))
        .build()
        .unwrap()
}

fn open(root: &Path, engine: &Arc<DummyCacheEngine>) -> DirectoryCacheStorage {
    DirectoryCacheStorage::new(config(root), Arc::clone(engine) as _).unwrap()
}

fn record_name(media_id: &str) -> String {
    format!("{}.metadata", hex::encode(Sha256::digest(media_id.as_bytes())))
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn write_raw_record(root: &Path, name: &str, contents: &[u8]) {
    let dir = records_dir(root);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), contents).unwrap();
}

async fn settle<T: PartialEq + std::fmt::Debug>(
    rx: &mut tokio::sync::watch::Receiver<T>,
    expected: T,
) {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|value| *value == expected))
        .await
        .expect("view did not settle")
        .expect("view closed");
}

// ============================================================================
// Mock Implementations
// ============================================================================

mock! {
    pub Fs {}

    #[async_trait]
    impl FileSystemAccess for Fs {
        async fn get_cache_directory(&self) -> Result<PathBuf, BridgeError>;
        async fn get_data_directory(&self) -> Result<PathBuf, BridgeError>;
        async fn exists(&self, path: &Path) -> Result<bool, BridgeError>;
        async fn metadata(&self, path: &Path) -> Result<FileMetadata, BridgeError>;
        async fn create_dir_all(&self, path: &Path) -> Result<(), BridgeError>;
        async fn read_file(&self, path: &Path) -> Result<Bytes, BridgeError>;
        async fn write_file(&self, path: &Path, data: Bytes) -> Result<(), BridgeError>;
        async fn rename(&self, from: &Path, to: &Path) -> Result<(), BridgeError>;
        async fn delete_file(&self, path: &Path) -> Result<(), BridgeError>;
        async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>, BridgeError>;
    }
}

mock! {
    pub Engine {}

    #[async_trait]
    impl CacheEngine for Engine {
        async fn create_cache(
            &self,
            origin: &OriginMedia,
            metadata: &CacheMetadata,
            scope: &CancellationToken,
        ) -> core_cache::Result<Arc<dyn CacheHandle>>;
        async fn restore(
            &self,
            origin: &OriginMedia,
            metadata: &CacheMetadata,
            scope: &CancellationToken,
        ) -> core_cache::Result<Option<Arc<dyn CacheHandle>>>;
    }
}

/// Engine that keeps its download directory in the handle metadata and
/// cannot reattach a payload without it.
struct TorrentDirEngine {
    inner: Arc<DummyCacheEngine>,
}

#[async_trait]
impl CacheEngine for TorrentDirEngine {
    async fn create_cache(
        &self,
        origin: &OriginMedia,
        metadata: &CacheMetadata,
        scope: &CancellationToken,
    ) -> core_cache::Result<Arc<dyn CacheHandle>> {
        let metadata = metadata
            .clone()
            .with_extra("torrent_dir", format!("/data/{}", origin.media_id));
        self.inner.create_cache(origin, &metadata, scope).await
    }

    async fn restore(
        &self,
        origin: &OriginMedia,
        metadata: &CacheMetadata,
        scope: &CancellationToken,
    ) -> core_cache::Result<Option<Arc<dyn CacheHandle>>> {
        if !metadata.extra.contains_key("torrent_dir") {
            return Ok(None);
        }
        self.inner.restore(origin, metadata, scope).await
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_cache_restart_delete_scenario() {
    let root = TempDir::new().unwrap();
    let media = origin("dmhy.1001");

    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    assert_eq!(storage.wait_restored().await.unwrap(), RestoreReport::default());

    storage.cache(&media, &metadata(), false).await.unwrap();
    assert_eq!(storage.count(), 1);
    assert_eq!(files_in(&records_dir(root.path())), vec![record_name("dmhy.1001")]);

    storage.close().await;
    drop(storage);

    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    let report = storage.wait_restored().await.unwrap();
    assert_eq!(report.restored, 1);
    assert_eq!(storage.count(), 1);
    assert_eq!(storage.list()[0].origin(), &media);
    assert_eq!(storage.list()[0].metadata(), &metadata());
    assert!(engine.handle_for(&media.media_id).await.unwrap().was_restored());

    assert!(storage.delete(&media).await.unwrap());
    assert_eq!(storage.count(), 0);
    assert!(files_in(&records_dir(root.path())).is_empty());
}

#[tokio::test]
async fn test_restart_restores_engine_metadata() {
    let root = TempDir::new().unwrap();
    let media = origin("dmhy.7");

    {
        let engine = TorrentDirEngine {
            inner: Arc::new(DummyCacheEngine::new()),
        };
        let storage = DirectoryCacheStorage::new(config(root.path()), Arc::new(engine)).unwrap();
        storage.wait_restored().await.unwrap();

        let handle = storage.cache(&media, &metadata(), false).await.unwrap();
        assert_eq!(handle.metadata().extra["torrent_dir"], "/data/dmhy.7");
        storage.close().await;
    }

    let saved = std::fs::read(records_dir(root.path()).join(record_name("dmhy.7"))).unwrap();
    let record = SaveRecord::from_bytes(&saved).unwrap();
    assert_eq!(record.metadata.extra["torrent_dir"], "/data/dmhy.7");
    assert_eq!(record.metadata.subject_id, "subject-1");

    let inner = Arc::new(DummyCacheEngine::new());
    let engine = TorrentDirEngine {
        inner: Arc::clone(&inner),
    };
    let storage = DirectoryCacheStorage::new(config(root.path()), Arc::new(engine)).unwrap();
    let report = storage.wait_restored().await.unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.skipped_rejected, 0);
    assert_eq!(inner.restore_count(), 1);
    assert_eq!(storage.list()[0].metadata().extra["torrent_dir"], "/data/dmhy.7");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cache_creates_once() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new().with_create_delay(Duration::from_millis(50)));
    let storage = Arc::new(open(root.path(), &engine));
    storage.wait_restored().await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let storage = Arc::clone(&storage);
            tokio::spawn(async move {
                storage
                    .cache(&origin("dmhy.1"), &metadata(), false)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let handles: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(engine.creation_count(), 1);
    assert_eq!(storage.count(), 1);
    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    assert_eq!(files_in(&records_dir(root.path())).len(), 1);
}

#[tokio::test]
async fn test_cache_existing_ignores_new_metadata() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();

    let first = storage.cache(&origin("a"), &metadata(), false).await.unwrap();
    let second = storage
        .cache(&origin("a"), &CacheMetadata::new("other", "other"), false)
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.metadata(), &metadata());
    assert_eq!(engine.creation_count(), 1);
}

#[tokio::test]
async fn test_resume_after_cache_and_find() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();

    storage.cache(&origin("a"), &metadata(), true).await.unwrap();
    let dummy = engine.handle_for(&"a".into()).await.unwrap();
    assert_eq!(dummy.resume_count(), 1);
    assert_eq!(dummy.state(), CacheState::InProgress);

    storage.find_cache(&origin("a"), true).await.unwrap().unwrap();
    storage.find_cache(&origin("a"), false).await.unwrap().unwrap();
    assert_eq!(dummy.resume_count(), 2);
    assert!(storage.find_cache(&origin("b"), true).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();

    let handle = storage.cache(&origin("a"), &metadata(), false).await.unwrap();

    assert!(storage.delete_cache(&handle).await.unwrap());
    assert!(!storage.delete(&origin("a")).await.unwrap());
    assert!(storage.find_cache(&origin("a"), false).await.unwrap().is_none());
    assert!(engine.handle_for(&"a".into()).await.unwrap().is_deleted());
    assert!(!storage.delete(&origin("never-cached")).await.unwrap());
}

#[tokio::test]
async fn test_engine_delete_failure_keeps_entry() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();

    storage.cache(&origin("a"), &metadata(), false).await.unwrap();
    let dummy = engine.handle_for(&"a".into()).await.unwrap();
    dummy.set_fail_delete(true);

    let result = storage.delete(&origin("a")).await;
    assert!(result.unwrap_err().is_engine_error());
    assert_eq!(storage.count(), 1);
    assert_eq!(files_in(&records_dir(root.path())), vec![record_name("a")]);

    dummy.set_fail_delete(false);
    assert!(storage.delete(&origin("a")).await.unwrap());
    assert_eq!(storage.count(), 0);
}

#[tokio::test]
async fn test_delete_tolerates_missing_record() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();

    storage.cache(&origin("a"), &metadata(), false).await.unwrap();
    std::fs::remove_file(records_dir(root.path()).join(record_name("a"))).unwrap();

    assert!(storage.delete(&origin("a")).await.unwrap());
    assert_eq!(storage.count(), 0);
}

#[tokio::test]
async fn test_engine_create_failure_leaves_nothing() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new());
    engine.set_fail_create(true);
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();

    let result = storage.cache(&origin("a"), &metadata(), false).await;
    assert!(matches!(result, Err(CacheError::Engine(_))));
    assert_eq!(storage.count(), 0);
    assert!(files_in(&records_dir(root.path())).is_empty());
}

#[tokio::test]
async fn test_unsupported_media_is_rejected() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new().with_unsupported_kind(MediaSourceKind::Web));
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();

    let web = origin("web.1").with_source(MediaSourceLocation::Online, MediaSourceKind::Web);
    let result = storage.cache(&web, &metadata(), false).await;

    assert!(matches!(result, Err(CacheError::UnsupportedMedia(id)) if id == "web.1"));
    assert_eq!(engine.creation_count(), 0);
    assert_eq!(storage.count(), 0);
}

// ============================================================================
// Persistence Failures
// ============================================================================

#[tokio::test]
async fn test_record_write_failure_discards_handle() {
    let mut fs = MockFs::new();
    fs.expect_create_dir_all().returning(|_| Ok(()));
    fs.expect_write_file()
        .times(1)
        .returning(|_, _| Err(BridgeError::OperationFailed("disk full".to_string())));

    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let config = CacheStorageConfig::builder()
        .media_source_id("local")
        .metadata_dir("/records")
        .file_system(Arc::new(fs))
        .restore_on_start(false)
        .event_bus(bus)
        .build()
        .unwrap();
    let engine = Arc::new(DummyCacheEngine::new());
    let storage = DirectoryCacheStorage::new(config, Arc::clone(&engine) as _).unwrap();

    let result = storage.cache(&origin("a"), &metadata(), true).await;

    let err = match result {
        Err(e) => e,
        Ok(_) => panic!("called `Result::unwrap_err()` on an `Ok` value"),
    };
    assert!(err.is_persistence_error());
    assert_eq!(storage.count(), 0);
    assert!(storage.find_cache(&origin("a"), false).await.unwrap().is_none());

    let dummy = engine.handle_for(&"a".into()).await.unwrap();
    assert!(dummy.is_deleted());
    assert_eq!(dummy.resume_count(), 0);

    match events.recv().await.unwrap() {
        CoreEvent::Cache(CacheEvent::PersistenceFailed { media_id, .. }) => {
            assert_eq!(media_id, "a");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_restore_listing_failure_restores_nothing() {
    let mut fs = MockFs::new();
    fs.expect_exists().returning(|_| Ok(true));
    fs.expect_list_directory()
        .returning(|_| Err(BridgeError::NotAvailable("listing".to_string())));

    let config = CacheStorageConfig::builder()
        .media_source_id("local")
        .metadata_dir("/records")
        .file_system(Arc::new(fs))
        .build()
        .unwrap();
    let storage =
        DirectoryCacheStorage::new(config, Arc::new(DummyCacheEngine::new())).unwrap();

    assert_eq!(storage.wait_restored().await.unwrap(), RestoreReport::default());
    assert_eq!(storage.count(), 0);
}

// ============================================================================
// Restore Scan
// ============================================================================

#[tokio::test]
async fn test_restore_all_records() {
    let root = TempDir::new().unwrap();
    let ids: Vec<String> = (0..5).map(|i| format!("dmhy.{}", i)).collect();

    {
        let engine = Arc::new(DummyCacheEngine::new());
        let storage = open(root.path(), &engine);
        storage.wait_restored().await.unwrap();
        for id in &ids {
            storage.cache(&origin(id), &metadata(), false).await.unwrap();
        }
        storage.close().await;
    }

    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    let report = storage.wait_restored().await.unwrap();

    assert_eq!(report.restored, 5);
    assert_eq!(report.skipped(), 0);
    assert_eq!(storage.count(), 5);
    assert_eq!(engine.restore_count(), 5);
    for id in &ids {
        assert!(storage.find_cache(&origin(id), false).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_restore_skips_corrupt_records_and_keeps_them() {
    let root = TempDir::new().unwrap();
    let valid = SaveRecord::new(origin("good"), metadata()).to_bytes().unwrap();
    write_raw_record(root.path(), &record_name("good"), &valid);
    write_raw_record(root.path(), "broken.metadata", b"{ not json");
    write_raw_record(root.path(), "README.txt", b"ignored");

    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    let report = storage.wait_restored().await.unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.skipped_corrupt, 1);
    assert_eq!(report.total(), 2);
    assert_eq!(storage.count(), 1);
    assert!(records_dir(root.path()).join("broken.metadata").exists());
}

#[tokio::test]
async fn test_restore_skips_engine_rejections() {
    let root = TempDir::new().unwrap();
    for id in ["kept", "gone"] {
        let bytes = SaveRecord::new(origin(id), metadata()).to_bytes().unwrap();
        write_raw_record(root.path(), &record_name(id), &bytes);
    }

    let engine = Arc::new(DummyCacheEngine::new());
    engine.reject_restore("gone").await;
    let storage = open(root.path(), &engine);
    let report = storage.wait_restored().await.unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.skipped_rejected, 1);
    assert!(storage.find_cache(&origin("gone"), false).await.unwrap().is_none());
    assert!(storage.find_cache(&origin("kept"), false).await.unwrap().is_some());
    assert!(records_dir(root.path()).join(record_name("gone")).exists());
}

#[tokio::test]
async fn test_restore_skips_engine_errors() {
    let root = TempDir::new().unwrap();
    let bytes = SaveRecord::new(origin("broken-payload"), metadata()).to_bytes().unwrap();
    write_raw_record(root.path(), &record_name("broken-payload"), &bytes);

    let mut engine = MockEngine::new();
    engine
        .expect_restore()
        .times(1)
        .returning(|_, _, _| Err(CacheError::engine("payload checksum mismatch")));
    engine.expect_create_cache().never();

    let storage = DirectoryCacheStorage::new(config(root.path()), Arc::new(engine)).unwrap();
    let report = storage.wait_restored().await.unwrap();

    assert_eq!(report.restored, 0);
    assert_eq!(report.skipped_rejected, 1);
    assert_eq!(storage.count(), 0);
    assert!(records_dir(root.path()).join(record_name("broken-payload")).exists());
}

#[tokio::test]
async fn test_restore_duplicate_records_keep_first() {
    let root = TempDir::new().unwrap();
    let first = SaveRecord::new(origin("dup"), CacheMetadata::new("s", "first"))
        .to_bytes()
        .unwrap();
    let second = SaveRecord::new(origin("dup"), CacheMetadata::new("s", "second"))
        .to_bytes()
        .unwrap();
    write_raw_record(root.path(), "aaaa.metadata", &first);
    write_raw_record(root.path(), "zzzz.metadata", &second);

    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    let report = storage.wait_restored().await.unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.skipped_duplicate, 1);
    assert_eq!(storage.count(), 1);
    assert_eq!(storage.list()[0].metadata().episode_id, "first");

    assert_eq!(engine.restore_count(), 1);
    let handles = engine.handles().await;
    assert_eq!(handles.len(), 1);
    assert!(!handles[0].is_closed());
    assert!(!handles[0].is_deleted());
}

#[tokio::test]
async fn test_restore_tolerates_unknown_record_fields() {
    let root = TempDir::new().unwrap();
    let mut record =
        serde_json::to_value(SaveRecord::new(origin("newer"), metadata())).unwrap();
    record["written_by"] = serde_json::json!("a later release");
    record["metadata"]["playback_position"] = serde_json::json!(1234);
    write_raw_record(
        root.path(),
        &record_name("newer"),
        &serde_json::to_vec(&record).unwrap(),
    );

    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    let report = storage.wait_restored().await.unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.skipped_corrupt, 0);
    assert_eq!(storage.list()[0].metadata(), &metadata());
}

#[tokio::test]
async fn test_restore_disabled() {
    let root = TempDir::new().unwrap();
    let bytes = SaveRecord::new(origin("a"), metadata()).to_bytes().unwrap();
    write_raw_record(root.path(), &record_name("a"), &bytes);

    let mut config = config(root.path());
    config.restore_on_start = false;
    let engine = Arc::new(DummyCacheEngine::new());
    let storage = DirectoryCacheStorage::new(config, Arc::clone(&engine) as _).unwrap();

    assert_eq!(storage.wait_restored().await.unwrap(), RestoreReport::default());
    assert_eq!(storage.count(), 0);
    assert_eq!(engine.restore_count(), 0);
}

// ============================================================================
// Aggregate Views
// ============================================================================

#[tokio::test]
async fn test_total_size_tracks_live_handles() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new().with_initial_size(100));
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();

    let mut total = storage.subscribe_total_size();
    let mut count = storage.subscribe_count();

    for id in ["a", "b", "c"] {
        storage.cache(&origin(id), &metadata(), false).await.unwrap();
    }
    settle(&mut count, 3).await;
    settle(&mut total, 300).await;

    engine.handle_for(&"a".into()).await.unwrap().set_size(1_000);
    engine.handle_for(&"c".into()).await.unwrap().set_size(50);
    settle(&mut total, 1_150).await;

    storage.delete(&origin("b")).await.unwrap();
    settle(&mut count, 2).await;
    settle(&mut total, 1_050).await;
    assert_eq!(storage.total_size(), 1_050);
}

#[tokio::test]
async fn test_stats_passthrough() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();

    storage.cache(&origin("a"), &metadata(), true).await.unwrap();
    storage.cache(&origin("b"), &metadata(), false).await.unwrap();

    assert_eq!(storage.stats().await.active_transfers, 1);
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_lifecycle_events() {
    let root = TempDir::new().unwrap();
    let bus = EventBus::new(32);
    let mut events = bus.subscribe();

    let mut config = config(root.path());
    config.event_bus = Some(bus);
    let storage = DirectoryCacheStorage::new(config, Arc::new(DummyCacheEngine::new())).unwrap();
    storage.wait_restored().await.unwrap();

    storage.cache(&origin("a"), &metadata(), false).await.unwrap();
    storage.delete(&origin("a")).await.unwrap();

    let mut received = Vec::new();
    for _ in 0..3 {
        match events.recv().await.unwrap() {
            CoreEvent::Cache(event) => {
                assert_eq!(event.media_source_id(), "local");
                received.push(event);
            }
        }
    }

    assert!(matches!(
        received[0],
        CacheEvent::RestoreCompleted {
            restored: 0,
            skipped: 0,
            ..
        }
    ));
    assert!(matches!(&received[1], CacheEvent::Created { media_id, .. } if media_id == "a"));
    assert!(matches!(&received[2], CacheEvent::Deleted { media_id, .. } if media_id == "a"));
}

// ============================================================================
// Closing
// ============================================================================

#[tokio::test]
async fn test_closed_storage_rejects_operations_but_keeps_records() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new());
    let storage = open(root.path(), &engine);
    storage.wait_restored().await.unwrap();
    storage.cache(&origin("a"), &metadata(), false).await.unwrap();

    storage.close().await;

    assert!(engine.is_closed());
    assert!(matches!(
        storage.find_cache(&origin("a"), false).await,
        Err(CacheError::Closed)
    ));
    assert_eq!(files_in(&records_dir(root.path())), vec![record_name("a")]);
}
