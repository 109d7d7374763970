//! Integration tests for querying caches
//!
//! Covers the cache exposed as a media source and the manager spanning
//! several storages.

use bridge_desktop::TokioFileSystem;
use core_cache::{
    CacheMediaSource, CacheMetadata, CacheStorageConfig, ConnectionStatus, DirectoryCacheStorage,
    DummyCacheEngine, MatchKind, MediaCacheManager, MediaCacheStorage, MediaFetchRequest,
    MediaSource, MediaSourceKind, MediaSourceLocation, OriginMedia, ResourceLocation,
};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

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
        format!("[Group] Frieren - {}", id),
    )
}

fn exact_metadata() -> CacheMetadata {
    CacheMetadata::new("subject-1", "episode-3")
        .with_subject_names(["Frieren"])
        .with_episode_sort("3")
}

fn fuzzy_metadata() -> CacheMetadata {
    CacheMetadata::new("mirror-subject-9", "mirror-episode-41")
        .with_subject_names(["frieren", "Sousou no Frieren"])
        .with_episode_sort("03")
}

fn unrelated_metadata() -> CacheMetadata {
    CacheMetadata::new("subject-2", "episode-7")
        .with_subject_names(["Dungeon Meshi"])
        .with_episode_sort("7")
}

fn request() -> MediaFetchRequest {
    MediaFetchRequest::new("subject-1", "episode-3")
        .with_subject_names(["Frieren"])
        .with_episode_sort("3")
}

async fn open(
    root: &Path,
    id: &str,
    engine: Arc<DummyCacheEngine>,
) -> Arc<dyn MediaCacheStorage> {
    let config = CacheStorageConfig::builder()
        .media_source_id(id)
        .metadata_dir(root.join(id))
        .file_system(Arc::new(TokioFileSystem::with_directories(
            root.to_path_buf(),
            root.to_path_buf(),
        )))
        .build()
        .unwrap();
    let storage = Arc::new(DirectoryCacheStorage::new(config, engine).unwrap());
    storage.wait_restored().await.unwrap();
    storage
}

// ============================================================================
// Cache Media Source
// ============================================================================

#[tokio::test]
async fn test_source_identity() {
    let root = TempDir::new().unwrap();
    let storage = open(root.path(), "local", Arc::new(DummyCacheEngine::new())).await;
    let source = CacheMediaSource::new(&storage);

    assert_eq!(source.id(), "local");
    assert_eq!(source.location(), MediaSourceLocation::Local);
    assert_eq!(source.kind(), MediaSourceKind::LocalCache);
    assert_eq!(source.check_connection().await, ConnectionStatus::Success);
}

#[tokio::test]
async fn test_fetch_without_matches_is_empty_success() {
    let root = TempDir::new().unwrap();
    let storage = open(root.path(), "local", Arc::new(DummyCacheEngine::new())).await;
    storage
        .cache(&origin("other"), &unrelated_metadata(), false)
        .await
        .unwrap();

    let source = CacheMediaSource::new(&storage);
    let result = source.fetch(&request()).await.unwrap();

    assert!(result.is_empty());
    assert_eq!(result.total_size(), 0);
}

#[tokio::test]
async fn test_fetch_ranks_exact_before_fuzzy() {
    let root = TempDir::new().unwrap();
    let engine = Arc::new(DummyCacheEngine::new().with_payload_dir("/downloads"));
    let storage = open(root.path(), "local", engine).await;

    storage.cache(&origin("fuzzy"), &fuzzy_metadata(), false).await.unwrap();
    storage.cache(&origin("other"), &unrelated_metadata(), false).await.unwrap();
    storage.cache(&origin("exact"), &exact_metadata(), false).await.unwrap();

    let source = CacheMediaSource::new(&storage);
    let result = source.fetch(&request()).await.unwrap();

    assert_eq!(result.total_size(), 2);
    let matches = result.into_items();
    assert_eq!(matches[0].kind, MatchKind::Exact);
    assert_eq!(matches[0].media.media_id, "local:exact");
    assert_eq!(matches[0].media.origin, origin("exact"));
    assert_eq!(matches[0].media.kind, MediaSourceKind::LocalCache);
    assert!(matches[0].media.download.is_local());
    assert_eq!(matches[1].kind, MatchKind::Fuzzy);
    assert_eq!(matches[1].media.media_id, "local:fuzzy");
}

#[tokio::test]
async fn test_fetch_result_is_a_snapshot() {
    let root = TempDir::new().unwrap();
    let storage = open(root.path(), "local", Arc::new(DummyCacheEngine::new())).await;
    storage.cache(&origin("exact"), &exact_metadata(), false).await.unwrap();

    let source = CacheMediaSource::new(&storage);
    let result = source.fetch(&request()).await.unwrap();
    storage.delete(&origin("exact")).await.unwrap();

    let streamed: Vec<_> = result.into_stream().collect().await;
    assert_eq!(streamed.len(), 1);
    assert!(source.fetch(&request()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_after_storage_dropped() {
    let root = TempDir::new().unwrap();
    let storage = open(root.path(), "local", Arc::new(DummyCacheEngine::new())).await;
    storage.cache(&origin("exact"), &exact_metadata(), false).await.unwrap();

    let source = CacheMediaSource::new(&storage);
    drop(storage);

    let result = source.fetch(&request()).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(source.id(), "local");
}

// ============================================================================
// Cache Manager
// ============================================================================

#[tokio::test]
async fn test_manager_spans_storages() {
    let root = TempDir::new().unwrap();
    let bt_engine = Arc::new(DummyCacheEngine::new().with_initial_size(10));
    let web_engine = Arc::new(DummyCacheEngine::new().with_initial_size(5));
    let bt = open(root.path(), "bt", Arc::clone(&bt_engine)).await;
    let web = open(root.path(), "web", Arc::clone(&web_engine)).await;

    bt.cache(&origin("a"), &exact_metadata(), false).await.unwrap();
    web.cache(&origin("b"), &exact_metadata(), false).await.unwrap();
    web.cache(&origin("c"), &unrelated_metadata(), false).await.unwrap();

    let manager = MediaCacheManager::new(vec![Arc::clone(&bt), Arc::clone(&web)]);

    assert_eq!(manager.total_count(), 3);
    assert_eq!(manager.list_all().len(), 3);
    assert_eq!(manager.storage("web").unwrap().count(), 2);
    assert!(manager.storage("missing").is_none());

    let found = manager.find_first_cache(&origin("b")).await.unwrap().unwrap();
    assert_eq!(found.origin().media_id.as_str(), "b");
    assert!(manager.find_first_cache(&origin("zzz")).await.unwrap().is_none());

    let episode = manager.find_caches_for_episode("subject-1", "episode-3");
    let ids: Vec<&str> = episode.iter().map(|h| h.origin().media_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_manager_delete_and_close() {
    let root = TempDir::new().unwrap();
    let bt_engine = Arc::new(DummyCacheEngine::new());
    let web_engine = Arc::new(DummyCacheEngine::new());
    let bt = open(root.path(), "bt", Arc::clone(&bt_engine)).await;
    let web = open(root.path(), "web", Arc::clone(&web_engine)).await;
    web.cache(&origin("a"), &exact_metadata(), false).await.unwrap();

    let manager = MediaCacheManager::new(vec![bt, web]);

    assert!(manager.delete_first(&origin("a")).await.unwrap());
    assert!(!manager.delete_first(&origin("a")).await.unwrap());
    assert_eq!(manager.total_count(), 0);

    manager.close_all().await;
    assert!(bt_engine.is_closed());
    assert!(web_engine.is_closed());
    assert!(manager.find_first_cache(&origin("a")).await.unwrap().is_none());
}
