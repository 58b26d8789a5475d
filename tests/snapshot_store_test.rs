// ==========================================
// 快照仓集成测试
// ==========================================
// 测试目标:
//   - 刷新失败保留上一份快照并发布事件
//   - 失效标记 / TTL 触发刷新
//   - 正在进行的求值不受替换影响
//   - SQLite 来源的管理端写入在刷新后可见
// ==========================================

mod test_helpers;

use sku_resolution::domain::{CatalogEntry, MatchType};
use sku_resolution::engine::{
    spawn_refresh_loop, SnapshotError, SnapshotOptions, SnapshotStore,
};
use sku_resolution::logging;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{
    create_test_db, fixture_catalog, fixture_rules, seed_reference_data, CollectingEventPublisher,
    ToggleSource,
};

fn toggle_store(ttl: Duration) -> (Arc<ToggleSource>, Arc<CollectingEventPublisher>, SnapshotStore) {
    let source = Arc::new(ToggleSource::new(fixture_catalog(), fixture_rules()));
    let publisher = Arc::new(CollectingEventPublisher::default());
    let store = SnapshotStore::load(
        source.clone(),
        publisher.clone(),
        SnapshotOptions::default(),
        ttl,
    )
    .expect("初始快照加载失败");
    (source, publisher, store)
}

#[test]
fn test_initial_load_publishes_reloaded_event() {
    logging::init_test();
    let (_source, publisher, store) = toggle_store(Duration::from_secs(300));

    assert_eq!(publisher.count("SnapshotReloaded"), 1);
    assert_eq!(store.current().stats().catalog_entries, 3);
    assert!(!store.is_stale());
}

#[test]
fn test_failed_initial_load_returns_error() {
    let source = Arc::new(ToggleSource::new(fixture_catalog(), fixture_rules()));
    source.set_failing(true);
    let publisher = Arc::new(CollectingEventPublisher::default());

    let result = SnapshotStore::load(
        source.clone(),
        publisher.clone(),
        SnapshotOptions::default(),
        Duration::from_secs(300),
    );

    // 首次加载失败不返回快照仓，调用方无法拿到空快照
    assert!(matches!(result, Err(SnapshotError::SourceError { .. })));
    assert_eq!(publisher.count("SnapshotReloadFailed"), 1);
    assert_eq!(publisher.count("SnapshotReloaded"), 0);
}

#[test]
fn test_failed_reload_keeps_last_good_snapshot() {
    let (source, publisher, store) = toggle_store(Duration::from_secs(300));
    let before = store.current().snapshot_id().to_string();

    source.set_failing(true);
    store.invalidate();
    let err = store.reload().unwrap_err();
    assert!(matches!(err, SnapshotError::SourceError { ref stream, .. } if stream == "catalog"));

    assert_eq!(store.current().snapshot_id(), before);
    assert_eq!(publisher.count("SnapshotReloadFailed"), 1);
    assert_eq!(
        store.engine().resolve("BAKC_U04010", "relbase").match_type,
        MatchType::ExactMatch
    );

    // 失败后仍保持失效状态，下次检查继续重试
    assert!(store.is_stale());
    source.set_failing(false);
    assert!(store.reload_if_stale().unwrap());
    assert_ne!(store.current().snapshot_id(), before);
}

#[test]
fn test_empty_catalog_is_rejected() {
    let (source, _publisher, store) = toggle_store(Duration::from_secs(300));
    let before = store.current().snapshot_id().to_string();

    let mut retired = CatalogEntry::new("OLD_SKU_0001", 1);
    retired.is_active = false;
    source.set_catalog(vec![retired]);
    let err = store.reload().unwrap_err();

    assert!(matches!(err, SnapshotError::EmptyCatalog(_)));
    assert_eq!(store.current().snapshot_id(), before);
}

#[test]
fn test_in_flight_snapshot_survives_swap() {
    let (source, _publisher, store) = toggle_store(Duration::from_secs(300));
    let in_flight = store.engine();

    source.set_catalog(vec![CatalogEntry::new("NEW_SKU_0001", 1)]);
    store.reload().unwrap();

    // 旧引擎继续看到旧快照
    assert!(in_flight.resolve("BAKC_U04010", "relbase").is_resolved());
    assert!(!in_flight.resolve("NEW_SKU_0001", "relbase").is_resolved());

    // 新请求看到新快照
    let fresh = store.engine();
    assert!(fresh.resolve("NEW_SKU_0001", "relbase").is_resolved());
    assert!(!fresh.resolve("BAKC_U04010", "relbase").is_resolved());
}

#[test]
fn test_reload_if_stale_respects_ttl_and_invalidate() {
    let (source, _publisher, store) = toggle_store(Duration::from_secs(300));
    let loads = source.loads();

    assert!(!store.reload_if_stale().unwrap());
    assert_eq!(source.loads(), loads);

    store.invalidate();
    assert!(store.reload_if_stale().unwrap());
    assert_eq!(source.loads(), loads + 1);

    let (_source, _publisher, zero_ttl) = toggle_store(Duration::from_secs(0));
    assert!(zero_ttl.is_stale());
}

#[test]
fn test_sub_second_ttl_is_not_truncated() {
    let (_source, _publisher, store) = toggle_store(Duration::from_millis(800));

    // 刚加载完成，800ms 内不应过期
    assert!(!store.is_stale());

    std::thread::sleep(Duration::from_millis(900));
    assert!(store.is_stale());
}

#[tokio::test]
async fn test_background_refresh_loop_picks_up_changes() {
    let source = Arc::new(ToggleSource::new(fixture_catalog(), fixture_rules()));
    let publisher = Arc::new(CollectingEventPublisher::default());
    let store = Arc::new(
        SnapshotStore::load(
            source.clone(),
            publisher.clone(),
            SnapshotOptions::default(),
            Duration::from_secs(300),
        )
        .unwrap(),
    );

    let handle = spawn_refresh_loop(store.clone(), Duration::from_millis(10));

    source.set_catalog(vec![CatalogEntry::new("NEW_SKU_0001", 1)]);
    store.invalidate();

    let mut refreshed = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if store.engine().resolve("NEW_SKU_0001", "relbase").is_resolved() {
            refreshed = true;
            break;
        }
    }
    handle.abort();

    assert!(refreshed, "后台刷新应在失效后替换快照");
    assert!(publisher.count("SnapshotReloaded") >= 2);
}

#[test]
fn test_sqlite_source_admin_write_visible_after_invalidate() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let source = Arc::new(seed_reference_data(&db_path).expect("Failed to seed reference data"));
    let publisher = Arc::new(CollectingEventPublisher::default());
    let store = SnapshotStore::load(
        source.clone(),
        publisher,
        SnapshotOptions::default(),
        Duration::from_secs(300),
    )
    .expect("Failed to load snapshot");

    let keeper = store.engine().resolve("KEEPERPACK", "shopify");
    assert_eq!(store.engine().convert(&keeper, 7), 35);

    source
        .catalog_repo()
        .upsert(&CatalogEntry::new("ALMC_U10010", 10))
        .unwrap();
    source.rule_repo().deactivate("r_keeperpack").unwrap();

    // 写入后未失效前，引擎仍用旧快照
    assert!(!store.engine().resolve("ALMC_U10010", "relbase").is_resolved());

    store.invalidate();
    assert!(store.reload_if_stale().unwrap());

    let engine = store.engine();
    let result = engine.resolve("ALMC_U10010", "relbase");
    assert_eq!(engine.convert(&result, 3), 30);
    assert!(!engine.resolve("KEEPERPACK", "shopify").is_resolved());
}
