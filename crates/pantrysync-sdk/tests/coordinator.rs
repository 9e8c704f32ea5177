//! 协调器行为测试：防抖、节流、单飞行、失败不推进游标
//!
//! 时间参数按测试缩短（防抖 50ms / 节流 200ms），语义与生产配置一致。

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{inventory, seed_catalog, FailingRemote, InProcessRemote, HOUSEHOLD};
use pantrysync_protocol::{format_cursor, ChangeAction};
use pantrysync_sdk::{
    CoordinatorConfig, CursorStore, PantrySyncError, StorageManager, SyncCoordinator, SyncEngine,
    SyncOutcome, SyncReason, SyncRemote,
};
use tempfile::TempDir;

const DEBOUNCE: Duration = Duration::from_millis(50);
const MIN_INTERVAL: Duration = Duration::from_millis(200);

async fn coordinator_with(
    remote: Arc<dyn SyncRemote>,
) -> (Arc<SyncCoordinator>, CursorStore, TempDir) {
    common::init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let storage = StorageManager::new(temp_dir.path()).await.unwrap();
    let cursor_store = CursorStore::new(Arc::new(storage.kv_store()));
    let engine = Arc::new(SyncEngine::new(remote, storage));
    let config = CoordinatorConfig {
        after_action_debounce: DEBOUNCE,
        app_active_min_interval: MIN_INTERVAL,
    };
    let coordinator = SyncCoordinator::new(engine, cursor_store.clone(), config);
    (coordinator, cursor_store, temp_dir)
}

#[tokio::test]
async fn after_action_burst_collapses_into_one_sync() {
    let remote = InProcessRemote::new();
    seed_catalog(&remote).await;

    let (coordinator, _cursors, _dir) =
        coordinator_with(Arc::clone(&remote) as Arc<dyn SyncRemote>).await;
    coordinator.sync_now(HOUSEHOLD, SyncReason::Bootstrap).await.unwrap();
    // bootstrap 本身拉一次完整日志
    let baseline = remote.changes_calls.load(Ordering::SeqCst);

    // 快速连续 5 次本地操作：只有最后一次计时落地
    for _ in 0..5 {
        coordinator.request_sync(HOUSEHOLD, SyncReason::AfterAction);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(DEBOUNCE * 3).await;

    assert_eq!(remote.changes_calls.load(Ordering::SeqCst), baseline + 1);
}

#[tokio::test]
async fn replacing_a_timer_about_to_fire_still_coalesces() {
    let remote = InProcessRemote::new();
    seed_catalog(&remote).await;

    let (coordinator, _cursors, _dir) =
        coordinator_with(Arc::clone(&remote) as Arc<dyn SyncRemote>).await;
    coordinator.sync_now(HOUSEHOLD, SyncReason::Bootstrap).await.unwrap();
    let baseline = remote.changes_calls.load(Ordering::SeqCst);

    // 每次新触发都落在上一个计时即将到期的边沿：被取代的计时任务
    // 不得落地，也不得摘掉接替者的槽位
    for _ in 0..4 {
        coordinator.request_sync(HOUSEHOLD, SyncReason::AfterAction);
        tokio::time::sleep(DEBOUNCE - Duration::from_millis(15)).await;
    }
    tokio::time::sleep(DEBOUNCE * 3).await;
    assert_eq!(remote.changes_calls.load(Ordering::SeqCst), baseline + 1);

    // 槽位未被孤立：后续单次触发仍然恰好一次
    coordinator.request_sync(HOUSEHOLD, SyncReason::AfterAction);
    tokio::time::sleep(DEBOUNCE * 3).await;
    assert_eq!(remote.changes_calls.load(Ordering::SeqCst), baseline + 2);
}

#[tokio::test]
async fn app_active_is_throttled_within_the_window() {
    let remote = InProcessRemote::new();
    seed_catalog(&remote).await;

    let (coordinator, _cursors, _dir) =
        coordinator_with(Arc::clone(&remote) as Arc<dyn SyncRemote>).await;
    coordinator.sync_now(HOUSEHOLD, SyncReason::Bootstrap).await.unwrap();
    let baseline = remote.changes_calls.load(Ordering::SeqCst);

    // 窗口内：跳过
    let outcome = coordinator.sync_now(HOUSEHOLD, SyncReason::AppActive).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Throttled);
    assert_eq!(remote.changes_calls.load(Ordering::SeqCst), baseline);

    // 窗口外：执行
    tokio::time::sleep(MIN_INTERVAL + Duration::from_millis(20)).await;
    let outcome = coordinator.sync_now(HOUSEHOLD, SyncReason::AppActive).await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Completed { .. }));
    assert_eq!(remote.changes_calls.load(Ordering::SeqCst), baseline + 1);
}

#[tokio::test]
async fn pull_to_refresh_bypasses_the_throttle() {
    let remote = InProcessRemote::new();
    seed_catalog(&remote).await;

    let (coordinator, _cursors, _dir) =
        coordinator_with(Arc::clone(&remote) as Arc<dyn SyncRemote>).await;
    coordinator.sync_now(HOUSEHOLD, SyncReason::Bootstrap).await.unwrap();

    let outcome = coordinator
        .sync_now(HOUSEHOLD, SyncReason::PullToRefresh)
        .await
        .unwrap();
    assert!(matches!(outcome, SyncOutcome::Completed { .. }));
}

#[tokio::test]
async fn concurrent_request_yields_already_in_flight() {
    let remote = InProcessRemote::with_latency(Duration::from_millis(200));
    seed_catalog(&remote).await;

    let (coordinator, _cursors, _dir) =
        coordinator_with(Arc::clone(&remote) as Arc<dyn SyncRemote>).await;

    let background = Arc::clone(&coordinator);
    let handle = tokio::spawn(async move {
        background.sync_now(HOUSEHOLD, SyncReason::PullToRefresh).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let outcome = coordinator
        .sync_now(HOUSEHOLD, SyncReason::PullToRefresh)
        .await
        .unwrap();
    assert_eq!(outcome, SyncOutcome::AlreadyInFlight);

    // 在途的那次正常完成，且飞行标志已释放
    let first = handle.await.unwrap().unwrap();
    assert!(matches!(first, SyncOutcome::Completed { .. }));
    let again = coordinator
        .sync_now(HOUSEHOLD, SyncReason::PullToRefresh)
        .await
        .unwrap();
    assert!(matches!(again, SyncOutcome::Completed { .. }));
}

#[tokio::test]
async fn failed_sync_never_advances_the_cursor() {
    let (coordinator, cursors, _dir) = coordinator_with(Arc::new(FailingRemote)).await;

    // 无游标 + 失败：仍然无游标，下次还走 bootstrap
    let err = coordinator
        .sync_now(HOUSEHOLD, SyncReason::Bootstrap)
        .await
        .unwrap_err();
    assert!(matches!(err, PantrySyncError::Remote(_)));
    assert!(cursors.get(HOUSEHOLD).await.unwrap().is_none());

    // 有游标 + 失败：游标原封不动
    let cursor = format_cursor(1_700_000_000_000);
    cursors.set(HOUSEHOLD, &cursor).await.unwrap();
    coordinator
        .sync_now(HOUSEHOLD, SyncReason::PullToRefresh)
        .await
        .unwrap_err();
    assert_eq!(cursors.get(HOUSEHOLD).await.unwrap().as_deref(), Some(cursor.as_str()));
}

#[tokio::test]
async fn no_cursor_takes_the_bootstrap_path_then_incremental() {
    let remote = InProcessRemote::new();
    seed_catalog(&remote).await;

    let (coordinator, _cursors, _dir) =
        coordinator_with(Arc::clone(&remote) as Arc<dyn SyncRemote>).await;

    // 首轮：无游标，走全量（快照 + 完整日志各一次）
    coordinator.sync_now(HOUSEHOLD, SyncReason::PullToRefresh).await.unwrap();
    assert_eq!(remote.snapshot_calls.load(Ordering::SeqCst), 1);
    assert_eq!(remote.changes_calls.load(Ordering::SeqCst), 1);

    // 次轮：已有游标，走增量，不再拉快照
    coordinator.sync_now(HOUSEHOLD, SyncReason::PullToRefresh).await.unwrap();
    assert_eq!(remote.snapshot_calls.load(Ordering::SeqCst), 1);
    assert_eq!(remote.changes_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cursors_are_independent_per_household() {
    let remote = InProcessRemote::new();
    seed_catalog(&remote).await;
    remote.seed(&[inventory("itm-1", ChangeAction::Create, 1.0)]).await;

    let (coordinator, cursors, _dir) =
        coordinator_with(Arc::clone(&remote) as Arc<dyn SyncRemote>).await;

    coordinator.sync_now(1, SyncReason::Bootstrap).await.unwrap();
    let cursor_h1 = cursors.get(1).await.unwrap().unwrap();

    // 另一个 household 同步不动 household 1 的游标
    coordinator.sync_now(2, SyncReason::HouseholdSwitch).await.unwrap();
    assert_eq!(cursors.get(1).await.unwrap().as_deref(), Some(cursor_h1.as_str()));
    assert!(cursors.get(2).await.unwrap().is_some());
    assert_eq!(cursors.load_all().await.unwrap().len(), 2);
}
