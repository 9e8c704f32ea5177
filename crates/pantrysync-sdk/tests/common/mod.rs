//! 集成测试公共设施：进程内远端（真实服务端逻辑，无 HTTP 层）

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pantrysync_protocol::{
    ChangeAction, ChangesResponse, ClientChange, EntityKind, LocationNode, PushResponse,
    SnapshotResponse,
};
use pantrysync_sdk::{PantrySyncError, Result, SyncRemote};
use pantrysync_server::{ServerStore, SyncService};
use serde_json::json;

pub const HOUSEHOLD: u64 = 1;

/// 测试日志输出（重复调用安全）
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// 进程内远端：SDK 的 SyncRemote 直连服务端 SyncService
pub struct InProcessRemote {
    service: SyncService,
    /// 每次网络调用前人为挂起（0 = 不挂起），用于在途竞争测试
    pub latency: Duration,
    pub snapshot_calls: AtomicUsize,
    pub changes_calls: AtomicUsize,
}

impl InProcessRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            service: SyncService::new(ServerStore::open_in_memory().unwrap()),
            latency: Duration::ZERO,
            snapshot_calls: AtomicUsize::new(0),
            changes_calls: AtomicUsize::new(0),
        })
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            service: SyncService::new(ServerStore::open_in_memory().unwrap()),
            latency,
            snapshot_calls: AtomicUsize::new(0),
            changes_calls: AtomicUsize::new(0),
        })
    }

    pub fn service(&self) -> &SyncService {
        &self.service
    }

    /// 服务端直接灌入一批变更（模拟其他设备的写入）
    pub async fn seed(&self, changes: &[ClientChange]) {
        let response = self.service.push_changes(HOUSEHOLD, changes).await.unwrap();
        assert!(
            response.results.iter().all(|r| r.success),
            "seed 变更被拒绝: {:?}",
            response.results
        );
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn remote_err(e: pantrysync_server::ServerError) -> PantrySyncError {
    PantrySyncError::Remote(e.to_string())
}

#[async_trait]
impl SyncRemote for InProcessRemote {
    async fn fetch_snapshot(&self, household_id: u64) -> Result<SnapshotResponse> {
        self.pause().await;
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.service
            .get_full_snapshot(household_id)
            .await
            .map_err(remote_err)
    }

    async fn fetch_changes(
        &self,
        household_id: u64,
        since: Option<&str>,
    ) -> Result<ChangesResponse> {
        self.pause().await;
        self.changes_calls.fetch_add(1, Ordering::SeqCst);
        self.service
            .get_changes_since(household_id, since)
            .await
            .map_err(remote_err)
    }

    async fn push_changes(
        &self,
        household_id: u64,
        changes: &[ClientChange],
    ) -> Result<PushResponse> {
        self.pause().await;
        self.service
            .push_changes(household_id, changes)
            .await
            .map_err(remote_err)
    }

    async fn fetch_location_tree(&self, household_id: u64) -> Result<Vec<LocationNode>> {
        self.pause().await;
        self.service
            .get_location_tree(household_id)
            .await
            .map_err(remote_err)
    }
}

/// 任何调用都失败的远端，用于验证失败不推进游标
pub struct FailingRemote;

#[async_trait]
impl SyncRemote for FailingRemote {
    async fn fetch_snapshot(&self, _household_id: u64) -> Result<SnapshotResponse> {
        Err(PantrySyncError::Remote("connection refused".to_string()))
    }

    async fn fetch_changes(
        &self,
        _household_id: u64,
        _since: Option<&str>,
    ) -> Result<ChangesResponse> {
        Err(PantrySyncError::Remote("connection refused".to_string()))
    }

    async fn push_changes(
        &self,
        _household_id: u64,
        _changes: &[ClientChange],
    ) -> Result<PushResponse> {
        Err(PantrySyncError::Remote("connection refused".to_string()))
    }

    async fn fetch_location_tree(&self, _household_id: u64) -> Result<Vec<LocationNode>> {
        Err(PantrySyncError::Remote("connection refused".to_string()))
    }
}

pub fn product(id: &str, name: &str) -> ClientChange {
    ClientChange::new(
        EntityKind::Product,
        id,
        ChangeAction::Create,
        Some(json!({ "name": name })),
    )
}

pub fn location(id: &str, name: &str) -> ClientChange {
    ClientChange::new(
        EntityKind::Location,
        id,
        ChangeAction::Create,
        Some(json!({ "name": name })),
    )
}

pub fn grocery(id: &str, name: &str, quantity: f64) -> ClientChange {
    ClientChange::new(
        EntityKind::Grocery,
        id,
        ChangeAction::Create,
        Some(json!({ "name": name, "quantity": quantity })),
    )
}

pub fn inventory(id: &str, action: ChangeAction, quantity: f64) -> ClientChange {
    ClientChange::new(
        EntityKind::Inventory,
        id,
        action,
        Some(json!({ "product_id": "p-1", "location_id": "l-1", "quantity": quantity })),
    )
}

/// 最小目录：一件商品 + 一个位置
pub async fn seed_catalog(remote: &InProcessRemote) {
    remote.seed(&[product("p-1", "牛奶"), location("l-1", "冰箱")]).await;
}
