//! 鉴权 API 边界 - 远端同步接口 trait
//!
//! HTTP 路由、鉴权中间件在别处实现；SDK 只依赖这四个操作。
//! 网络调用是同步流程中仅有的挂起点。

use async_trait::async_trait;
use pantrysync_protocol::{ChangesResponse, ClientChange, LocationNode, PushResponse, SnapshotResponse};

use crate::error::Result;

/// 远端同步服务边界
#[async_trait]
pub trait SyncRemote: Send + Sync {
    /// GET 全量快照（products + inventory，联表描述字段）
    async fn fetch_snapshot(&self, household_id: u64) -> Result<SnapshotResponse>;

    /// GET 变更流；since 缺省时返回整个日志
    async fn fetch_changes(
        &self,
        household_id: u64,
        since: Option<&str>,
    ) -> Result<ChangesResponse>;

    /// POST 推送本地变更，逐条返回成败
    async fn push_changes(
        &self,
        household_id: u64,
        changes: &[ClientChange],
    ) -> Result<PushResponse>;

    /// GET 位置层级树（仅 bootstrap 消费）
    async fn fetch_location_tree(&self, household_id: u64) -> Result<Vec<LocationNode>>;
}
