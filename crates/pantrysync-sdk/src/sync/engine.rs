//! 同步引擎 - bootstrap 与增量两种对账策略
//!
//! 职责：
//! - sync_from_remote：全量快照对账（无游标时的唯一路径）
//! - sync_changes：游标之后的变更流逐条应用
//! - push_outbox：上行本地未确认变更，逐条按服务端结果出队
//!
//! Engine 不做调度、不做重试、不持有游标写权（游标由 Coordinator
//! 在成功后持久化）。失败即返，绝不推进游标。

use std::collections::HashSet;
use std::sync::Arc;

use pantrysync_protocol::{EntityKind, LocationNode};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::{entities::InventoryItem, Location, Product, StorageManager};
use crate::sync::applier;
use crate::sync::remote::SyncRemote;

/// 客户端同步引擎
pub struct SyncEngine {
    remote: Arc<dyn SyncRemote>,
    storage: Arc<StorageManager>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn SyncRemote>, storage: Arc<StorageManager>) -> Self {
        Self { remote, storage }
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    /// 全量 bootstrap：快照 + 位置层级 + 完整变更日志并发拉取，按引用
    /// 顺序落库（locations → products → inventory），并删除远端已不存在
    /// 的本地库存条目。购物清单与 household 不在快照内，从完整日志按序
    /// 重放收敛。返回快照时间作为新游标。
    pub async fn sync_from_remote(&self, household_id: u64) -> Result<String> {
        let (snapshot, tree, log) = tokio::try_join!(
            self.remote.fetch_snapshot(household_id),
            self.remote.fetch_location_tree(household_id),
            self.remote.fetch_changes(household_id, None),
        )?;

        // 1. 位置（先序展平，父节点在前）
        let locations: Vec<Location> = LocationNode::flatten(&tree)
            .into_iter()
            .map(Location::from)
            .collect();
        self.storage.save_locations(&locations).await?;

        // 2. 商品
        let products: Vec<Product> = snapshot.products.into_iter().map(Product::from).collect();
        self.storage.save_products(&products).await?;

        // 3. 库存条目 + 删除检测：本地有、远端无 = 服务端已删
        let remote_ids: HashSet<String> =
            snapshot.inventory.iter().map(|r| r.id.clone()).collect();
        let items: Vec<InventoryItem> = snapshot
            .inventory
            .into_iter()
            .map(InventoryItem::from)
            .collect();
        self.storage.save_inventory_items(&items).await?;

        let mut removed = 0usize;
        for local_id in self.storage.inventory_ids(household_id).await? {
            if !remote_ids.contains(&local_id) {
                self.storage.delete_inventory_item(&local_id).await?;
                removed += 1;
            }
        }

        // 4. 日志重放：快照只覆盖 products / inventory，购物清单与
        //    household 按日志序重放（create 后 delete 自然收敛到不存在）
        let mut replayed = 0usize;
        for entry in &log.changes {
            if matches!(
                entry.kind(),
                Ok(EntityKind::Grocery) | Ok(EntityKind::Household)
            ) {
                applier::apply_entry(&self.storage, entry).await?;
                replayed += 1;
            }
        }

        // 快照和日志并发拉取，服务端落库顺序不确定：游标取两个水位的
        // 较早者，宁可下一轮增量重复应用（幂等）也不能跳过条目
        let cursor = if log.changes.is_empty() || snapshot.server_time <= log.server_time {
            snapshot.server_time
        } else {
            log.server_time
        };

        info!(
            "bootstrap 完成: household_id={}, locations={}, products={}, inventory={}, removed={}, replayed={}",
            household_id,
            locations.len(),
            products.len(),
            remote_ids.len(),
            removed,
            replayed
        );
        Ok(cursor)
    }

    /// 增量同步：应用游标之后的全部变更，返回服务端时间作为新游标
    pub async fn sync_changes(&self, household_id: u64, since: &str) -> Result<String> {
        let response = self.remote.fetch_changes(household_id, Some(since)).await?;
        let count = response.changes.len();

        for entry in &response.changes {
            applier::apply_entry(&self.storage, entry).await?;
        }

        debug!(
            "增量同步完成: household_id={}, since={}, applied={}",
            household_id, since, count
        );
        Ok(response.server_time)
    }

    /// 上行 outbox：服务端逐条确认后出队，失败条目留队重试
    pub async fn push_outbox(&self, household_id: u64) -> Result<()> {
        let pending = self.storage.outbox_pending(household_id).await?;
        if pending.is_empty() {
            return Ok(());
        }

        let changes: Vec<_> = pending.iter().map(|e| e.change.clone()).collect();
        let response = self.remote.push_changes(household_id, &changes).await?;

        for (entry, result) in pending.iter().zip(response.results.iter()) {
            if result.success {
                self.storage.outbox_remove(entry.seq).await?;
            } else {
                warn!(
                    "变更被服务端拒绝，留队重试: seq={}, entity_id={}, error={:?}",
                    entry.seq, entry.change.entity_id, result.error
                );
            }
        }
        info!(
            "outbox 推送: household_id={}, total={}, ok={}",
            household_id,
            pending.len(),
            response.results.iter().filter(|r| r.success).count()
        );
        Ok(())
    }
}
