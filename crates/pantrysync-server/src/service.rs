//! 同步服务 - 服务端三操作入口
//!
//! 职责：
//! - get_full_snapshot：household 当前权威全量（联表描述字段）
//! - get_changes_since：游标之后的变更流，server_ts 升序
//! - push_changes：逐条事务应用 + 追加变更日志（时间戳服务端分配）
//! - get_location_tree：位置层级，仅 bootstrap 消费
//!
//! 单条变更失败只占用自己的结果槽位，不阻塞同批其他条目。

use std::collections::HashMap;

use pantrysync_protocol::{
    format_cursor, parse_cursor, ChangesResponse, ClientChange, InventoryRecord, LocationNode,
    LocationRecord, ProductRecord, PushResponse, PushResult, SnapshotResponse,
};
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::apply::apply_change;
use crate::change_log::ChangeLogDao;
use crate::clock::HouseholdClock;
use crate::store::ServerStore;
use crate::Result;

/// 服务端同步服务
pub struct SyncService {
    store: ServerStore,
    clock: HouseholdClock,
}

impl SyncService {
    pub fn new(store: ServerStore) -> Self {
        Self {
            store,
            clock: HouseholdClock::new(),
        }
    }

    pub fn store(&self) -> &ServerStore {
        &self.store
    }

    /// household 当前权威全量状态（不分页，household 规模有上限）
    pub async fn get_full_snapshot(&self, household_id: u64) -> Result<SnapshotResponse> {
        let conn = self.store.connection();
        let conn = conn.lock().await;
        self.seed_clock(&conn, household_id)?;

        let products = Self::query_products(&conn, household_id)?;
        let inventory = Self::query_inventory_joined(&conn, household_id)?;
        // 快照时间戳也走单调分配：之后的任何变更必然拿到更大的 server_ts，
        // 持有该游标的客户端不会漏变更
        let server_time = format_cursor(self.clock.allocate(household_id));

        info!(
            "全量快照: household_id={}, products={}, inventory={}",
            household_id,
            products.len(),
            inventory.len()
        );
        Ok(SnapshotResponse {
            products,
            inventory,
            server_time,
        })
    }

    /// 游标之后的全部变更，升序；cursor 缺失或不可解析时返回整个日志
    pub async fn get_changes_since(
        &self,
        household_id: u64,
        cursor: Option<&str>,
    ) -> Result<ChangesResponse> {
        let conn = self.store.connection();
        let conn = conn.lock().await;
        let dao = ChangeLogDao::new(&conn);

        let since = match cursor {
            None => None,
            Some(raw) => match parse_cursor(raw) {
                Some(ms) => Some(ms),
                None => {
                    warn!("游标不可解析，按无游标处理: cursor={}", raw);
                    None
                }
            },
        };
        let changes = dao.list_since(household_id, since)?;

        // server_time 只推进到「已返回条目」的水位：
        // 空流时回显原游标（或日志最大值），避免同毫秒并发写被跳过
        let server_time = match changes.last() {
            Some(last) => last.server_ts.clone(),
            None => match (cursor, since) {
                (Some(raw), Some(_)) => raw.to_string(),
                _ => format_cursor(dao.max_server_ts(household_id)?),
            },
        };
        debug!(
            "变更流: household_id={}, since={:?}, entries={}",
            household_id,
            since,
            changes.len()
        );
        Ok(ChangesResponse {
            changes,
            server_time,
        })
    }

    /// 逐条事务应用客户端变更并追加日志
    ///
    /// 每条变更独立成败：解析失败 / 应用失败只写入自己的结果槽位。
    pub async fn push_changes(
        &self,
        household_id: u64,
        changes: &[ClientChange],
    ) -> Result<PushResponse> {
        let conn = self.store.connection();
        let mut conn = conn.lock().await;
        self.seed_clock(&conn, household_id)?;

        let mut results = Vec::with_capacity(changes.len());
        let mut last_applied_ts: Option<i64> = None;

        for change in changes {
            match self.apply_one(&mut conn, household_id, change) {
                Ok(server_ts) => {
                    last_applied_ts = Some(server_ts);
                    results.push(PushResult {
                        entity_id: change.entity_id.clone(),
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(
                        "变更应用失败: household_id={}, entity_id={}, error={}",
                        household_id, change.entity_id, e
                    );
                    results.push(PushResult {
                        entity_id: change.entity_id.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let server_time = match last_applied_ts {
            Some(ts) => format_cursor(ts),
            None => format_cursor(ChangeLogDao::new(&conn).max_server_ts(household_id)?),
        };
        info!(
            "推送完成: household_id={}, total={}, ok={}",
            household_id,
            changes.len(),
            results.iter().filter(|r| r.success).count()
        );
        Ok(PushResponse {
            results,
            server_time,
        })
    }

    /// 位置层级树（bootstrap 专用）
    pub async fn get_location_tree(&self, household_id: u64) -> Result<Vec<LocationNode>> {
        let conn = self.store.connection();
        let conn = conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT id, household_id, name, parent_id FROM locations
             WHERE household_id = ?1 ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![household_id as i64], |row| {
            Ok(LocationRecord {
                id: row.get(0)?,
                household_id: row.get::<_, i64>(1)? as u64,
                name: row.get(2)?,
                parent_id: row.get(3)?,
            })
        })?;
        let mut all = Vec::new();
        for row in rows {
            all.push(row?);
        }
        Ok(Self::build_tree(all))
    }

    // ============================================================
    // 私有方法
    // ============================================================

    /// 应用单条变更：apply + 日志追加在同一事务内
    fn apply_one(
        &self,
        conn: &mut Connection,
        household_id: u64,
        change: &ClientChange,
    ) -> Result<i64> {
        // 未知 entity_kind / action 是永久失败，进入结果槽位，服务端不重试
        let kind = change.kind()?;
        let action = change.action()?;
        let server_ts = self.clock.allocate(household_id);

        let tx = conn.transaction()?;
        apply_change(
            &tx,
            household_id,
            kind,
            &change.entity_id,
            action,
            change.payload.as_ref(),
            server_ts,
        )?;
        ChangeLogDao::new(&tx).append(
            household_id,
            kind,
            &change.entity_id,
            action,
            change.payload.as_ref(),
            change.client_ts.as_deref(),
            server_ts,
        )?;
        tx.commit()?;
        Ok(server_ts)
    }

    fn seed_clock(&self, conn: &Connection, household_id: u64) -> Result<()> {
        let max = ChangeLogDao::new(conn).max_server_ts(household_id)?;
        self.clock.seed_if_absent(household_id, max);
        Ok(())
    }

    fn query_products(conn: &Connection, household_id: u64) -> Result<Vec<ProductRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, household_id, name, brand, upc, default_location_id
             FROM products WHERE household_id = ?1",
        )?;
        let rows = stmt.query_map(params![household_id as i64], |row| {
            Ok(ProductRecord {
                id: row.get(0)?,
                household_id: row.get::<_, i64>(1)? as u64,
                name: row.get(2)?,
                brand: row.get(3)?,
                upc: row.get(4)?,
                default_location_id: row.get(5)?,
            })
        })?;
        let mut products = Vec::new();
        for row in rows {
            products.push(row?);
        }
        Ok(products)
    }

    fn query_inventory_joined(
        conn: &Connection,
        household_id: u64,
    ) -> Result<Vec<InventoryRecord>> {
        let mut stmt = conn.prepare(
            "SELECT i.id, i.household_id, i.product_id, i.location_id, i.quantity,
                    i.expiration_date, i.notes, p.name, p.brand, l.name
             FROM inventory i
             JOIN products p ON p.id = i.product_id
             JOIN locations l ON l.id = i.location_id
             WHERE i.household_id = ?1",
        )?;
        let rows = stmt.query_map(params![household_id as i64], |row| {
            Ok(InventoryRecord {
                id: row.get(0)?,
                household_id: row.get::<_, i64>(1)? as u64,
                product_id: row.get(2)?,
                location_id: row.get(3)?,
                quantity: row.get(4)?,
                expiration_date: row.get(5)?,
                notes: row.get(6)?,
                product_name: row.get(7)?,
                product_brand: row.get(8)?,
                location_name: row.get(9)?,
            })
        })?;
        let mut inventory = Vec::new();
        for row in rows {
            inventory.push(row?);
        }
        Ok(inventory)
    }

    fn build_tree(all: Vec<LocationRecord>) -> Vec<LocationNode> {
        let ids: std::collections::HashSet<String> = all.iter().map(|l| l.id.clone()).collect();
        let mut children_of: HashMap<String, Vec<LocationRecord>> = HashMap::new();
        let mut roots = Vec::new();
        for loc in all {
            match &loc.parent_id {
                // 父节点不在本 household 内时视为根（数据修复期的容错）
                Some(parent) if ids.contains(parent) => {
                    children_of.entry(parent.clone()).or_default().push(loc);
                }
                _ => roots.push(loc),
            }
        }
        fn attach(
            loc: LocationRecord,
            children_of: &mut HashMap<String, Vec<LocationRecord>>,
        ) -> LocationNode {
            let children = children_of
                .remove(&loc.id)
                .unwrap_or_default()
                .into_iter()
                .map(|c| attach(c, children_of))
                .collect();
            LocationNode {
                location: loc,
                children,
            }
        }
        roots
            .into_iter()
            .map(|loc| attach(loc, &mut children_of))
            .collect()
    }
}
