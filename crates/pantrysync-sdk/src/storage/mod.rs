//! 存储模块 - 客户端本地缓存的数据持久化层
//!
//! 分层设计：
//! - StorageManager: 统一的存储管理器，提供高级 API
//! - DAO Layer: 数据访问层，每张表一个专门的操作模块
//! - Entities: 数据实体定义
//! - KvStore: sled 键值存储（游标映射等小状态）
//!
//! 本地缓存可随时从服务端重建；唯一不可丢的是 outbox 中尚未被
//! 服务端确认的本地变更。

use std::path::Path;
use std::sync::Arc;

use pantrysync_protocol::ClientChange;

use crate::error::Result;

pub mod dao;
pub mod entities;
pub mod kv;
pub mod sqlite;

pub use dao::outbox::OutboxEntry;
pub use entities::*;
pub use kv::KvStore;
pub use sqlite::SqliteStore;

use dao::{GroceryDao, HouseholdDao, InventoryDao, LocationDao, OutboxDao, ProductDao};

/// 统一的存储管理器
pub struct StorageManager {
    sqlite: SqliteStore,
    kv: KvStore,
}

impl StorageManager {
    /// 在数据目录下初始化本地缓存（SQLite + sled）
    pub async fn new(base_path: &Path) -> Result<Arc<Self>> {
        let sqlite = SqliteStore::new(base_path).await?;
        let kv = KvStore::new(base_path).await?;
        Ok(Arc::new(Self { sqlite, kv }))
    }

    pub fn kv_store(&self) -> KvStore {
        self.kv.clone()
    }

    // ============================================================
    // 商品
    // ============================================================

    pub async fn save_products(&self, products: &[Product]) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        let dao = ProductDao::new(&conn);
        for product in products {
            dao.upsert(product)?;
        }
        Ok(())
    }

    pub async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        ProductDao::new(&conn).get_by_id(id)
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        ProductDao::new(&conn).delete(id)
    }

    pub async fn list_products(&self, household_id: u64) -> Result<Vec<Product>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        ProductDao::new(&conn).list_by_household(household_id)
    }

    // ============================================================
    // 位置
    // ============================================================

    pub async fn save_locations(&self, locations: &[Location]) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        let dao = LocationDao::new(&conn);
        for location in locations {
            dao.upsert(location)?;
        }
        Ok(())
    }

    pub async fn get_location(&self, id: &str) -> Result<Option<Location>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        LocationDao::new(&conn).get_by_id(id)
    }

    pub async fn delete_location(&self, id: &str) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        LocationDao::new(&conn).delete(id)
    }

    pub async fn list_locations(&self, household_id: u64) -> Result<Vec<Location>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        LocationDao::new(&conn).list_by_household(household_id)
    }

    // ============================================================
    // 库存条目
    // ============================================================

    pub async fn save_inventory_item(&self, item: &InventoryItem) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        InventoryDao::new(&conn).upsert(item)
    }

    pub async fn save_inventory_items(&self, items: &[InventoryItem]) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        let dao = InventoryDao::new(&conn);
        for item in items {
            dao.upsert(item)?;
        }
        Ok(())
    }

    pub async fn get_inventory_item(&self, id: &str) -> Result<Option<InventoryItem>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        InventoryDao::new(&conn).get_by_id(id)
    }

    pub async fn delete_inventory_item(&self, id: &str) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        InventoryDao::new(&conn).delete(id)
    }

    pub async fn list_inventory(&self, household_id: u64) -> Result<Vec<InventoryItem>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        InventoryDao::new(&conn).list_by_household(household_id)
    }

    pub async fn inventory_ids(&self, household_id: u64) -> Result<Vec<String>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        InventoryDao::new(&conn).ids_by_household(household_id)
    }

    // ============================================================
    // 购物清单
    // ============================================================

    pub async fn save_grocery_item(&self, item: &GroceryItem) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        GroceryDao::new(&conn).upsert(item)
    }

    pub async fn get_grocery_item(&self, id: &str) -> Result<Option<GroceryItem>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        GroceryDao::new(&conn).get_by_id(id)
    }

    pub async fn delete_grocery_item(&self, id: &str) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        GroceryDao::new(&conn).delete(id)
    }

    pub async fn list_grocery(&self, household_id: u64) -> Result<Vec<GroceryItem>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        GroceryDao::new(&conn).list_by_household(household_id)
    }

    // ============================================================
    // household
    // ============================================================

    pub async fn save_household(&self, household: &Household) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        HouseholdDao::new(&conn).upsert(household)
    }

    pub async fn get_household(&self, id: u64) -> Result<Option<Household>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        HouseholdDao::new(&conn).get_by_id(id)
    }

    pub async fn delete_household(&self, id: u64) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        HouseholdDao::new(&conn).delete(id)
    }

    // ============================================================
    // outbox
    // ============================================================

    pub async fn outbox_enqueue(&self, household_id: u64, change: &ClientChange) -> Result<i64> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        OutboxDao::new(&conn).enqueue(household_id, change)
    }

    pub async fn outbox_pending(&self, household_id: u64) -> Result<Vec<OutboxEntry>> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        OutboxDao::new(&conn).pending(household_id)
    }

    pub async fn outbox_remove(&self, seq: i64) -> Result<()> {
        let conn = self.sqlite.connection();
        let conn = conn.lock().await;
        OutboxDao::new(&conn).remove(seq)
    }
}
