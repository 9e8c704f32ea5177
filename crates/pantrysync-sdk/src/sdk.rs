//! PantrySync 主入口 - 本地优先的写路径 + 同步编排
//!
//! 写路径三步走，全部本地完成，不等网络：
//! 1. 立即写本地镜像（UI 立即可见）
//! 2. 完整字段集入 outbox（服务端确认前不出队）
//! 3. request_sync(AfterAction) 防抖触发上行
//!
//! 实体 id 客户端生成（UUID v4），离线创建不需要服务端往返。

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use pantrysync_protocol::{
    ChangeAction, ClientChange, EntityKind, GroceryPayload, InventoryPayload,
};
use tracing::info;
use uuid::Uuid;

use crate::error::{PantrySyncError, Result};
use crate::storage::{
    entities::{format_expiration_date, GroceryItem, InventoryItem, Location, Product},
    StorageManager,
};
use crate::sync::{
    CoordinatorConfig, CursorStore, SyncCoordinator, SyncEngine, SyncOutcome, SyncReason,
    SyncRemote,
};

/// SDK 初始化配置
#[derive(Debug, Clone)]
pub struct PantryConfig {
    /// 数据目录（SQLite 缓存 + sled 游标都在此目录下）
    pub data_dir: PathBuf,
    /// 初始激活的 household
    pub household_id: u64,
    pub coordinator: CoordinatorConfig,
}

impl PantryConfig {
    pub fn new(data_dir: impl Into<PathBuf>, household_id: u64) -> Self {
        Self {
            data_dir: data_dir.into(),
            household_id,
            coordinator: CoordinatorConfig::default(),
        }
    }

    pub fn with_coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.coordinator = coordinator;
        self
    }
}

/// SDK 门面
pub struct PantrySync {
    storage: Arc<StorageManager>,
    coordinator: Arc<SyncCoordinator>,
    active_household: AtomicU64,
}

impl PantrySync {
    /// 初始化 SDK：打开本地存储并装配同步组件。不触发网络，
    /// 首次同步由调用方通过 [`PantrySync::bootstrap`] 或
    /// [`PantrySync::request_sync`] 发起。
    pub async fn initialize(config: PantryConfig, remote: Arc<dyn SyncRemote>) -> Result<Arc<Self>> {
        let storage = StorageManager::new(&config.data_dir).await?;
        let cursor_store = CursorStore::new(Arc::new(storage.kv_store()));
        let engine = Arc::new(SyncEngine::new(remote, Arc::clone(&storage)));
        let coordinator = SyncCoordinator::new(engine, cursor_store, config.coordinator);

        info!(
            "SDK 初始化完成: data_dir={:?}, household_id={}",
            config.data_dir, config.household_id
        );
        Ok(Arc::new(Self {
            storage,
            coordinator,
            active_household: AtomicU64::new(config.household_id),
        }))
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn active_household(&self) -> u64 {
        self.active_household.load(Ordering::SeqCst)
    }

    /// 切换激活 household 并立即触发一次同步。每个 household 的游标
    /// 独立持久化，切回时无需重新 bootstrap。
    pub fn switch_household(&self, household_id: u64) {
        let old = self.active_household.swap(household_id, Ordering::SeqCst);
        if old != household_id {
            info!("切换 household: {} -> {}", old, household_id);
            self.coordinator
                .request_sync(household_id, SyncReason::HouseholdSwitch);
        }
    }

    /// 首次同步（或游标丢失后的全量重建），等待完成
    pub async fn bootstrap(&self) -> Result<SyncOutcome> {
        self.coordinator
            .sync_now(self.active_household(), SyncReason::Bootstrap)
            .await
    }

    /// 按 reason 触发后台同步（fire-and-forget）
    pub fn request_sync(&self, reason: SyncReason) {
        self.coordinator.request_sync(self.active_household(), reason);
    }

    /// 触发同步并等待结局（下拉刷新等需要知道结果的场景）
    pub async fn sync_now(&self, reason: SyncReason) -> Result<SyncOutcome> {
        self.coordinator.sync_now(self.active_household(), reason).await
    }

    // ============================================================
    // 库存条目
    // ============================================================

    pub async fn list_inventory(&self) -> Result<Vec<InventoryItem>> {
        self.storage.list_inventory(self.active_household()).await
    }

    /// 新建库存条目：描述字段本地回查，被引用的商品 / 位置必须已在镜像
    pub async fn create_inventory_item(
        &self,
        product_id: &str,
        location_id: &str,
        quantity: f64,
        expiration_date: Option<NaiveDate>,
        notes: Option<String>,
    ) -> Result<InventoryItem> {
        let product = self
            .storage
            .get_product(product_id)
            .await?
            .ok_or_else(|| PantrySyncError::NotFound(format!("product: {}", product_id)))?;
        let location = self
            .storage
            .get_location(location_id)
            .await?
            .ok_or_else(|| PantrySyncError::NotFound(format!("location: {}", location_id)))?;

        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            household_id: self.active_household(),
            product_id: product_id.to_string(),
            location_id: location_id.to_string(),
            quantity,
            expiration_date,
            notes,
            product_name: product.name,
            product_brand: product.brand,
            location_name: location.name,
            updated_at: chrono::Utc::now().timestamp_millis(),
        };
        self.storage.save_inventory_item(&item).await?;
        self.enqueue_inventory_change(&item, ChangeAction::Create).await?;
        Ok(item)
    }

    /// 修改数量。上行仍携带完整字段集（整实体 LWW，不做字段级合并）。
    pub async fn update_inventory_quantity(&self, id: &str, quantity: f64) -> Result<InventoryItem> {
        let mut item = self
            .storage
            .get_inventory_item(id)
            .await?
            .ok_or_else(|| PantrySyncError::NotFound(format!("inventory: {}", id)))?;
        item.quantity = quantity;
        item.updated_at = chrono::Utc::now().timestamp_millis();
        self.storage.save_inventory_item(&item).await?;
        self.enqueue_inventory_change(&item, ChangeAction::Update).await?;
        Ok(item)
    }

    pub async fn delete_inventory_item(&self, id: &str) -> Result<()> {
        let item = self
            .storage
            .get_inventory_item(id)
            .await?
            .ok_or_else(|| PantrySyncError::NotFound(format!("inventory: {}", id)))?;
        self.storage.delete_inventory_item(id).await?;
        self.storage
            .outbox_enqueue(
                item.household_id,
                &ClientChange::new(EntityKind::Inventory, id, ChangeAction::Delete, None),
            )
            .await?;
        self.request_sync(SyncReason::AfterAction);
        Ok(())
    }

    async fn enqueue_inventory_change(
        &self,
        item: &InventoryItem,
        action: ChangeAction,
    ) -> Result<()> {
        let payload = serde_json::to_value(InventoryPayload {
            product_id: item.product_id.clone(),
            location_id: item.location_id.clone(),
            quantity: item.quantity,
            expiration_date: item.expiration_date.as_ref().map(format_expiration_date),
            notes: item.notes.clone(),
        })?;
        self.storage
            .outbox_enqueue(
                item.household_id,
                &ClientChange::new(EntityKind::Inventory, item.id.as_str(), action, Some(payload)),
            )
            .await?;
        self.request_sync(SyncReason::AfterAction);
        Ok(())
    }

    // ============================================================
    // 购物清单
    // ============================================================

    pub async fn list_grocery(&self) -> Result<Vec<GroceryItem>> {
        self.storage.list_grocery(self.active_household()).await
    }

    pub async fn add_grocery_item(
        &self,
        name: &str,
        quantity: f64,
        product_id: Option<String>,
    ) -> Result<GroceryItem> {
        let item = GroceryItem {
            id: Uuid::new_v4().to_string(),
            household_id: self.active_household(),
            name: name.to_string(),
            quantity,
            checked: false,
            product_id,
            updated_at: chrono::Utc::now().timestamp_millis(),
        };
        self.storage.save_grocery_item(&item).await?;
        self.enqueue_grocery_change(&item, ChangeAction::Create).await?;
        Ok(item)
    }

    /// 勾选 / 取消勾选购物清单条目
    pub async fn check_grocery_item(&self, id: &str, checked: bool) -> Result<GroceryItem> {
        let mut item = self
            .storage
            .get_grocery_item(id)
            .await?
            .ok_or_else(|| PantrySyncError::NotFound(format!("grocery: {}", id)))?;
        item.checked = checked;
        item.updated_at = chrono::Utc::now().timestamp_millis();
        self.storage.save_grocery_item(&item).await?;
        self.enqueue_grocery_change(&item, ChangeAction::Update).await?;
        Ok(item)
    }

    pub async fn delete_grocery_item(&self, id: &str) -> Result<()> {
        let item = self
            .storage
            .get_grocery_item(id)
            .await?
            .ok_or_else(|| PantrySyncError::NotFound(format!("grocery: {}", id)))?;
        self.storage.delete_grocery_item(id).await?;
        self.storage
            .outbox_enqueue(
                item.household_id,
                &ClientChange::new(EntityKind::Grocery, id, ChangeAction::Delete, None),
            )
            .await?;
        self.request_sync(SyncReason::AfterAction);
        Ok(())
    }

    async fn enqueue_grocery_change(&self, item: &GroceryItem, action: ChangeAction) -> Result<()> {
        let payload = serde_json::to_value(GroceryPayload {
            name: item.name.clone(),
            quantity: item.quantity,
            checked: item.checked,
            product_id: item.product_id.clone(),
        })?;
        self.storage
            .outbox_enqueue(
                item.household_id,
                &ClientChange::new(EntityKind::Grocery, item.id.as_str(), action, Some(payload)),
            )
            .await?;
        self.request_sync(SyncReason::AfterAction);
        Ok(())
    }

    // ============================================================
    // 只读视图
    // ============================================================

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.storage.list_products(self.active_household()).await
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        self.storage.list_locations(self.active_household()).await
    }
}
