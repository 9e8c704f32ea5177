//! 变更应用器 - 将单条 ChangeLogEntry 写入本地镜像
//!
//! 与 bootstrap 共用同一套本地 upsert / delete 原语；分发用受控枚举
//! 穷尽 match。库存条目的描述字段（商品名 / 位置名）按 id 本地回查补齐，
//! 因此 product / location 变更必须先于引用它们的 inventory 变更应用
//! （服务端日志序天然满足：引用方创建晚于被引用方）。

use pantrysync_protocol::{
    parse_cursor, ChangeAction, ChangeLogEntry, EntityKind, GroceryPayload, HouseholdPayload,
    InventoryPayload, LocationPayload, ProductPayload, TypedPayload,
};
use tracing::debug;

use crate::error::Result;
use crate::storage::{
    entities::{self, GroceryItem, Household, InventoryItem, Location, Product},
    StorageManager,
};

/// 将单条日志条目应用到本地镜像
pub async fn apply_entry(storage: &StorageManager, entry: &ChangeLogEntry) -> Result<()> {
    let kind = entry.kind()?;
    let action = entry.action()?;
    let updated_at = parse_cursor(&entry.server_ts)
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    if action == ChangeAction::Delete {
        return apply_delete(storage, kind, entry).await;
    }

    let typed = TypedPayload::parse(kind, entry.payload.as_ref())?;
    match typed {
        TypedPayload::Inventory(p) => {
            apply_inventory(storage, entry, p, updated_at).await?;
        }
        TypedPayload::Product(p) => {
            apply_product(storage, entry, p, updated_at).await?;
        }
        TypedPayload::Location(p) => {
            apply_location(storage, entry, p, updated_at).await?;
        }
        TypedPayload::Grocery(p) => {
            apply_grocery(storage, entry, p, updated_at).await?;
        }
        TypedPayload::Household(p) => {
            apply_household(storage, entry, p, updated_at).await?;
        }
    }
    Ok(())
}

async fn apply_delete(
    storage: &StorageManager,
    kind: EntityKind,
    entry: &ChangeLogEntry,
) -> Result<()> {
    match kind {
        EntityKind::Inventory => storage.delete_inventory_item(&entry.entity_id).await?,
        EntityKind::Product => storage.delete_product(&entry.entity_id).await?,
        EntityKind::Location => storage.delete_location(&entry.entity_id).await?,
        EntityKind::Grocery => storage.delete_grocery_item(&entry.entity_id).await?,
        EntityKind::Household => {
            if let Ok(id) = entry.entity_id.parse::<u64>() {
                storage.delete_household(id).await?;
            }
        }
    }
    debug!("本地删除: kind={}, entity_id={}", kind, entry.entity_id);
    Ok(())
}

async fn apply_inventory(
    storage: &StorageManager,
    entry: &ChangeLogEntry,
    p: InventoryPayload,
    updated_at: i64,
) -> Result<()> {
    // 描述字段按 id 回查；引用尚未落库时置空，下次全量对账补齐
    let product = storage.get_product(&p.product_id).await?;
    let location = storage.get_location(&p.location_id).await?;
    if product.is_none() || location.is_none() {
        debug!(
            "库存条目引用未落库: entity_id={}, product={}, location={}",
            entry.entity_id, p.product_id, p.location_id
        );
    }
    let item = InventoryItem {
        id: entry.entity_id.clone(),
        household_id: entry.household_id,
        product_id: p.product_id,
        location_id: p.location_id,
        quantity: p.quantity,
        expiration_date: entities::parse_expiration_date(p.expiration_date.as_deref()),
        notes: p.notes,
        product_name: product.as_ref().map(|x| x.name.clone()).unwrap_or_default(),
        product_brand: product.and_then(|x| x.brand),
        location_name: location.map(|x| x.name).unwrap_or_default(),
        updated_at,
    };
    storage.save_inventory_item(&item).await
}

async fn apply_product(
    storage: &StorageManager,
    entry: &ChangeLogEntry,
    p: ProductPayload,
    updated_at: i64,
) -> Result<()> {
    let product = Product {
        id: entry.entity_id.clone(),
        household_id: entry.household_id,
        name: p.name,
        brand: p.brand,
        upc: p.upc,
        default_location_id: p.default_location_id,
        updated_at,
    };
    storage.save_products(std::slice::from_ref(&product)).await
}

async fn apply_location(
    storage: &StorageManager,
    entry: &ChangeLogEntry,
    p: LocationPayload,
    updated_at: i64,
) -> Result<()> {
    let location = Location {
        id: entry.entity_id.clone(),
        household_id: entry.household_id,
        name: p.name,
        parent_id: p.parent_id,
        updated_at,
    };
    storage.save_locations(std::slice::from_ref(&location)).await
}

async fn apply_grocery(
    storage: &StorageManager,
    entry: &ChangeLogEntry,
    p: GroceryPayload,
    updated_at: i64,
) -> Result<()> {
    let item = GroceryItem {
        id: entry.entity_id.clone(),
        household_id: entry.household_id,
        name: p.name,
        quantity: p.quantity,
        checked: p.checked,
        product_id: p.product_id,
        updated_at,
    };
    storage.save_grocery_item(&item).await
}

async fn apply_household(
    storage: &StorageManager,
    entry: &ChangeLogEntry,
    p: HouseholdPayload,
    updated_at: i64,
) -> Result<()> {
    let id = entry
        .entity_id
        .parse::<u64>()
        .map_err(|_| crate::error::PantrySyncError::InvalidData(
            format!("invalid household id: {}", entry.entity_id),
        ))?;
    storage
        .save_household(&Household {
            id,
            name: p.name,
            updated_at,
        })
        .await
}
