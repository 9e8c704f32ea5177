//! 按实体类型分发的应用例程 - 服务端权威表
//!
//! 语义：
//! - create / update 一律 upsert（entity_id + household 维度幂等，重放安全）
//! - delete 有则删、无则空操作（幂等）；实体表硬删除，历史只留在 change_log
//!
//! 分发用受控枚举穷尽 match，未知类型在进入本模块前已按单条失败处理。

use chrono::NaiveDate;
use pantrysync_protocol::{
    ChangeAction, EntityKind, GroceryPayload, HouseholdPayload, InventoryPayload, LocationPayload,
    ProductPayload, TypedPayload, DATE_ONLY_FORMAT,
};
use rusqlite::{params, Connection};

use crate::{Result, ServerError};

/// 应用一条变更到权威表（调用方已开启事务）
pub fn apply_change(
    conn: &Connection,
    household_id: u64,
    kind: EntityKind,
    entity_id: &str,
    action: ChangeAction,
    payload: Option<&serde_json::Value>,
    server_ts: i64,
) -> Result<()> {
    match action {
        ChangeAction::Delete => apply_delete(conn, household_id, kind, entity_id),
        ChangeAction::Create | ChangeAction::Update => {
            let typed = TypedPayload::parse(kind, payload)?;
            match typed {
                TypedPayload::Inventory(p) => {
                    upsert_inventory(conn, household_id, entity_id, &p, server_ts)
                }
                TypedPayload::Product(p) => {
                    upsert_product(conn, household_id, entity_id, &p, server_ts)
                }
                TypedPayload::Location(p) => {
                    upsert_location(conn, household_id, entity_id, &p, server_ts)
                }
                TypedPayload::Grocery(p) => {
                    upsert_grocery(conn, household_id, entity_id, &p, server_ts)
                }
                TypedPayload::Household(p) => {
                    upsert_household(conn, household_id, entity_id, &p, server_ts)
                }
            }
        }
    }
}

fn apply_delete(
    conn: &Connection,
    household_id: u64,
    kind: EntityKind,
    entity_id: &str,
) -> Result<()> {
    let sql = match kind {
        EntityKind::Inventory => "DELETE FROM inventory WHERE id = ?1 AND household_id = ?2",
        EntityKind::Product => "DELETE FROM products WHERE id = ?1 AND household_id = ?2",
        EntityKind::Location => "DELETE FROM locations WHERE id = ?1 AND household_id = ?2",
        EntityKind::Grocery => "DELETE FROM grocery_items WHERE id = ?1 AND household_id = ?2",
        EntityKind::Household => {
            conn.execute(
                "DELETE FROM households WHERE id = ?1",
                params![parse_household_entity_id(entity_id)?],
            )?;
            return Ok(());
        }
    };
    conn.execute(sql, params![entity_id, household_id as i64])?;
    Ok(())
}

fn upsert_inventory(
    conn: &Connection,
    household_id: u64,
    entity_id: &str,
    p: &InventoryPayload,
    server_ts: i64,
) -> Result<()> {
    // 过期日期必须是合法的「日期无时间」字符串
    if let Some(date) = &p.expiration_date {
        NaiveDate::parse_from_str(date, DATE_ONLY_FORMAT).map_err(|_| {
            ServerError::InvalidChange(format!("invalid expiration_date: {}", date))
        })?;
    }
    conn.execute(
        "INSERT OR REPLACE INTO inventory
            (id, household_id, product_id, location_id, quantity, expiration_date, notes, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entity_id,
            household_id as i64,
            p.product_id,
            p.location_id,
            p.quantity,
            p.expiration_date,
            p.notes,
            server_ts,
        ],
    )?;
    Ok(())
}

fn upsert_product(
    conn: &Connection,
    household_id: u64,
    entity_id: &str,
    p: &ProductPayload,
    server_ts: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO products
            (id, household_id, name, brand, upc, default_location_id, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entity_id,
            household_id as i64,
            p.name,
            p.brand,
            p.upc,
            p.default_location_id,
            server_ts,
        ],
    )?;
    Ok(())
}

fn upsert_location(
    conn: &Connection,
    household_id: u64,
    entity_id: &str,
    p: &LocationPayload,
    server_ts: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO locations (id, household_id, name, parent_id, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![entity_id, household_id as i64, p.name, p.parent_id, server_ts],
    )?;
    Ok(())
}

fn upsert_grocery(
    conn: &Connection,
    household_id: u64,
    entity_id: &str,
    p: &GroceryPayload,
    server_ts: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO grocery_items
            (id, household_id, name, quantity, checked, product_id, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entity_id,
            household_id as i64,
            p.name,
            p.quantity,
            p.checked as i64,
            p.product_id,
            server_ts,
        ],
    )?;
    Ok(())
}

fn upsert_household(
    conn: &Connection,
    _household_id: u64,
    entity_id: &str,
    p: &HouseholdPayload,
    server_ts: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO households (id, name, updated_at) VALUES (?1, ?2, ?3)",
        params![parse_household_entity_id(entity_id)?, p.name, server_ts],
    )?;
    Ok(())
}

/// household 自身的 entity_id 即其数字 id
fn parse_household_entity_id(entity_id: &str) -> Result<i64> {
    entity_id
        .parse::<i64>()
        .map_err(|_| ServerError::InvalidChange(format!("invalid household id: {}", entity_id)))
}
