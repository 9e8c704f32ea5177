//! 数据实体定义 - 对应本地镜像表结构
//!
//! 客户端镜像是可抛弃缓存：服务端为权威，本地副本可随时从服务端
//! 状态重建（未确认的本地变更由 outbox 保护，确认后才移除）。

use chrono::NaiveDate;
use pantrysync_protocol::{InventoryRecord, LocationRecord, ProductRecord, DATE_ONLY_FORMAT};
use serde::{Deserialize, Serialize};

/// 商品镜像 - 对应 products 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub household_id: u64,
    pub name: String,
    pub brand: Option<String>,
    pub upc: Option<String>,
    pub default_location_id: Option<String>,
    pub updated_at: i64,
}

/// 位置镜像 - 对应 locations 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub household_id: u64,
    pub name: String,
    pub parent_id: Option<String>,
    pub updated_at: i64,
}

/// 库存条目镜像 - 对应 inventory 表
///
/// product_name / location_name 等描述字段由快照联表带出，
/// 增量应用时按 id 本地回查补齐。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub household_id: u64,
    pub product_id: String,
    pub location_id: String,
    pub quantity: f64,
    /// 日期无时间；None = 无过期日期
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub product_name: String,
    pub product_brand: Option<String>,
    pub location_name: String,
    pub updated_at: i64,
}

/// 购物清单条目镜像 - 对应 grocery_items 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroceryItem {
    pub id: String,
    pub household_id: u64,
    pub name: String,
    pub quantity: f64,
    pub checked: bool,
    pub product_id: Option<String>,
    pub updated_at: i64,
}

/// household 镜像 - 对应 households 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Household {
    pub id: u64,
    pub name: String,
    pub updated_at: i64,
}

/// 宽容解析「日期无时间」字符串：缺省或不合法都按无过期日期处理
pub fn parse_expiration_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    match NaiveDate::parse_from_str(raw, DATE_ONLY_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            tracing::warn!("过期日期不可解析，按无过期处理: {}", raw);
            None
        }
    }
}

/// 本地存储用的日期字符串（无损往返）
pub fn format_expiration_date(date: &NaiveDate) -> String {
    date.format(DATE_ONLY_FORMAT).to_string()
}

impl From<ProductRecord> for Product {
    fn from(r: ProductRecord) -> Self {
        Self {
            id: r.id,
            household_id: r.household_id,
            name: r.name,
            brand: r.brand,
            upc: r.upc,
            default_location_id: r.default_location_id,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl From<LocationRecord> for Location {
    fn from(r: LocationRecord) -> Self {
        Self {
            id: r.id,
            household_id: r.household_id,
            name: r.name,
            parent_id: r.parent_id,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl From<InventoryRecord> for InventoryItem {
    fn from(r: InventoryRecord) -> Self {
        Self {
            id: r.id,
            household_id: r.household_id,
            product_id: r.product_id,
            location_id: r.location_id,
            quantity: r.quantity,
            expiration_date: parse_expiration_date(r.expiration_date.as_deref()),
            notes: r.notes,
            product_name: r.product_name,
            product_brand: r.product_brand,
            location_name: r.location_name,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
