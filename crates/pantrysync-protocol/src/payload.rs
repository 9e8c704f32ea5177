//! 类型化 payload - 应用时解析
//!
//! 线上 payload 是不透明 JSON；服务端应用与客户端对账两侧都在应用时
//! 解析为类型化结构并做穷尽 match，解析失败即该条变更失败。

use serde::{Deserialize, Serialize};

use crate::{EntityKind, ProtocolError, Result};

/// 商品 payload（update 携带客户端认为的完整字段集，整实体 LWW）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_location_id: Option<String>,
}

/// 位置 payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// 库存条目 payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryPayload {
    pub product_id: String,
    pub location_id: String,
    pub quantity: f64,
    /// YYYY-MM-DD，缺省 = 无过期日期
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// 购物清单条目 payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroceryPayload {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
}

/// household 自身的可同步字段（改名等）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdPayload {
    pub name: String,
}

/// 按实体类型解析后的 payload，穷尽 match 的分发入口
#[derive(Debug, Clone)]
pub enum TypedPayload {
    Inventory(InventoryPayload),
    Product(ProductPayload),
    Location(LocationPayload),
    Grocery(GroceryPayload),
    Household(HouseholdPayload),
}

impl TypedPayload {
    /// 解析一条非 delete 变更的 payload；payload 缺失或字段不合法
    /// 都是该条变更的永久失败
    pub fn parse(kind: EntityKind, payload: Option<&serde_json::Value>) -> Result<Self> {
        let value = payload.ok_or(ProtocolError::MissingPayload(kind))?;
        let invalid = |e: serde_json::Error| ProtocolError::InvalidPayload {
            kind,
            message: e.to_string(),
        };
        match kind {
            EntityKind::Inventory => Ok(Self::Inventory(
                serde_json::from_value(value.clone()).map_err(invalid)?,
            )),
            EntityKind::Product => Ok(Self::Product(
                serde_json::from_value(value.clone()).map_err(invalid)?,
            )),
            EntityKind::Location => Ok(Self::Location(
                serde_json::from_value(value.clone()).map_err(invalid)?,
            )),
            EntityKind::Grocery => Ok(Self::Grocery(
                serde_json::from_value(value.clone()).map_err(invalid)?,
            )),
            EntityKind::Household => Ok(Self::Household(
                serde_json::from_value(value.clone()).map_err(invalid)?,
            )),
        }
    }
}
