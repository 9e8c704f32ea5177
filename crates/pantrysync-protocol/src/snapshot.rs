//! 全量快照与位置层级 - bootstrap 契约
//!
//! 快照按 household 限定，不分页（单个 household 规模有上限）。
//! inventory 行已联表带出 product 名称/品牌与 location 名称，客户端可直接落库。

use serde::{Deserialize, Serialize};

/// 商品（权威侧 products 表的快照行）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub household_id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_location_id: Option<String>,
}

/// 库存条目快照行（含联表描述字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: String,
    pub household_id: u64,
    pub product_id: String,
    pub location_id: String,
    pub quantity: f64,
    /// 日期无时间，格式 YYYY-MM-DD；缺省表示无过期日期
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    // 联表描述字段（直接供客户端展示，避免二次查询）
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_brand: Option<String>,
    pub location_name: String,
}

/// 位置（冰箱 / 储藏柜 / 某层抽屉等）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: String,
    pub household_id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// 位置层级树节点（GET location hierarchy 返回，仅 bootstrap 消费）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationNode {
    pub location: LocationRecord,
    #[serde(default)]
    pub children: Vec<LocationNode>,
}

impl LocationNode {
    /// 先序展平：父节点先于子节点，落库时保证 parent 已存在
    pub fn flatten(nodes: &[LocationNode]) -> Vec<LocationRecord> {
        let mut out = Vec::new();
        fn walk(node: &LocationNode, out: &mut Vec<LocationRecord>) {
            out.push(node.location.clone());
            for child in &node.children {
                walk(child, out);
            }
        }
        for node in nodes {
            walk(node, &mut out);
        }
        out
    }
}

/// 全量快照响应
///
/// server_time 供 bootstrap 之后直接进入增量同步（NoCursor → HasCursor）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub products: Vec<ProductRecord>,
    pub inventory: Vec<InventoryRecord>,
    pub server_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, parent: Option<&str>, children: Vec<LocationNode>) -> LocationNode {
        LocationNode {
            location: LocationRecord {
                id: id.to_string(),
                household_id: 1,
                name: id.to_string(),
                parent_id: parent.map(String::from),
            },
            children,
        }
    }

    #[test]
    fn flatten_keeps_parents_before_children() {
        let tree = vec![node(
            "kitchen",
            None,
            vec![node("fridge", Some("kitchen"), vec![node("crisper", Some("fridge"), vec![])])],
        )];
        let flat = LocationNode::flatten(&tree);
        let ids: Vec<&str> = flat.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["kitchen", "fridge", "crisper"]);
    }
}
