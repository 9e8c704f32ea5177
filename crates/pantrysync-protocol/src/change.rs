//! 变更日志条目与推送契约
//!
//! ChangeLogEntry 一经写入不可变；同一 household 内按 server_ts 升序即
//! 权威顺序（server_ts 由服务端按插入顺序分配，不依赖客户端时钟）。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{ChangeAction, EntityKind, Result};

/// 服务端变更日志条目（追加写，排序依据为 server_ts）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// 日志自增主键（服务端分配）
    pub id: i64,
    pub household_id: u64,
    /// 线上为字符串，用 [`ChangeLogEntry::kind`] 逐条解析
    pub entity_kind: String,
    pub entity_id: String,
    /// 线上为字符串，用 [`ChangeLogEntry::action`] 逐条解析
    pub action: String,
    /// 该实体类型的完整字段集（非 delete 时必有）；整实体 LWW，不做字段级合并
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// 客户端本地时间（仅审计用途，绝不参与排序）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ts: Option<String>,
    /// 服务端分配时间戳（RFC3339，毫秒精度），游标即此值
    pub server_ts: String,
}

impl ChangeLogEntry {
    pub fn kind(&self) -> Result<EntityKind> {
        EntityKind::from_str(&self.entity_kind)
    }

    pub fn action(&self) -> Result<ChangeAction> {
        ChangeAction::from_str(&self.action)
    }
}

/// 客户端上行变更（离线期间积累，推送时逐条应用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientChange {
    pub entity_kind: String,
    pub entity_id: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ts: Option<String>,
}

impl ClientChange {
    pub fn new(
        kind: EntityKind,
        entity_id: impl Into<String>,
        action: ChangeAction,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            entity_kind: kind.as_str().to_string(),
            entity_id: entity_id.into(),
            action: action.as_str().to_string(),
            payload,
            client_ts: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn kind(&self) -> Result<EntityKind> {
        EntityKind::from_str(&self.entity_kind)
    }

    pub fn action(&self) -> Result<ChangeAction> {
        ChangeAction::from_str(&self.action)
    }
}

/// 推送请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    pub changes: Vec<ClientChange>,
}

/// 单条推送结果：一条失败不阻塞同批其他条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResult {
    pub entity_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 推送响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    pub results: Vec<PushResult>,
    pub server_time: String,
}

/// 变更流响应（since 游标之后的全部条目，server_ts 升序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangesResponse {
    pub changes: Vec<ChangeLogEntry>,
    /// 本次响应的服务端时间，客户端持久化为新游标
    pub server_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kind_and_action_parse_per_entry() {
        let entry = ChangeLogEntry {
            id: 1,
            household_id: 7,
            entity_kind: "inventory".to_string(),
            entity_id: "itm-1".to_string(),
            action: "create".to_string(),
            payload: Some(serde_json::json!({ "quantity": 3.0 })),
            client_ts: None,
            server_ts: "2025-06-01T08:00:00.000Z".to_string(),
        };
        assert_eq!(entry.kind().unwrap(), EntityKind::Inventory);
        assert_eq!(entry.action().unwrap(), ChangeAction::Create);

        let bad = ChangeLogEntry {
            entity_kind: "widget".to_string(),
            ..entry
        };
        assert!(bad.kind().is_err());
    }

    #[test]
    fn delete_change_serializes_without_payload() {
        let change = ClientChange::new(EntityKind::Grocery, "g-1", ChangeAction::Delete, None);
        let json = serde_json::to_value(&change).unwrap();
        assert!(json.get("payload").is_none());
        assert_eq!(json["action"], "delete");
    }
}
