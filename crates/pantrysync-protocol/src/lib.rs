//! PantrySync 同步协议 - 客户端与服务端共享的线上类型
//!
//! 本 crate 提供：
//! - 实体类型 / 变更动作的受控枚举（线上为字符串，逐条解析）
//! - 变更日志条目（ChangeLogEntry）与客户端变更（ClientChange）
//! - 快照 / 变更流 / 推送的请求响应契约
//! - 位置层级树（bootstrap 专用）
//!
//! 设计约束：entity_kind / action 在线上以字符串传输，解析失败是
//! **单条变更**的永久失败，不影响同批其他条目；内部分发一律用
//! 受控枚举做穷尽 match。

pub mod change;
pub mod cursor;
pub mod entity;
pub mod payload;
pub mod snapshot;

pub use change::{ChangeLogEntry, ChangesResponse, ClientChange, PushRequest, PushResponse, PushResult};
pub use cursor::{format_cursor, parse_cursor};
pub use entity::{ChangeAction, EntityKind};
pub use payload::{
    GroceryPayload, HouseholdPayload, InventoryPayload, LocationPayload, ProductPayload,
    TypedPayload,
};
pub use snapshot::{InventoryRecord, LocationNode, LocationRecord, ProductRecord, SnapshotResponse};

/// 协议层错误（解析线上字符串 / payload 失败）
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown entity kind: {0}")]
    UnknownEntityKind(String),
    #[error("unknown change action: {0}")]
    UnknownAction(String),
    #[error("invalid payload for {kind}: {message}")]
    InvalidPayload { kind: EntityKind, message: String },
    #[error("missing payload for {0} (non-delete change)")]
    MissingPayload(EntityKind),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// 日期字段统一格式：过期日期为「日期无时间」，线上传 `YYYY-MM-DD`
pub const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";
