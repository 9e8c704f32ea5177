//! PantrySync 服务端 - 权威存储与同步服务
//!
//! 本 crate 提供：
//! - ServerStore：权威实体表 + 追加写变更日志（SQLite）
//! - SyncService：全量快照 / 增量变更流 / 变更推送三个操作
//! - 按实体类型分发的幂等应用例程（upsert / delete）
//!
//! HTTP 路由与鉴权在上层服务中实现，本 crate 只暴露业务操作；
//! 调用方保证 household 维度的访问控制已完成。

pub mod apply;
pub mod change_log;
pub mod clock;
pub mod service;
pub mod store;

pub use change_log::ChangeLogDao;
pub use clock::HouseholdClock;
pub use service::SyncService;
pub use store::ServerStore;

use pantrysync_protocol::ProtocolError;

/// 服务端错误
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid change: {0}")]
    InvalidChange(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
