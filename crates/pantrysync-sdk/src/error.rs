//! SDK 错误类型

use pantrysync_protocol::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum PantrySyncError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("KV store error: {0}")]
    KvStore(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// 远端 API 边界（鉴权 HTTP 层在别处实现）返回的失败
    #[error("Remote error: {0}")]
    Remote(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, PantrySyncError>;
