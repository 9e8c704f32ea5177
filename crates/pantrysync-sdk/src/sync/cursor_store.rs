//! 同步游标存储 - household -> 游标映射
//!
//! 键格式：sync_cursor:{household_id}。每次同步成功后写入，进程重启
//! 时凭有效游标直接走增量，不必重新 bootstrap。

use std::collections::HashMap;
use std::sync::Arc;

use pantrysync_protocol::parse_cursor;
use tracing::warn;

use crate::error::Result;
use crate::storage::kv::KvStore;

const PREFIX: &str = "sync_cursor";

/// 游标持久化
#[derive(Clone)]
pub struct CursorStore {
    kv: Arc<KvStore>,
}

impl CursorStore {
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }

    fn key(household_id: u64) -> String {
        format!("{}:{}", PREFIX, household_id)
    }

    /// 读取游标；值存在但不可解析时按「无游标」处理（回退 bootstrap，
    /// 宁可多拉一次全量也不能静默丢变更）
    pub async fn get(&self, household_id: u64) -> Result<Option<String>> {
        let raw: Option<String> = self.kv.get(Self::key(household_id).as_str()).await?;
        match raw {
            None => Ok(None),
            Some(cursor) => {
                if parse_cursor(&cursor).is_some() {
                    Ok(Some(cursor))
                } else {
                    warn!(
                        "持久化游标不可解析，回退 bootstrap: household_id={}, cursor={}",
                        household_id, cursor
                    );
                    Ok(None)
                }
            }
        }
    }

    pub async fn set(&self, household_id: u64, cursor: &str) -> Result<()> {
        self.kv
            .set(Self::key(household_id).as_str(), &cursor.to_string())
            .await
    }

    /// 全部已持久化的 household -> 游标映射
    pub async fn load_all(&self) -> Result<HashMap<u64, String>> {
        let prefix = format!("{}:", PREFIX);
        let entries: Vec<(Vec<u8>, String)> = self.kv.scan_prefix(prefix.as_bytes()).await?;
        let mut map = HashMap::new();
        for (key, cursor) in entries {
            let key = String::from_utf8_lossy(&key);
            if let Some(id) = key.strip_prefix(&prefix).and_then(|s| s.parse::<u64>().ok()) {
                map.insert(id, cursor);
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantrysync_protocol::format_cursor;
    use tempfile::TempDir;

    #[test]
    fn cursor_key_format() {
        assert_eq!(CursorStore::key(42), "sync_cursor:42");
    }

    #[tokio::test]
    async fn set_get_and_load_all() {
        let temp_dir = TempDir::new().unwrap();
        let kv = Arc::new(KvStore::new(temp_dir.path()).await.unwrap());
        let store = CursorStore::new(kv);

        assert!(store.get(1).await.unwrap().is_none());

        let cursor = format_cursor(1_700_000_000_000);
        store.set(1, &cursor).await.unwrap();
        store.set(2, &format_cursor(1_700_000_100_000)).await.unwrap();

        assert_eq!(store.get(1).await.unwrap().as_deref(), Some(cursor.as_str()));
        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key(&2));
    }

    #[tokio::test]
    async fn corrupt_cursor_reads_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        let kv = Arc::new(KvStore::new(temp_dir.path()).await.unwrap());
        let store = CursorStore::new(kv);

        store.set(1, "definitely-not-a-timestamp").await.unwrap();
        assert!(store.get(1).await.unwrap().is_none());
    }
}
