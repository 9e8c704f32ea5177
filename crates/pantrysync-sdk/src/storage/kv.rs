//! KV 存储模块 - 基于 sled 的本地键值存储
//!
//! 持久化同步游标映射等小状态，值以 JSON 编码。

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sled::Db;

use crate::error::{PantrySyncError, Result};

/// KV 存储组件
#[derive(Debug, Clone)]
pub struct KvStore {
    db: Arc<Db>,
}

impl KvStore {
    /// 打开（或创建）KV 存储
    pub async fn new(base_path: &Path) -> Result<Self> {
        let kv_path = base_path.join("kv");
        tokio::fs::create_dir_all(&kv_path).await?;

        let db = sled::open(&kv_path)
            .map_err(|e| PantrySyncError::KvStore(format!("打开 sled 数据库失败: {}", e)))?;
        Ok(Self { db: Arc::new(db) })
    }

    /// 设置键值对
    pub async fn set<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: Serialize,
    {
        let value_bytes = serde_json::to_vec(value)?;
        self.db
            .insert(key, value_bytes)
            .map_err(|e| PantrySyncError::KvStore(format!("设置键值对失败: {}", e)))?;
        Ok(())
    }

    /// 获取键值对
    pub async fn get<K, V>(&self, key: K) -> Result<Option<V>>
    where
        K: AsRef<[u8]>,
        V: for<'de> Deserialize<'de>,
    {
        let result = self
            .db
            .get(key)
            .map_err(|e| PantrySyncError::KvStore(format!("获取键值对失败: {}", e)))?;
        match result {
            Some(value_bytes) => Ok(Some(serde_json::from_slice(&value_bytes)?)),
            None => Ok(None),
        }
    }

    /// 删除键值对
    pub async fn delete<K>(&self, key: K) -> Result<()>
    where
        K: AsRef<[u8]>,
    {
        self.db
            .remove(key)
            .map_err(|e| PantrySyncError::KvStore(format!("删除键值对失败: {}", e)))?;
        Ok(())
    }

    /// 检查键是否存在
    pub async fn exists<K>(&self, key: K) -> Result<bool>
    where
        K: AsRef<[u8]>,
    {
        self.db
            .contains_key(key)
            .map_err(|e| PantrySyncError::KvStore(format!("检查键存在失败: {}", e)))
    }

    /// 获取指定前缀的所有键值对
    pub async fn scan_prefix<V>(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, V)>>
    where
        V: for<'de> Deserialize<'de>,
    {
        let mut results = Vec::new();
        for entry in self.db.scan_prefix(prefix) {
            let (key, value_bytes) =
                entry.map_err(|e| PantrySyncError::KvStore(format!("扫描前缀失败: {}", e)))?;
            let value = serde_json::from_slice(&value_bytes)?;
            results.push((key.to_vec(), value));
        }
        Ok(results)
    }
}
