//! SQLite 本地缓存 - 镜像表与 outbox
//!
//! 本模块提供：
//! - 镜像表（products / locations / inventory / grocery_items / households）
//! - outbox 表（未确认的本地变更队列）
//! - WAL 模式与基础优化

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::error::Result;

/// SQLite 存储组件
#[derive(Debug)]
pub struct SqliteStore {
    #[allow(dead_code)]
    db_path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// 打开（或创建）本地缓存库
    pub async fn new(base_path: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(base_path).await?;
        let db_path = base_path.join("cache.db");
        let conn = Connection::open(&db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::create_tables(&conn)?;
        tracing::info!("本地缓存数据库初始化完成: {:?}", db_path);

        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    fn create_tables(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id                  TEXT PRIMARY KEY,
                household_id        INTEGER NOT NULL,
                name                TEXT NOT NULL,
                brand               TEXT,
                upc                 TEXT,
                default_location_id TEXT,
                updated_at          INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_products_household
                ON products (household_id);

            CREATE TABLE IF NOT EXISTS locations (
                id            TEXT PRIMARY KEY,
                household_id  INTEGER NOT NULL,
                name          TEXT NOT NULL,
                parent_id     TEXT,
                updated_at    INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_locations_household
                ON locations (household_id);

            CREATE TABLE IF NOT EXISTS inventory (
                id               TEXT PRIMARY KEY,
                household_id     INTEGER NOT NULL,
                product_id       TEXT NOT NULL,
                location_id      TEXT NOT NULL,
                quantity         REAL NOT NULL DEFAULT 0,
                expiration_date  TEXT,
                notes            TEXT,
                product_name     TEXT NOT NULL DEFAULT '',
                product_brand    TEXT,
                location_name    TEXT NOT NULL DEFAULT '',
                updated_at       INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_inventory_household
                ON inventory (household_id);

            CREATE TABLE IF NOT EXISTS grocery_items (
                id            TEXT PRIMARY KEY,
                household_id  INTEGER NOT NULL,
                name          TEXT NOT NULL,
                quantity      REAL NOT NULL DEFAULT 1,
                checked       INTEGER NOT NULL DEFAULT 0,
                product_id    TEXT,
                updated_at    INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_grocery_household
                ON grocery_items (household_id);

            CREATE TABLE IF NOT EXISTS households (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL,
                updated_at  INTEGER NOT NULL
            );

            -- outbox：离线期间积累的本地变更，服务端逐条确认后才移除
            CREATE TABLE IF NOT EXISTS outbox (
                seq           INTEGER PRIMARY KEY AUTOINCREMENT,
                household_id  INTEGER NOT NULL,
                entity_kind   TEXT NOT NULL,
                entity_id     TEXT NOT NULL,
                action        TEXT NOT NULL,
                payload       TEXT,
                client_ts     TEXT,
                queued_at     INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_outbox_household
                ON outbox (household_id, seq);
            "#,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn new_creates_all_tables() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path()).await.unwrap();
        let conn = store.connection();
        let conn = conn.lock().await;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('products', 'locations', 'inventory', 'grocery_items', 'households', 'outbox')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 6);
    }
}
