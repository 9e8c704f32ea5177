//! 权威存储 - SQLite 连接与建表
//!
//! 服务端单库：实体表按 household_id 限定范围，change_log 追加写。
//! 连接放在异步互斥锁后，调用方在持锁期间完成整段本地事务。

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::Result;

/// 服务端存储组件
#[derive(Clone)]
pub struct ServerStore {
    conn: Arc<Mutex<Connection>>,
}

impl ServerStore {
    /// 打开（或创建）数据库文件
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// 内存库，测试用
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::create_tables(&conn)?;
        tracing::info!("服务端数据库初始化完成");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    fn create_tables(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS households (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL,
                updated_at  INTEGER NOT NULL
            );

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

            -- 变更日志：追加写，(household_id, server_ts) 即增量流的扫描键
            CREATE TABLE IF NOT EXISTS change_log (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                household_id  INTEGER NOT NULL,
                entity_kind   TEXT NOT NULL,
                entity_id     TEXT NOT NULL,
                action        TEXT NOT NULL,
                payload       TEXT,
                client_ts     TEXT,
                server_ts     INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_change_log_household_ts
                ON change_log (household_id, server_ts);
            "#,
        )?;
        Ok(())
    }
}
