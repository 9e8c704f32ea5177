//! 变更日志数据访问层 - 追加写账本
//!
//! 对同一 (entity_id, entity_kind)，server_ts 序最后一条即当前真相。

use pantrysync_protocol::{format_cursor, ChangeAction, ChangeLogEntry, EntityKind};
use rusqlite::{params, Connection, Row};

use crate::Result;

/// 变更日志 DAO
pub struct ChangeLogDao<'a> {
    conn: &'a Connection,
}

impl<'a> ChangeLogDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 追加一条日志（payload 以 JSON 文本存储），返回日志 id
    pub fn append(
        &self,
        household_id: u64,
        kind: EntityKind,
        entity_id: &str,
        action: ChangeAction,
        payload: Option<&serde_json::Value>,
        client_ts: Option<&str>,
        server_ts: i64,
    ) -> Result<i64> {
        let payload_text = payload.map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "INSERT INTO change_log
                (household_id, entity_kind, entity_id, action, payload, client_ts, server_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                household_id as i64,
                kind.as_str(),
                entity_id,
                action.as_str(),
                payload_text,
                client_ts,
                server_ts,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// 游标之后的全部条目，server_ts 升序；since 为 None 时返回整个日志
    pub fn list_since(
        &self,
        household_id: u64,
        since_millis: Option<i64>,
    ) -> Result<Vec<ChangeLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, household_id, entity_kind, entity_id, action, payload, client_ts, server_ts
             FROM change_log
             WHERE household_id = ?1 AND server_ts > ?2
             ORDER BY server_ts ASC, id ASC",
        )?;
        let rows = stmt.query_map(
            params![household_id as i64, since_millis.unwrap_or(i64::MIN)],
            Self::row_to_entry,
        )?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// 已持久化的最大 server_ts，空日志返回 0
    pub fn max_server_ts(&self, household_id: u64) -> Result<i64> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(server_ts) FROM change_log WHERE household_id = ?1",
            params![household_id as i64],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0))
    }

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<ChangeLogEntry> {
        let payload_text: Option<String> = row.get(5)?;
        let server_ts: i64 = row.get(7)?;
        Ok(ChangeLogEntry {
            id: row.get(0)?,
            household_id: row.get::<_, i64>(1)? as u64,
            entity_kind: row.get(2)?,
            entity_id: row.get(3)?,
            action: row.get(4)?,
            payload: payload_text.and_then(|t| serde_json::from_str(&t).ok()),
            client_ts: row.get(6)?,
            server_ts: format_cursor(server_ts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ServerStore;
    use serde_json::json;

    #[test]
    fn list_since_returns_entries_strictly_after_cursor() {
        let store = ServerStore::open_in_memory().unwrap();
        let conn = store.connection();
        let conn = conn.try_lock().unwrap();
        let dao = ChangeLogDao::new(&conn);

        dao.append(1, EntityKind::Product, "p-1", ChangeAction::Create, Some(&json!({"name": "米"})), None, 100)
            .unwrap();
        dao.append(1, EntityKind::Product, "p-1", ChangeAction::Update, Some(&json!({"name": "大米"})), None, 200)
            .unwrap();
        dao.append(1, EntityKind::Product, "p-2", ChangeAction::Create, Some(&json!({"name": "面"})), None, 300)
            .unwrap();

        // 游标 == 某条的 server_ts 时，该条不重复返回
        let entries = dao.list_since(1, Some(200)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_id, "p-2");

        let all = dao.list_since(1, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(dao.max_server_ts(1).unwrap(), 300);
        assert_eq!(dao.max_server_ts(42).unwrap(), 0);
    }

    #[test]
    fn entries_are_scoped_by_household() {
        let store = ServerStore::open_in_memory().unwrap();
        let conn = store.connection();
        let conn = conn.try_lock().unwrap();
        let dao = ChangeLogDao::new(&conn);

        dao.append(1, EntityKind::Grocery, "g-1", ChangeAction::Create, Some(&json!({"name": "鸡蛋", "quantity": 12.0})), None, 10)
            .unwrap();
        dao.append(2, EntityKind::Grocery, "g-2", ChangeAction::Create, Some(&json!({"name": "牛奶", "quantity": 1.0})), None, 20)
            .unwrap();

        assert_eq!(dao.list_since(1, None).unwrap().len(), 1);
        assert_eq!(dao.list_since(2, None).unwrap().len(), 1);
    }
}
