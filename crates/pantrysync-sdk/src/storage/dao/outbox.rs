//! outbox 数据访问层 - 未确认本地变更队列
//!
//! 条目只在服务端逐条确认成功后移除；失败条目留队，下一次同步重试。

use pantrysync_protocol::ClientChange;
use rusqlite::{params, Connection, Row};

use crate::error::Result;

/// 排队中的一条本地变更
#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub seq: i64,
    pub household_id: u64,
    pub change: ClientChange,
}

pub struct OutboxDao<'a> {
    conn: &'a Connection,
}

impl<'a> OutboxDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 入队，返回 seq
    pub fn enqueue(&self, household_id: u64, change: &ClientChange) -> Result<i64> {
        let payload_text = change.payload.as_ref().map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "INSERT INTO outbox
                (household_id, entity_kind, entity_id, action, payload, client_ts, queued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                household_id as i64,
                change.entity_kind,
                change.entity_id,
                change.action,
                payload_text,
                change.client_ts,
                chrono::Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// 按入队顺序取出 household 的全部待推送变更
    pub fn pending(&self, household_id: u64) -> Result<Vec<OutboxEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, household_id, entity_kind, entity_id, action, payload, client_ts
             FROM outbox WHERE household_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![household_id as i64], Self::row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// 服务端确认后移除
    pub fn remove(&self, seq: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM outbox WHERE seq = ?1", params![seq])?;
        Ok(())
    }

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<OutboxEntry> {
        let payload_text: Option<String> = row.get(5)?;
        Ok(OutboxEntry {
            seq: row.get(0)?,
            household_id: row.get::<_, i64>(1)? as u64,
            change: ClientChange {
                entity_kind: row.get(2)?,
                entity_id: row.get(3)?,
                action: row.get(4)?,
                payload: payload_text.and_then(|t| serde_json::from_str(&t).ok()),
                client_ts: row.get(6)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::SqliteStore;
    use pantrysync_protocol::{ChangeAction, EntityKind};
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn entries_keep_queue_order_and_survive_until_removed() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path()).await.unwrap();
        let conn = store.connection();
        let conn = conn.lock().await;
        let dao = OutboxDao::new(&conn);

        let first = ClientChange::new(
            EntityKind::Grocery,
            "g-1",
            ChangeAction::Create,
            Some(json!({ "name": "鸡蛋", "quantity": 12.0 })),
        );
        let second = ClientChange::new(EntityKind::Grocery, "g-1", ChangeAction::Delete, None);
        let seq1 = dao.enqueue(1, &first).unwrap();
        let seq2 = dao.enqueue(1, &second).unwrap();
        assert!(seq2 > seq1);

        let pending = dao.pending(1).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].change.action, "create");
        assert_eq!(pending[1].change.action, "delete");
        assert!(pending[1].change.payload.is_none());

        dao.remove(seq1).unwrap();
        let pending = dao.pending(1).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].seq, seq2);
    }
}
