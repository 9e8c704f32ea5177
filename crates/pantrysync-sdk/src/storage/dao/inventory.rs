//! 库存条目镜像数据访问层
//!
//! ids_by_household 供 bootstrap 的删除检测使用（远端 id 集合之外的
//! 本地条目一律删除）。

use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::storage::entities::{format_expiration_date, parse_expiration_date, InventoryItem};

pub struct InventoryDao<'a> {
    conn: &'a Connection,
}

impl<'a> InventoryDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn upsert(&self, item: &InventoryItem) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO inventory
                (id, household_id, product_id, location_id, quantity, expiration_date,
                 notes, product_name, product_brand, location_name, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.id,
                item.household_id as i64,
                item.product_id,
                item.location_id,
                item.quantity,
                item.expiration_date.as_ref().map(format_expiration_date),
                item.notes,
                item.product_name,
                item.product_brand,
                item.location_name,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<InventoryItem>> {
        let mut stmt = self.conn.prepare(&format!("{} WHERE id = ?1", Self::SELECT))?;
        let mut rows = stmt.query_map(params![id], Self::row_to_item)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM inventory WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn list_by_household(&self, household_id: u64) -> Result<Vec<InventoryItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE household_id = ?1 ORDER BY updated_at DESC",
            Self::SELECT
        ))?;
        let rows = stmt.query_map(params![household_id as i64], Self::row_to_item)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// household 内全部条目 id（删除检测用）
    pub fn ids_by_household(&self, household_id: u64) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM inventory WHERE household_id = ?1")?;
        let rows = stmt.query_map(params![household_id as i64], |row| row.get(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    const SELECT: &'static str =
        "SELECT id, household_id, product_id, location_id, quantity, expiration_date,
                notes, product_name, product_brand, location_name, updated_at
         FROM inventory";

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<InventoryItem> {
        let expiration: Option<String> = row.get(5)?;
        Ok(InventoryItem {
            id: row.get(0)?,
            household_id: row.get::<_, i64>(1)? as u64,
            product_id: row.get(2)?,
            location_id: row.get(3)?,
            quantity: row.get(4)?,
            expiration_date: parse_expiration_date(expiration.as_deref()),
            notes: row.get(6)?,
            product_name: row.get(7)?,
            product_brand: row.get(8)?,
            location_name: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::SqliteStore;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn item(id: &str, quantity: f64) -> InventoryItem {
        InventoryItem {
            id: id.to_string(),
            household_id: 1,
            product_id: "p-1".to_string(),
            location_id: "l-1".to_string(),
            quantity,
            expiration_date: NaiveDate::from_ymd_opt(2025, 7, 1),
            notes: None,
            product_name: "牛奶".to_string(),
            product_brand: None,
            location_name: "冰箱".to_string(),
            updated_at: 100,
        }
    }

    #[tokio::test]
    async fn upsert_get_delete_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path()).await.unwrap();
        let conn = store.connection();
        let conn = conn.lock().await;
        let dao = InventoryDao::new(&conn);

        dao.upsert(&item("itm-1", 3.0)).unwrap();
        // 同 id 重复 upsert 覆盖而不新增
        dao.upsert(&item("itm-1", 5.0)).unwrap();
        let got = dao.get_by_id("itm-1").unwrap().unwrap();
        assert_eq!(got.quantity, 5.0);
        assert_eq!(got.expiration_date, NaiveDate::from_ymd_opt(2025, 7, 1));

        dao.upsert(&item("itm-2", 1.0)).unwrap();
        assert_eq!(dao.ids_by_household(1).unwrap().len(), 2);

        dao.delete("itm-1").unwrap();
        assert!(dao.get_by_id("itm-1").unwrap().is_none());
        // 幂等：再删一次不报错
        dao.delete("itm-1").unwrap();
    }
}
