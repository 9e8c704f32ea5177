//! 购物清单条目镜像数据访问层

use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::storage::entities::GroceryItem;

pub struct GroceryDao<'a> {
    conn: &'a Connection,
}

impl<'a> GroceryDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn upsert(&self, item: &GroceryItem) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO grocery_items
                (id, household_id, name, quantity, checked, product_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.id,
                item.household_id as i64,
                item.name,
                item.quantity,
                item.checked as i64,
                item.product_id,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<GroceryItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, household_id, name, quantity, checked, product_id, updated_at
             FROM grocery_items WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::row_to_item)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM grocery_items WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn list_by_household(&self, household_id: u64) -> Result<Vec<GroceryItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, household_id, name, quantity, checked, product_id, updated_at
             FROM grocery_items WHERE household_id = ?1 ORDER BY checked ASC, name ASC",
        )?;
        let rows = stmt.query_map(params![household_id as i64], Self::row_to_item)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<GroceryItem> {
        Ok(GroceryItem {
            id: row.get(0)?,
            household_id: row.get::<_, i64>(1)? as u64,
            name: row.get(2)?,
            quantity: row.get(3)?,
            checked: row.get::<_, i64>(4)? != 0,
            product_id: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}
