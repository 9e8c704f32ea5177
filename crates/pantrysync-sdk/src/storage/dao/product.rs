//! 商品镜像数据访问层

use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::storage::entities::Product;

pub struct ProductDao<'a> {
    conn: &'a Connection,
}

impl<'a> ProductDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 插入或更新商品（id 维度幂等）
    pub fn upsert(&self, product: &Product) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO products
                (id, household_id, name, brand, upc, default_location_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                product.id,
                product.household_id as i64,
                product.name,
                product.brand,
                product.upc,
                product.default_location_id,
                product.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, household_id, name, brand, upc, default_location_id, updated_at
             FROM products WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::row_to_product)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM products WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn list_by_household(&self, household_id: u64) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, household_id, name, brand, upc, default_location_id, updated_at
             FROM products WHERE household_id = ?1 ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![household_id as i64], Self::row_to_product)?;
        let mut products = Vec::new();
        for row in rows {
            products.push(row?);
        }
        Ok(products)
    }

    fn row_to_product(row: &Row<'_>) -> rusqlite::Result<Product> {
        Ok(Product {
            id: row.get(0)?,
            household_id: row.get::<_, i64>(1)? as u64,
            name: row.get(2)?,
            brand: row.get(3)?,
            upc: row.get(4)?,
            default_location_id: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}
