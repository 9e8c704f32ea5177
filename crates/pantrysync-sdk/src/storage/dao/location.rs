//! 位置镜像数据访问层

use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::storage::entities::Location;

pub struct LocationDao<'a> {
    conn: &'a Connection,
}

impl<'a> LocationDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn upsert(&self, location: &Location) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO locations (id, household_id, name, parent_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                location.id,
                location.household_id as i64,
                location.name,
                location.parent_id,
                location.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Location>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, household_id, name, parent_id, updated_at FROM locations WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::row_to_location)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM locations WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn list_by_household(&self, household_id: u64) -> Result<Vec<Location>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, household_id, name, parent_id, updated_at
             FROM locations WHERE household_id = ?1 ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![household_id as i64], Self::row_to_location)?;
        let mut locations = Vec::new();
        for row in rows {
            locations.push(row?);
        }
        Ok(locations)
    }

    fn row_to_location(row: &Row<'_>) -> rusqlite::Result<Location> {
        Ok(Location {
            id: row.get(0)?,
            household_id: row.get::<_, i64>(1)? as u64,
            name: row.get(2)?,
            parent_id: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}
