//! household 镜像数据访问层

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::storage::entities::Household;

pub struct HouseholdDao<'a> {
    conn: &'a Connection,
}

impl<'a> HouseholdDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn upsert(&self, household: &Household) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO households (id, name, updated_at) VALUES (?1, ?2, ?3)",
            params![household.id as i64, household.name, household.updated_at],
        )?;
        Ok(())
    }

    pub fn get_by_id(&self, id: u64) -> Result<Option<Household>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, updated_at FROM households WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id as i64], |row| {
            Ok(Household {
                id: row.get::<_, i64>(0)? as u64,
                name: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, id: u64) -> Result<()> {
        self.conn
            .execute("DELETE FROM households WHERE id = ?1", params![id as i64])?;
        Ok(())
    }
}
