//! Veterinarian database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::Veterinarian;

fn vet_from_row(row: &Row<'_>) -> rusqlite::Result<Veterinarian> {
    Ok(Veterinarian {
        id: row.get(0)?,
        name: row.get(1)?,
        license_number: row.get(2)?,
        active: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const VET_COLUMNS: &str = "id, name, license_number, active, created_at, updated_at";

impl Database {
    /// Insert a new veterinarian.
    pub fn insert_veterinarian(&self, vet: &Veterinarian) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO veterinarians (
                id, name, license_number, active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                vet.id,
                vet.name,
                vet.license_number,
                vet.active,
                vet.created_at,
                vet.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a veterinarian by id.
    pub fn get_veterinarian(&self, id: &str) -> DbResult<Option<Veterinarian>> {
        self.conn
            .query_row(
                &format!("SELECT {VET_COLUMNS} FROM veterinarians WHERE id = ?"),
                [id],
                vet_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List active veterinarians.
    pub fn list_veterinarians(&self) -> DbResult<Vec<Veterinarian>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VET_COLUMNS} FROM veterinarians WHERE active = 1 ORDER BY name"
        ))?;

        let rows = stmt.query_map([], vet_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Mark a veterinarian inactive (soft delete).
    pub fn deactivate_veterinarian(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE veterinarians SET active = 0, updated_at = datetime('now') WHERE id = ?",
            [id],
        )?;
        Ok(rows_affected > 0)
    }
}
