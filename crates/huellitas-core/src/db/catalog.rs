//! Vaccine catalog database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::VaccineCatalogEntry;

impl Database {
    /// Insert or update a vaccine catalog entry.
    pub fn upsert_vaccine(&self, vaccine: &VaccineCatalogEntry) -> DbResult<()> {
        let species_json = serde_json::to_string(&vaccine.species)?;
        let complex_json = serde_json::to_string(&vaccine.complex_protocol)?;
        let juvenile_json = vaccine
            .juvenile_protocol
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            r#"
            INSERT INTO vaccine_catalog (
                id, name, species, obligatory, active, prevents,
                dose_total, dose_interval_weeks, reinforcement_months,
                min_age_weeks, max_backlog_days, complex_protocol,
                juvenile_protocol, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                species = excluded.species,
                obligatory = excluded.obligatory,
                active = excluded.active,
                prevents = excluded.prevents,
                dose_total = excluded.dose_total,
                dose_interval_weeks = excluded.dose_interval_weeks,
                reinforcement_months = excluded.reinforcement_months,
                min_age_weeks = excluded.min_age_weeks,
                max_backlog_days = excluded.max_backlog_days,
                complex_protocol = excluded.complex_protocol,
                juvenile_protocol = excluded.juvenile_protocol,
                updated_at = datetime('now')
            "#,
            params![
                vaccine.id,
                vaccine.name,
                species_json,
                vaccine.obligatory,
                vaccine.active,
                vaccine.prevents,
                vaccine.dose_total,
                vaccine.dose_interval_weeks,
                vaccine.reinforcement_months,
                vaccine.min_age_weeks,
                vaccine.max_backlog_days,
                complex_json,
                juvenile_json,
            ],
        )?;
        Ok(())
    }

    /// Get a vaccine catalog entry by id.
    pub fn get_vaccine(&self, id: &str) -> DbResult<Option<VaccineCatalogEntry>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT id, name, species, obligatory, active, prevents,
                       dose_total, dose_interval_weeks, reinforcement_months,
                       min_age_weeks, max_backlog_days, complex_protocol,
                       juvenile_protocol, created_at, updated_at
                FROM vaccine_catalog
                WHERE id = ?
                "#,
                [id],
                vaccine_row,
            )
            .optional()?;

        result.map(TryInto::try_into).transpose()
    }

    /// List catalog entries, optionally restricted to active ones.
    pub fn list_vaccines(&self, active_only: bool) -> DbResult<Vec<VaccineCatalogEntry>> {
        let sql = if active_only {
            r#"
            SELECT id, name, species, obligatory, active, prevents,
                   dose_total, dose_interval_weeks, reinforcement_months,
                   min_age_weeks, max_backlog_days, complex_protocol,
                   juvenile_protocol, created_at, updated_at
            FROM vaccine_catalog
            WHERE active = 1
            ORDER BY name
            "#
        } else {
            r#"
            SELECT id, name, species, obligatory, active, prevents,
                   dose_total, dose_interval_weeks, reinforcement_months,
                   min_age_weeks, max_backlog_days, complex_protocol,
                   juvenile_protocol, created_at, updated_at
            FROM vaccine_catalog
            ORDER BY name
            "#
        };

        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], vaccine_row)?;

        let mut vaccines = Vec::new();
        for row in rows {
            vaccines.push(row?.try_into()?);
        }
        Ok(vaccines)
    }

    /// Mark a vaccine inactive (soft delete).
    pub fn deactivate_vaccine(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE vaccine_catalog SET active = 0, updated_at = datetime('now') WHERE id = ?",
            [id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct VaccineRow {
    id: String,
    name: String,
    species: String,
    obligatory: bool,
    active: bool,
    prevents: Option<String>,
    dose_total: u32,
    dose_interval_weeks: u32,
    reinforcement_months: u32,
    min_age_weeks: u32,
    max_backlog_days: u32,
    complex_protocol: String,
    juvenile_protocol: Option<String>,
    created_at: String,
    updated_at: String,
}

fn vaccine_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VaccineRow> {
    Ok(VaccineRow {
        id: row.get(0)?,
        name: row.get(1)?,
        species: row.get(2)?,
        obligatory: row.get(3)?,
        active: row.get(4)?,
        prevents: row.get(5)?,
        dose_total: row.get(6)?,
        dose_interval_weeks: row.get(7)?,
        reinforcement_months: row.get(8)?,
        min_age_weeks: row.get(9)?,
        max_backlog_days: row.get(10)?,
        complex_protocol: row.get(11)?,
        juvenile_protocol: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl TryFrom<VaccineRow> for VaccineCatalogEntry {
    type Error = DbError;

    fn try_from(row: VaccineRow) -> Result<Self, Self::Error> {
        Ok(VaccineCatalogEntry {
            id: row.id,
            name: row.name,
            species: serde_json::from_str(&row.species)?,
            obligatory: row.obligatory,
            active: row.active,
            prevents: row.prevents,
            dose_total: row.dose_total,
            dose_interval_weeks: row.dose_interval_weeks,
            reinforcement_months: row.reinforcement_months,
            min_age_weeks: row.min_age_weeks,
            max_backlog_days: row.max_backlog_days,
            complex_protocol: serde_json::from_str(&row.complex_protocol)?,
            juvenile_protocol: row
                .juvenile_protocol
                .map(|s| serde_json::from_str(&s))
                .transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
