//! Vaccination record database operations.
//!
//! The ledger is append-mostly: records are inserted by the apply pipeline
//! and mutated only by the two bulk transitions (supersession and
//! restart-marking). Nothing here deletes.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{ApplicationRecord, RecordStatus};

const RECORD_COLUMNS: &str = "id, animal_id, vaccine_id, veterinarian_id, \
                              application_date, next_due_date, dose_number, status, \
                              batch_lot, manufacturer, notes, created_at";

impl Database {
    /// Insert a new vaccination record.
    pub fn insert_record(&self, record: &ApplicationRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO vaccination_records (
                id, animal_id, vaccine_id, veterinarian_id,
                application_date, next_due_date, dose_number, status,
                batch_lot, manufacturer, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                record.id,
                record.animal_id,
                record.vaccine_id,
                record.veterinarian_id,
                record.application_date,
                record.next_due_date,
                record.dose_number,
                record.status.as_str(),
                record.batch_lot,
                record.manufacturer,
                record.notes,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a record by id.
    pub fn get_record(&self, id: &str) -> DbResult<Option<ApplicationRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM vaccination_records WHERE id = ?"),
                [id],
                record_row,
            )
            .optional()?
            .map(TryInto::try_into)
            .transpose()
    }

    /// All records for an (animal, vaccine) pair, newest application first.
    pub fn records_for_pair(
        &self,
        animal_id: &str,
        vaccine_id: &str,
    ) -> DbResult<Vec<ApplicationRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM vaccination_records
            WHERE animal_id = ?1 AND vaccine_id = ?2
            ORDER BY application_date DESC, created_at DESC
            "#
        ))?;

        let rows = stmt.query_map(params![animal_id, vaccine_id], record_row)?;
        collect_records(rows)
    }

    /// Doses that count toward the pair's current protocol (everything not
    /// voided by a restart, superseded records included).
    pub fn count_protocol_applications(&self, animal_id: &str, vaccine_id: &str) -> DbResult<u32> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM vaccination_records
            WHERE animal_id = ?1 AND vaccine_id = ?2 AND status != 'restart-required'
            "#,
            params![animal_id, vaccine_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Authoritative probe for an identical application; backs the final
    /// duplicate check inside the apply transaction.
    pub fn exact_application_exists(
        &self,
        animal_id: &str,
        vaccine_id: &str,
        application_date: NaiveDate,
        dose_number: u32,
    ) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM vaccination_records
            WHERE animal_id = ?1 AND vaccine_id = ?2
              AND application_date = ?3 AND dose_number = ?4
              AND status != 'restart-required'
            "#,
            params![animal_id, vaccine_id, application_date, dose_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Every record ever written for an animal, newest first.
    pub fn records_for_animal(&self, animal_id: &str) -> DbResult<Vec<ApplicationRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM vaccination_records
            WHERE animal_id = ?
            ORDER BY application_date DESC, created_at DESC
            "#
        ))?;

        let rows = stmt.query_map([animal_id], record_row)?;
        collect_records(rows)
    }

    /// Records for an animal that have not been superseded, newest first.
    pub fn open_records_for_animal(&self, animal_id: &str) -> DbResult<Vec<ApplicationRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM vaccination_records
            WHERE animal_id = ? AND status != 'superseded'
            ORDER BY application_date DESC, created_at DESC
            "#
        ))?;

        let rows = stmt.query_map([animal_id], record_row)?;
        collect_records(rows)
    }

    /// All non-superseded records system-wide, soonest due first.
    pub fn open_records(&self) -> DbResult<Vec<ApplicationRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM vaccination_records
            WHERE status != 'superseded'
            ORDER BY next_due_date ASC, application_date DESC
            "#
        ))?;

        let rows = stmt.query_map([], record_row)?;
        collect_records(rows)
    }

    /// Mark the pair's earlier active records as superseded by a newer one.
    /// Returns the ids that were transitioned.
    pub fn supersede_active_for_pair(
        &self,
        animal_id: &str,
        vaccine_id: &str,
        exclude_record_id: &str,
    ) -> DbResult<Vec<String>> {
        let ids = self.pair_record_ids(
            animal_id,
            vaccine_id,
            "status NOT IN ('superseded', 'restart-required')",
            exclude_record_id,
        )?;
        self.set_status(&ids, RecordStatus::Superseded)?;
        Ok(ids)
    }

    /// Void the pair's history after a protocol restart: every record not
    /// already restart-marked stops counting toward dose progression.
    /// Returns the ids that were transitioned.
    pub fn mark_restart_for_pair(
        &self,
        animal_id: &str,
        vaccine_id: &str,
        exclude_record_id: &str,
    ) -> DbResult<Vec<String>> {
        let ids = self.pair_record_ids(
            animal_id,
            vaccine_id,
            "status != 'restart-required'",
            exclude_record_id,
        )?;
        self.set_status(&ids, RecordStatus::RestartRequired)?;
        Ok(ids)
    }

    fn pair_record_ids(
        &self,
        animal_id: &str,
        vaccine_id: &str,
        status_filter: &str,
        exclude_record_id: &str,
    ) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT id FROM vaccination_records
            WHERE animal_id = ?1 AND vaccine_id = ?2 AND id != ?3 AND {status_filter}
            "#
        ))?;
        let rows = stmt.query_map(params![animal_id, vaccine_id, exclude_record_id], |row| {
            row.get(0)
        })?;
        rows.collect::<Result<Vec<String>, _>>().map_err(Into::into)
    }

    fn set_status(&self, ids: &[String], status: RecordStatus) -> DbResult<()> {
        let mut stmt = self
            .conn
            .prepare("UPDATE vaccination_records SET status = ?1 WHERE id = ?2")?;
        for id in ids {
            stmt.execute(params![status.as_str(), id])?;
        }
        Ok(())
    }

    /// Persist a recomputed status for a single record.
    pub fn update_record_status(&self, id: &str, status: RecordStatus) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE vaccination_records SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct RecordRow {
    id: String,
    animal_id: String,
    vaccine_id: String,
    veterinarian_id: String,
    application_date: NaiveDate,
    next_due_date: Option<NaiveDate>,
    dose_number: u32,
    status: String,
    batch_lot: Option<String>,
    manufacturer: Option<String>,
    notes: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

fn record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        animal_id: row.get(1)?,
        vaccine_id: row.get(2)?,
        veterinarian_id: row.get(3)?,
        application_date: row.get(4)?,
        next_due_date: row.get(5)?,
        dose_number: row.get(6)?,
        status: row.get(7)?,
        batch_lot: row.get(8)?,
        manufacturer: row.get(9)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
    })
}

impl TryFrom<RecordRow> for ApplicationRecord {
    type Error = DbError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let status = RecordStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("unknown record status: {}", row.status)))?;
        Ok(ApplicationRecord {
            id: row.id,
            animal_id: row.animal_id,
            vaccine_id: row.vaccine_id,
            veterinarian_id: row.veterinarian_id,
            application_date: row.application_date,
            next_due_date: row.next_due_date,
            dose_number: row.dose_number,
            status,
            batch_lot: row.batch_lot,
            manufacturer: row.manufacturer,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

fn collect_records(
    rows: impl Iterator<Item = rusqlite::Result<RecordRow>>,
) -> DbResult<Vec<ApplicationRecord>> {
    let mut records = Vec::new();
    for row in rows {
        records.push(row?.try_into()?);
    }
    Ok(records)
}
