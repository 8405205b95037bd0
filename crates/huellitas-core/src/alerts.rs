//! Read-only alert surface.
//!
//! Lists records whose derived status says attention is due. The verdict
//! always comes from [`engine::status::derive_status`] against an explicit
//! `today`; the stored status column is never consulted for it. Pure reads,
//! no locking.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::db::Database;
use crate::engine::status::{days_until_due, derive_status};
use crate::engine::EngineResult;
use crate::models::{ApplicationRecord, RecordStatus};

/// One record needing attention.
#[derive(Debug, Clone)]
pub struct AlertEntry {
    pub record: ApplicationRecord,
    /// Derived as of the query's `today`.
    pub derived_status: RecordStatus,
    /// Signed days until the due date; negative once overdue.
    pub days_until_due: i64,
}

/// All records system-wide that are due soon, overdue, or lapsed, soonest
/// first.
pub fn due_alerts(db: &Database, today: NaiveDate) -> EngineResult<Vec<AlertEntry>> {
    let records = db.open_records()?;
    build_alerts(db, records, today)
}

/// The due/overdue/lapsed records of one animal, soonest first.
pub fn due_alerts_for_animal(
    db: &Database,
    animal_id: &str,
    today: NaiveDate,
) -> EngineResult<Vec<AlertEntry>> {
    let records = db.open_records_for_animal(animal_id)?;
    build_alerts(db, records, today)
}

fn build_alerts(
    db: &Database,
    records: Vec<ApplicationRecord>,
    today: NaiveDate,
) -> EngineResult<Vec<AlertEntry>> {
    // Dose totals per vaccine, fetched once per distinct vaccine
    let mut totals: HashMap<String, u32> = HashMap::new();
    let mut alerts = Vec::new();

    for record in records {
        let total = match totals.get(&record.vaccine_id) {
            Some(&total) => total,
            None => {
                let total = db
                    .get_vaccine(&record.vaccine_id)?
                    .map(|v| v.base_dose_total())
                    .unwrap_or(1);
                totals.insert(record.vaccine_id.clone(), total);
                total
            }
        };

        let derived = derive_status(&record, total, today);
        if !matches!(
            derived,
            RecordStatus::DueSoon | RecordStatus::Overdue | RecordStatus::RestartRequired
        ) {
            continue;
        }
        let days = match days_until_due(&record, today) {
            Some(days) => days,
            None => continue,
        };
        alerts.push(AlertEntry { record, derived_status: derived, days_until_due: days });
    }

    alerts.sort_by_key(|a| a.days_until_due);
    Ok(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Animal, VaccineCatalogEntry, Veterinarian};
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct Fixture {
        db: Database,
        animal_id: String,
        vaccine_id: String,
        vet_id: String,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let animal = Animal::new("Rex".into(), "canine".into());
        let vaccine = VaccineCatalogEntry::new("Rabies".into());
        let vet = Veterinarian::new("Dr. Carlos".into());
        db.insert_animal(&animal).unwrap();
        db.upsert_vaccine(&vaccine).unwrap();
        db.insert_veterinarian(&vet).unwrap();
        Fixture { db, animal_id: animal.id, vaccine_id: vaccine.id, vet_id: vet.id }
    }

    fn insert_due(fx: &Fixture, applied: &str, due: &str) -> ApplicationRecord {
        let mut record = ApplicationRecord::new(
            fx.animal_id.clone(),
            fx.vaccine_id.clone(),
            fx.vet_id.clone(),
            date(applied),
            1,
            Utc::now(),
        );
        record.next_due_date = Some(date(due));
        fx.db.insert_record(&record).unwrap();
        record
    }

    #[test]
    fn test_alerts_use_derived_status() {
        let fx = setup();
        // Stored status stays 'applied'; only the dates decide
        insert_due(&fx, "2025-06-01", "2026-06-01");

        let quiet = due_alerts(&fx.db, date("2025-07-01")).unwrap();
        assert!(quiet.is_empty());

        let soon = due_alerts(&fx.db, date("2026-05-20")).unwrap();
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].derived_status, RecordStatus::DueSoon);
        assert_eq!(soon[0].days_until_due, 12);

        let late = due_alerts(&fx.db, date("2026-06-15")).unwrap();
        assert_eq!(late[0].derived_status, RecordStatus::Overdue);
        assert_eq!(late[0].days_until_due, -14);
    }

    #[test]
    fn test_per_animal_filter() {
        let fx = setup();
        insert_due(&fx, "2025-06-01", "2025-07-01");

        let other = Animal::new("Luna".into(), "feline".into());
        fx.db.insert_animal(&other).unwrap();

        let mine = due_alerts_for_animal(&fx.db, &fx.animal_id, date("2025-07-10")).unwrap();
        assert_eq!(mine.len(), 1);

        let theirs = due_alerts_for_animal(&fx.db, &other.id, date("2025-07-10")).unwrap();
        assert!(theirs.is_empty());
    }

    #[test]
    fn test_soonest_first() {
        let fx = setup();
        insert_due(&fx, "2025-05-01", "2025-08-01");
        insert_due(&fx, "2025-04-01", "2025-07-05");

        let alerts = due_alerts(&fx.db, date("2025-07-10")).unwrap();
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].days_until_due < alerts[1].days_until_due);
    }
}
