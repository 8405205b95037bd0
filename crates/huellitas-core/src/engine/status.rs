//! Read-time status derivation.
//!
//! The stored status of a record can go stale the moment the clock moves, so
//! every read surface recomputes the display status from the stored dates and
//! an explicit `today`. Stored `superseded` and `restart-required` are
//! terminal and pass through untouched.

use chrono::NaiveDate;

use crate::models::{ApplicationRecord, RecordStatus};

/// Days before the due date during which a record reads as due-soon.
pub const DUE_SOON_WINDOW_DAYS: i64 = 30;

/// Days past the due date after which a multi-dose protocol reads as lapsed.
pub const RESTART_HINT_DAYS: i64 = 60;

/// Derive the display status of a record as of `today`.
///
/// Pure: same inputs, same answer.
pub fn derive_status(
    record: &ApplicationRecord,
    effective_dose_total: u32,
    today: NaiveDate,
) -> RecordStatus {
    if !record.status.is_active() {
        return record.status;
    }

    let due = match record.next_due_date {
        Some(due) => due,
        None => return record.status,
    };

    let days_until_due = (due - today).num_days();
    if days_until_due < 0 {
        if -days_until_due > RESTART_HINT_DAYS && effective_dose_total > 1 {
            return RecordStatus::RestartRequired;
        }
        return RecordStatus::Overdue;
    }
    if days_until_due <= DUE_SOON_WINDOW_DAYS {
        return RecordStatus::DueSoon;
    }
    RecordStatus::Valid
}

/// Signed days until the record's due date; negative once overdue.
pub fn days_until_due(record: &ApplicationRecord, today: NaiveDate) -> Option<i64> {
    record.next_due_date.map(|due| (due - today).num_days())
}
