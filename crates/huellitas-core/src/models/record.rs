//! Application record models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Display/lifecycle status of an application record.
///
/// `applied` is the stored state at creation; the read side always recomputes
/// the display status from dates (see `engine::status`), so stored values
/// other than `restart-required` and `superseded` are advisory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    /// Freshly recorded application
    Applied,
    /// Next due date is comfortably in the future
    Valid,
    /// Next due date within the alert window
    DueSoon,
    /// Next due date has passed
    Overdue,
    /// Protocol lapsed; progress voided, must restart from dose 1
    RestartRequired,
    /// Rendered obsolete by a later record for the same pair
    Superseded,
}

impl RecordStatus {
    /// Stable string form used in storage and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Applied => "applied",
            RecordStatus::Valid => "valid",
            RecordStatus::DueSoon => "due-soon",
            RecordStatus::Overdue => "overdue",
            RecordStatus::RestartRequired => "restart-required",
            RecordStatus::Superseded => "superseded",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(RecordStatus::Applied),
            "valid" => Some(RecordStatus::Valid),
            "due-soon" => Some(RecordStatus::DueSoon),
            "overdue" => Some(RecordStatus::Overdue),
            "restart-required" => Some(RecordStatus::RestartRequired),
            "superseded" => Some(RecordStatus::Superseded),
            _ => None,
        }
    }

    /// Whether the record still represents the pair's current protocol state.
    pub fn is_active(&self) -> bool {
        !matches!(self, RecordStatus::Superseded | RecordStatus::RestartRequired)
    }

    /// Whether the record counts as a given dose of the current protocol.
    /// Restart-voided records do not; superseded ones still do.
    pub fn counts_toward_protocol(&self) -> bool {
        !matches!(self, RecordStatus::RestartRequired)
    }
}

/// One dose ever given (or recorded) to an animal for a vaccine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationRecord {
    /// Unique record id
    pub id: String,
    /// Animal the dose was given to
    pub animal_id: String,
    /// Vaccine catalog entry
    pub vaccine_id: String,
    /// Veterinarian who applied it
    pub veterinarian_id: String,
    /// Date the dose was applied
    pub application_date: NaiveDate,
    /// Promised date of the next action (dose or reinforcement)
    pub next_due_date: Option<NaiveDate>,
    /// 1-based dose index within the protocol
    pub dose_number: u32,
    /// Stored status
    pub status: RecordStatus,
    /// Batch/lot identifier
    pub batch_lot: Option<String>,
    /// Manufacturer
    pub manufacturer: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Creation instant, used only for race-window duplicate detection
    pub created_at: DateTime<Utc>,
}

impl ApplicationRecord {
    /// Create a new record in the `applied` state.
    ///
    /// The creation instant is passed in rather than read from the ambient
    /// clock so the race-window check stays deterministic in tests.
    pub fn new(
        animal_id: String,
        vaccine_id: String,
        veterinarian_id: String,
        application_date: NaiveDate,
        dose_number: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            animal_id,
            vaccine_id,
            veterinarian_id,
            application_date,
            next_due_date: None,
            dose_number,
            status: RecordStatus::Applied,
            batch_lot: None,
            manufacturer: None,
            notes: None,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        let all = [
            RecordStatus::Applied,
            RecordStatus::Valid,
            RecordStatus::DueSoon,
            RecordStatus::Overdue,
            RecordStatus::RestartRequired,
            RecordStatus::Superseded,
        ];
        for status in all {
            assert_eq!(RecordStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RecordStatus::parse("bogus"), None);
    }

    #[test]
    fn test_activity_classification() {
        assert!(RecordStatus::Applied.is_active());
        assert!(RecordStatus::Overdue.is_active());
        assert!(!RecordStatus::Superseded.is_active());
        assert!(!RecordStatus::RestartRequired.is_active());

        assert!(RecordStatus::Superseded.counts_toward_protocol());
        assert!(!RecordStatus::RestartRequired.counts_toward_protocol());
    }

    #[test]
    fn test_new_record_defaults() {
        let record = ApplicationRecord::new(
            "animal-1".into(),
            "vaccine-1".into(),
            "vet-1".into(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            1,
            Utc::now(),
        );
        assert_eq!(record.status, RecordStatus::Applied);
        assert!(record.next_due_date.is_none());
        assert_eq!(record.dose_number, 1);
    }
}
