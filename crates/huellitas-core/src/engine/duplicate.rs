//! Duplicate-application guard.
//!
//! Pure over the pre-fetched records for the (animal, vaccine) pair. Five
//! ordered checks, each a hard rejection with a distinct error kind so the
//! caller can present an actionable message. Nothing here is retried
//! automatically.

use chrono::{DateTime, NaiveDate, Utc};

use super::status::derive_status;
use super::EngineError;
use crate::models::{ApplicationRecord, ProtocolInfo, RecordStatus};

/// Upper bound on a dose number, independent of any protocol.
pub const MAX_DOSE_NUMBER: u32 = 50;

/// Absolute ceiling on applications of one vaccine to one animal, counting
/// reinforcements past the protocol total.
pub const MAX_TOTAL_APPLICATIONS: u32 = 20;

/// Window on `created_at` treated as a double-submission race.
pub const RACE_WINDOW_SECONDS: i64 = 30;

/// Run the duplicate checks for a candidate application.
///
/// `priors` is every record for the pair; `now` feeds only the race-window
/// check and `today` only the still-valid checks.
pub fn check_duplicate(
    priors: &[ApplicationRecord],
    protocol: &ProtocolInfo,
    application_date: NaiveDate,
    dose_number: u32,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let counting = priors
        .iter()
        .filter(|r| r.status.counts_toward_protocol())
        .count() as u32;

    // 1. Structural bounds
    if dose_number < 1 || dose_number > MAX_DOSE_NUMBER {
        return Err(EngineError::InvalidDoseNumber { dose_number });
    }
    if dose_number > protocol.effective_dose_total {
        let is_reinforcement = counting >= protocol.effective_dose_total
            && counting < MAX_TOTAL_APPLICATIONS
            && dose_number <= MAX_TOTAL_APPLICATIONS;
        if !is_reinforcement {
            return Err(EngineError::DoseExceedsProtocol {
                dose_number,
                effective_dose_total: protocol.effective_dose_total,
            });
        }
    }

    let active: Vec<&ApplicationRecord> =
        priors.iter().filter(|r| r.status.is_active()).collect();

    // 2. Recent-duplicate window (double submission)
    for record in &active {
        if record.application_date == application_date
            && record.dose_number == dose_number
            && (now - record.created_at).num_seconds() <= RACE_WINDOW_SECONDS
        {
            tracing::warn!(
                animal_id = %record.animal_id,
                vaccine_id = %record.vaccine_id,
                dose_number,
                existing_record = %record.id,
                "identical application submitted within the race window"
            );
            return Err(EngineError::RecentDuplicateWindow { dose_number });
        }
    }

    // 3. Exact-match same day: an identical dose, or a day already holding
    // the whole protocol, regardless of creation time
    let same_day_active = active
        .iter()
        .filter(|r| r.application_date == application_date)
        .count() as u32;
    let identical = active
        .iter()
        .any(|r| r.application_date == application_date && r.dose_number == dose_number);
    if identical || same_day_active >= protocol.effective_dose_total {
        tracing::warn!(
            application_date = %application_date,
            dose_number,
            same_day_active,
            "duplicate same-day application rejected"
        );
        return Err(EngineError::DuplicateExactSameDay { application_date });
    }

    // 4. Still-valid single dose
    if protocol.is_single_dose() {
        if let Some(record) = active
            .iter()
            .find(|r| r.next_due_date.is_some_and(|due| due > today))
        {
            return Err(EngineError::VaccineStillValid {
                valid_until: record.next_due_date.unwrap_or(today),
            });
        }
    }

    // 5. Active multi-dose protocol: fully applied and not yet expired
    if !protocol.is_single_dose() && counting >= protocol.effective_dose_total {
        let still_current = active.iter().any(|r| {
            !matches!(
                derive_status(r, protocol.effective_dose_total, today),
                RecordStatus::Overdue | RecordStatus::RestartRequired
            )
        });
        if still_current {
            return Err(EngineError::ProtocolStillActive);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProtocolKind;
    use chrono::Duration;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn protocol(total: u32) -> ProtocolInfo {
        ProtocolInfo {
            kind: ProtocolKind::Standard,
            effective_dose_total: total,
            intervals_weeks: vec![4; total.saturating_sub(1) as usize],
        }
    }

    fn record(day: &str, dose: u32, due: &str, created_at: DateTime<Utc>) -> ApplicationRecord {
        let mut r = ApplicationRecord::new(
            "animal-1".into(),
            "vaccine-1".into(),
            "vet-1".into(),
            date(day),
            dose,
            created_at,
        );
        r.next_due_date = Some(date(due));
        r
    }

    #[test]
    fn test_dose_number_bounds() {
        let err = check_duplicate(&[], &protocol(3), date("2025-06-01"), 0, date("2025-06-01"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDoseNumber { .. }));

        let err = check_duplicate(&[], &protocol(3), date("2025-06-01"), 51, date("2025-06-01"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDoseNumber { .. }));
    }

    #[test]
    fn test_dose_exceeds_protocol_without_priors() {
        let err = check_duplicate(&[], &protocol(3), date("2025-06-01"), 4, date("2025-06-01"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::DoseExceedsProtocol { .. }));
    }

    #[test]
    fn test_reinforcement_allowance() {
        let now = Utc::now();
        let old = now - Duration::days(400);
        // Completed 3-dose protocol, all long expired
        let priors = vec![
            record("2023-01-01", 1, "2023-01-29", old),
            record("2023-01-29", 2, "2023-02-26", old),
            record("2023-02-26", 3, "2024-02-26", old),
        ];

        let ok = check_duplicate(&priors, &protocol(3), date("2025-06-01"), 4, date("2025-06-01"), now);
        assert!(ok.is_ok());

        // But never past the absolute ceiling
        let err =
            check_duplicate(&priors, &protocol(3), date("2025-06-01"), 21, date("2025-06-01"), now)
                .unwrap_err();
        assert!(matches!(err, EngineError::DoseExceedsProtocol { .. }));
    }

    #[test]
    fn test_race_window() {
        let now = Utc::now();
        let priors = vec![record("2025-06-01", 1, "2026-06-01", now - Duration::seconds(5))];

        let err = check_duplicate(&priors, &protocol(3), date("2025-06-01"), 1, date("2025-06-01"), now)
            .unwrap_err();
        assert!(matches!(err, EngineError::RecentDuplicateWindow { .. }));
    }

    #[test]
    fn test_exact_same_day() {
        let now = Utc::now();
        // Created well outside the race window
        let priors = vec![record("2025-06-01", 1, "2026-06-01", now - Duration::hours(2))];

        let err = check_duplicate(&priors, &protocol(3), date("2025-06-01"), 1, date("2025-06-01"), now)
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateExactSameDay { .. }));
    }

    #[test]
    fn test_same_day_full_protocol_rejected_for_any_dose() {
        let now = Utc::now();
        // Single-dose vaccine already given that day; dose 2 same day is
        // still the literal duplicate case
        let priors = vec![record("2025-06-01", 1, "2026-06-01", now - Duration::hours(2))];

        let err = check_duplicate(&priors, &protocol(1), date("2025-06-01"), 2, date("2025-06-01"), now)
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateExactSameDay { .. }));
    }

    #[test]
    fn test_still_valid_single_dose() {
        let now = Utc::now();
        let priors = vec![record("2025-06-01", 1, "2026-06-01", now - Duration::days(30))];

        let err = check_duplicate(&priors, &protocol(1), date("2025-07-01"), 2, date("2025-07-01"), now)
            .unwrap_err();
        assert!(matches!(err, EngineError::VaccineStillValid { .. }));

        // Expired, so a reinforcement goes through
        let ok = check_duplicate(&priors, &protocol(1), date("2026-07-01"), 2, date("2026-07-01"), now);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_active_multi_dose_protocol() {
        let now = Utc::now();
        let old = now - Duration::days(60);
        let priors = vec![
            record("2025-04-01", 1, "2025-04-29", old),
            record("2025-04-29", 2, "2025-05-27", old),
            record("2025-05-27", 3, "2026-05-27", old),
        ];

        // Final dose still valid on 2025-08-01
        let err = check_duplicate(&priors, &protocol(3), date("2025-08-01"), 4, date("2025-08-01"), now)
            .unwrap_err();
        assert!(matches!(err, EngineError::ProtocolStillActive));
    }

    #[test]
    fn test_clean_continuation_passes() {
        let now = Utc::now();
        let priors = vec![record("2025-06-01", 1, "2025-06-29", now - Duration::days(28))];

        let ok = check_duplicate(&priors, &protocol(3), date("2025-06-29"), 2, date("2025-06-29"), now);
        assert!(ok.is_ok());
    }
}
