//! Backlog/restart detection.
//!
//! Lateness is measured against the prior record's promised `next_due_date`,
//! not its application date. A mid-protocol dose always gets the scheduled
//! interval plus three weeks of grace; when no interval covers the dose the
//! vaccine's configured backlog ceiling applies instead.

use chrono::NaiveDate;

use crate::models::{ApplicationRecord, ProtocolInfo, VaccineCatalogEntry};

/// Flat grace period on top of a mid-protocol interval, in days.
pub const BACKLOG_GRACE_DAYS: i64 = 21;

/// Outcome of the backlog check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacklogDecision {
    /// Progress is void; the application becomes dose 1 of a fresh protocol.
    pub must_restart: bool,
    /// Days past the prior promised due date (negative when early).
    pub days_late: i64,
}

impl BacklogDecision {
    fn on_time() -> Self {
        Self { must_restart: false, days_late: 0 }
    }
}

/// Decide whether the gap since the prior record breaks the protocol.
///
/// `prior` is the pair's most recent record that still counts toward the
/// protocol; pass `None` on a first application.
pub fn check_backlog(
    prior: Option<&ApplicationRecord>,
    application_date: NaiveDate,
    protocol: &ProtocolInfo,
    vaccine: &VaccineCatalogEntry,
) -> BacklogDecision {
    let prior = match prior {
        Some(prior) => prior,
        None => return BacklogDecision::on_time(),
    };
    let promised = match prior.next_due_date {
        Some(due) => due,
        None => return BacklogDecision::on_time(),
    };

    let days_late = (application_date - promised).num_days();
    let max_allowed = match protocol.interval_after_dose(prior.dose_number) {
        Some(weeks) => i64::from(weeks) * 7 + BACKLOG_GRACE_DAYS,
        None => i64::from(vaccine.max_backlog_days),
    };

    let must_restart = days_late > max_allowed;
    if must_restart {
        tracing::info!(
            animal_id = %prior.animal_id,
            vaccine_id = %prior.vaccine_id,
            days_late,
            max_allowed,
            "protocol backlog exceeded, restarting from dose 1"
        );
    }

    BacklogDecision { must_restart, days_late }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProtocolKind;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn prior_due(due: &str, dose_number: u32) -> ApplicationRecord {
        let mut record = ApplicationRecord::new(
            "animal-1".into(),
            "vaccine-1".into(),
            "vet-1".into(),
            date("2024-12-15"),
            dose_number,
            Utc::now(),
        );
        record.next_due_date = Some(date(due));
        record
    }

    fn two_week_protocol() -> (ProtocolInfo, VaccineCatalogEntry) {
        let mut vaccine = VaccineCatalogEntry::new("Quintuple (DHPP)".into());
        vaccine.dose_total = 3;
        vaccine.dose_interval_weeks = 2;
        let protocol = ProtocolInfo {
            kind: ProtocolKind::Standard,
            effective_dose_total: 3,
            intervals_weeks: vec![2, 2],
        };
        (protocol, vaccine)
    }

    #[test]
    fn test_no_prior_is_on_time() {
        let (protocol, vaccine) = two_week_protocol();
        let decision = check_backlog(None, date("2025-03-01"), &protocol, &vaccine);
        assert!(!decision.must_restart);
    }

    #[test]
    fn test_mid_protocol_slack_is_interval_plus_grace() {
        // interval 2 weeks -> 14 + 21 = 35 days allowed past the due date
        let (protocol, vaccine) = two_week_protocol();
        let prior = prior_due("2025-01-01", 1);

        let late_59 = check_backlog(Some(&prior), date("2025-03-01"), &protocol, &vaccine);
        assert!(late_59.must_restart);
        assert_eq!(late_59.days_late, 59);

        let late_19 = check_backlog(Some(&prior), date("2025-01-20"), &protocol, &vaccine);
        assert!(!late_19.must_restart);
        assert_eq!(late_19.days_late, 19);

        let late_35 = check_backlog(Some(&prior), date("2025-02-05"), &protocol, &vaccine);
        assert!(!late_35.must_restart, "boundary day is still allowed");

        let late_36 = check_backlog(Some(&prior), date("2025-02-06"), &protocol, &vaccine);
        assert!(late_36.must_restart);
    }

    #[test]
    fn test_uncovered_dose_uses_vaccine_ceiling() {
        let (protocol, mut vaccine) = two_week_protocol();
        vaccine.max_backlog_days = 10;
        // dose 3 is the final dose; no interval covers it
        let prior = prior_due("2025-01-01", 3);

        let late_11 = check_backlog(Some(&prior), date("2025-01-12"), &protocol, &vaccine);
        assert!(late_11.must_restart);

        let late_10 = check_backlog(Some(&prior), date("2025-01-11"), &protocol, &vaccine);
        assert!(!late_10.must_restart);
    }

    #[test]
    fn test_early_application_never_restarts() {
        let (protocol, vaccine) = two_week_protocol();
        let prior = prior_due("2025-02-01", 1);
        let decision = check_backlog(Some(&prior), date("2025-01-20"), &protocol, &vaccine);
        assert!(!decision.must_restart);
        assert_eq!(decision.days_late, -12);
    }
}
