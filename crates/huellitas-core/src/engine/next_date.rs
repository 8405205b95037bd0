//! Next-due-date calculation.

use chrono::{Days, Months, NaiveDate};

use super::EngineError;
use crate::models::{ProtocolInfo, VaccineCatalogEntry};

/// The computed next action for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextAction {
    /// When the next dose or reinforcement is due; strictly after the
    /// application date.
    pub due_date: NaiveDate,
    /// True once the protocol is complete and the next action is a periodic
    /// reinforcement.
    pub is_final_dose: bool,
}

/// Compute the due date for the action following this application.
///
/// Three cases in order: single-dose vaccine, incomplete protocol, completed
/// protocol. An interval the configuration cannot supply falls back to the
/// reinforcement path so a record is never left undated; the fault is logged
/// and a reinforcement that cannot produce a forward date is a hard
/// configuration error.
pub fn compute_next_due(
    application_date: NaiveDate,
    dose_number: u32,
    protocol: &ProtocolInfo,
    vaccine: &VaccineCatalogEntry,
) -> Result<NextAction, EngineError> {
    if dose_number < protocol.effective_dose_total && !protocol.is_single_dose() {
        let weeks = match protocol.interval_after_dose(dose_number) {
            Some(weeks) if weeks > 0 => weeks,
            _ if vaccine.dose_interval_weeks > 0 => vaccine.dose_interval_weeks,
            _ => {
                tracing::warn!(
                    vaccine_id = %vaccine.id,
                    dose_number,
                    "no usable interval for mid-protocol dose, falling back to reinforcement"
                );
                return reinforcement(application_date, vaccine);
            }
        };
        let due_date = application_date
            .checked_add_days(Days::new(u64::from(weeks) * 7))
            .filter(|due| *due > application_date)
            .ok_or_else(|| interval_fault(vaccine))?;
        return Ok(NextAction { due_date, is_final_dose: false });
    }

    reinforcement(application_date, vaccine)
}

fn reinforcement(
    application_date: NaiveDate,
    vaccine: &VaccineCatalogEntry,
) -> Result<NextAction, EngineError> {
    let due_date = application_date
        .checked_add_months(Months::new(vaccine.reinforcement_months))
        .filter(|due| *due > application_date)
        .ok_or_else(|| interval_fault(vaccine))?;
    Ok(NextAction { due_date, is_final_dose: true })
}

fn interval_fault(vaccine: &VaccineCatalogEntry) -> EngineError {
    tracing::error!(
        vaccine_id = %vaccine.id,
        "vaccine configuration cannot produce a forward due date"
    );
    EngineError::ConfigurationError(format!(
        "vaccine '{}' cannot produce a due date after the application date",
        vaccine.name
    ))
}
