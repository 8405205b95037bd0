//! The vaccination protocol engine.
//!
//! An apply request flows through one pipeline:
//!
//! ```text
//! validate input -> resolve referents -> screen (species, age)
//!     -> duplicate guard -> protocol resolution -> backlog check
//!     -> next-date calculation -> final duplicate re-check -> insert
//!     -> transition prior records
//! ```
//!
//! Everything from the referent lookups onward runs inside one SQLite
//! transaction; the re-check just before the insert is authoritative, with
//! the store's partial unique index as the last-resort backstop. All date
//! decisions take the current date/time from an explicit [`ApplyContext`],
//! never the ambient clock.

pub mod backlog;
pub mod duplicate;
pub mod next_date;
pub mod resolver;
pub mod status;

use chrono::{DateTime, Months, NaiveDate, Utc};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{
    Animal, ApplicationRecord, ProtocolInfo, ProtocolKind, VaccineCatalogEntry,
};

pub use backlog::{check_backlog, BacklogDecision, BACKLOG_GRACE_DAYS};
pub use duplicate::{
    check_duplicate, MAX_DOSE_NUMBER, MAX_TOTAL_APPLICATIONS, RACE_WINDOW_SECONDS,
};
pub use next_date::{compute_next_due, NextAction};
pub use resolver::resolve;
pub use status::{derive_status, days_until_due, DUE_SOON_WINDOW_DAYS, RESTART_HINT_DAYS};

/// Oldest acceptable application date, in years before today.
pub const MAX_APPLICATION_AGE_YEARS: u32 = 10;

/// Engine errors. Every rejection carries a stable machine-readable code for
/// API payloads alongside the human message.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("required field '{field}' is missing or empty")]
    MissingRequiredField { field: &'static str },

    #[error("'{value}' is not a valid ISO date (expected YYYY-MM-DD)")]
    InvalidDateFormat { value: String },

    #[error("application date {date} is in the future")]
    FutureApplicationDate { date: NaiveDate },

    #[error("application date {date} is more than {MAX_APPLICATION_AGE_YEARS} years in the past")]
    DateTooOld { date: NaiveDate },

    #[error("dose number {dose_number} is outside the allowed range 1..={MAX_DOSE_NUMBER}")]
    InvalidDoseNumber { dose_number: u32 },

    #[error("dose {dose_number} exceeds the protocol's {effective_dose_total} doses")]
    DoseExceedsProtocol {
        dose_number: u32,
        effective_dose_total: u32,
    },

    #[error("an identical application already exists for {application_date}")]
    DuplicateExactSameDay { application_date: NaiveDate },

    #[error("identical application for dose {dose_number} submitted moments ago")]
    RecentDuplicateWindow { dose_number: u32 },

    #[error("the vaccine is still valid until {valid_until}; no reapplication needed")]
    VaccineStillValid { valid_until: NaiveDate },

    #[error("the current protocol is complete and still medically valid")]
    ProtocolStillActive,

    #[error("animal '{id}' not found")]
    AnimalNotFound { id: String },

    #[error("vaccine '{id}' not found or inactive")]
    VaccineNotFound { id: String },

    #[error("veterinarian '{id}' not found")]
    VeterinarianNotFound { id: String },

    #[error("vaccine configuration error: {0}")]
    ConfigurationError(String),

    #[error("a concurrent identical application was committed first; safe to retry")]
    RaceConflict,

    #[error("vaccine is not applicable to species '{species}'")]
    SpeciesNotApplicable { species: String },

    #[error("animal is below the minimum age of {min_age_weeks} weeks for this vaccine")]
    BelowMinimumAge { min_age_weeks: u32 },

    #[error("storage error: {0}")]
    Db(#[from] DbError),
}

impl EngineError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::MissingRequiredField { .. } => "MISSING_REQUIRED_FIELD",
            EngineError::InvalidDateFormat { .. } => "INVALID_DATE_FORMAT",
            EngineError::FutureApplicationDate { .. } => "FUTURE_APPLICATION_DATE",
            EngineError::DateTooOld { .. } => "DATE_TOO_OLD",
            EngineError::InvalidDoseNumber { .. } => "INVALID_DOSE_NUMBER",
            EngineError::DoseExceedsProtocol { .. } => "DOSE_EXCEEDS_PROTOCOL",
            EngineError::DuplicateExactSameDay { .. } => "DUPLICATE_EXACT_SAME_DAY",
            EngineError::RecentDuplicateWindow { .. } => "RECENT_DUPLICATE_DETECTED",
            EngineError::VaccineStillValid { .. } => "VACCINE_STILL_VALID",
            EngineError::ProtocolStillActive => "PROTOCOL_STILL_ACTIVE",
            EngineError::AnimalNotFound { .. } => "ANIMAL_NOT_FOUND",
            EngineError::VaccineNotFound { .. } => "VACCINE_NOT_FOUND",
            EngineError::VeterinarianNotFound { .. } => "VETERINARIAN_NOT_FOUND",
            EngineError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            EngineError::RaceConflict => "RACE_CONFLICT",
            EngineError::SpeciesNotApplicable { .. } => "SPECIES_NOT_APPLICABLE",
            EngineError::BelowMinimumAge { .. } => "BELOW_MINIMUM_AGE",
            EngineError::Db(_) => "STORAGE_ERROR",
        }
    }

    /// Whether an immediate retry is safe (no partial state was committed).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::RaceConflict)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Explicit clock for one apply call.
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext {
    /// Today's date, for all business-day decisions.
    pub today: NaiveDate,
    /// Current instant, for the race-window check only.
    pub now: DateTime<Utc>,
}

impl ApplyContext {
    /// Context from the system clock; tests build the struct directly.
    pub fn from_system_clock() -> Self {
        let now = Utc::now();
        Self { today: now.date_naive(), now }
    }
}

/// One apply request, as it arrives from the outer layer.
#[derive(Debug, Clone, Default)]
pub struct ApplyRequest {
    pub animal_id: String,
    pub vaccine_id: String,
    pub veterinarian_id: String,
    /// ISO date string; the engine owns its validation.
    pub application_date: String,
    /// Explicit dose number; inferred as prior count + 1 when absent.
    pub dose_number: Option<u32>,
    pub batch_lot: Option<String>,
    pub manufacturer: Option<String>,
    pub notes: Option<String>,
}

/// Result of a successful apply.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub record_id: String,
    pub next_due_date: NaiveDate,
    /// Human next-action message.
    pub message: String,
    pub dose_number: u32,
    pub effective_dose_total: u32,
    pub protocol_kind: ProtocolKind,
    /// Next action is the periodic reinforcement.
    pub is_final_dose: bool,
    /// The backlog check voided prior progress.
    pub restarted: bool,
    /// The animal resolved as juvenile on the application date.
    pub juvenile: bool,
    /// Prior records transitioned (superseded or restart-marked) by this apply.
    pub transitioned_record_ids: Vec<String>,
}

/// Record one dose application.
pub fn apply(db: &Database, request: &ApplyRequest, ctx: ApplyContext) -> EngineResult<ApplyOutcome> {
    apply_inner(db, request, ctx, DoseSelection::Explicit(request.dose_number))
}

/// Record the whole remaining protocol as fulfilled in one record, for a
/// client reporting a complete external vaccination history. Runs the same
/// duplicate guard with the full-protocol dose count as the candidate and
/// computes the next date via the reinforcement path. The backlog check is
/// skipped: reported history is accepted as-is rather than restarted.
pub fn apply_protocol_complete(
    db: &Database,
    request: &ApplyRequest,
    ctx: ApplyContext,
) -> EngineResult<ApplyOutcome> {
    apply_inner(db, request, ctx, DoseSelection::FullProtocol)
}

#[derive(Clone, Copy)]
enum DoseSelection {
    /// Use the request's dose number, inferring prior count + 1 when absent.
    Explicit(Option<u32>),
    /// Use the resolved protocol's effective dose total.
    FullProtocol,
}

fn apply_inner(
    db: &Database,
    request: &ApplyRequest,
    ctx: ApplyContext,
    selection: DoseSelection,
) -> EngineResult<ApplyOutcome> {
    let application_date = validate_request(request, ctx.today)?;

    let tx = db.begin()?;
    let outcome = (|| {
        let animal = db
            .get_animal(&request.animal_id)?
            .ok_or_else(|| EngineError::AnimalNotFound { id: request.animal_id.clone() })?;
        let vaccine = db
            .get_vaccine(&request.vaccine_id)?
            .filter(|v| v.active)
            .ok_or_else(|| EngineError::VaccineNotFound { id: request.vaccine_id.clone() })?;
        db.get_veterinarian(&request.veterinarian_id)?
            .ok_or_else(|| EngineError::VeterinarianNotFound {
                id: request.veterinarian_id.clone(),
            })?;

        vaccine
            .validate()
            .map_err(|v| EngineError::ConfigurationError(v.to_string()))?;
        screen_animal(&animal, &vaccine, application_date)?;

        let priors = db.records_for_pair(&animal.id, &vaccine.id)?;
        let prior_count = priors
            .iter()
            .filter(|r| r.status.counts_toward_protocol())
            .count() as u32;
        let juvenile = animal.is_juvenile(application_date);

        let mut protocol = resolve(&vaccine, juvenile, prior_count);
        let mut dose_number = match selection {
            DoseSelection::Explicit(explicit) => explicit.unwrap_or(prior_count + 1),
            DoseSelection::FullProtocol => protocol.effective_dose_total,
        };

        check_duplicate(&priors, &protocol, application_date, dose_number, ctx.today, ctx.now)?;

        let mut restarted = false;
        if matches!(selection, DoseSelection::Explicit(_)) {
            let prior_current = priors.iter().find(|r| r.status.counts_toward_protocol());
            let decision = check_backlog(prior_current, application_date, &protocol, &vaccine);
            if decision.must_restart {
                restarted = true;
                dose_number = 1;
                // A fresh protocol resolves with zero priors, so a juvenile
                // override can apply again.
                protocol = resolve(&vaccine, juvenile, 0);
            }
        }

        let next = compute_next_due(application_date, dose_number, &protocol, &vaccine)?;

        // Authoritative re-check inside the transaction
        if db.exact_application_exists(&animal.id, &vaccine.id, application_date, dose_number)? {
            return Err(EngineError::RaceConflict);
        }

        let mut record = ApplicationRecord::new(
            animal.id.clone(),
            vaccine.id.clone(),
            request.veterinarian_id.clone(),
            application_date,
            dose_number,
            ctx.now,
        );
        record.next_due_date = Some(next.due_date);
        record.batch_lot = request.batch_lot.clone();
        record.manufacturer = request.manufacturer.clone();
        record.notes = request.notes.clone();

        db.insert_record(&record).map_err(|e| {
            if e.is_unique_violation() {
                EngineError::RaceConflict
            } else {
                EngineError::Db(e)
            }
        })?;

        let transitioned_record_ids = if restarted {
            db.mark_restart_for_pair(&animal.id, &vaccine.id, &record.id)?
        } else {
            db.supersede_active_for_pair(&animal.id, &vaccine.id, &record.id)?
        };

        tracing::info!(
            record_id = %record.id,
            animal_id = %animal.id,
            vaccine_id = %vaccine.id,
            dose_number,
            next_due = %next.due_date,
            protocol = protocol.kind.as_str(),
            restarted,
            "vaccination recorded"
        );

        Ok(ApplyOutcome {
            record_id: record.id,
            next_due_date: next.due_date,
            message: next_action_message(&next, dose_number, &protocol, &vaccine),
            dose_number,
            effective_dose_total: protocol.effective_dose_total,
            protocol_kind: protocol.kind,
            is_final_dose: next.is_final_dose,
            restarted,
            juvenile,
            transitioned_record_ids,
        })
    })();

    match outcome {
        Ok(outcome) => {
            tx.commit().map_err(DbError::from)?;
            Ok(outcome)
        }
        Err(err) => {
            // Dropping the transaction rolls back; nothing partial survives.
            drop(tx);
            Err(err)
        }
    }
}

fn validate_request(request: &ApplyRequest, today: NaiveDate) -> EngineResult<NaiveDate> {
    let required = [
        ("animal_id", &request.animal_id),
        ("vaccine_id", &request.vaccine_id),
        ("veterinarian_id", &request.veterinarian_id),
        ("application_date", &request.application_date),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(EngineError::MissingRequiredField { field });
        }
    }

    let date = NaiveDate::parse_from_str(request.application_date.trim(), "%Y-%m-%d").map_err(
        |_| EngineError::InvalidDateFormat { value: request.application_date.clone() },
    )?;

    if date > today {
        return Err(EngineError::FutureApplicationDate { date });
    }
    let oldest = today
        .checked_sub_months(Months::new(12 * MAX_APPLICATION_AGE_YEARS))
        .unwrap_or(NaiveDate::MIN);
    if date < oldest {
        return Err(EngineError::DateTooOld { date });
    }
    Ok(date)
}

fn screen_animal(
    animal: &Animal,
    vaccine: &VaccineCatalogEntry,
    application_date: NaiveDate,
) -> EngineResult<()> {
    if !vaccine.is_species_compatible(&animal.species) {
        return Err(EngineError::SpeciesNotApplicable { species: animal.canonical_species() });
    }
    if vaccine.min_age_weeks > 0 {
        if let Some(age_weeks) = animal.age_weeks(application_date) {
            if age_weeks < i64::from(vaccine.min_age_weeks) {
                return Err(EngineError::BelowMinimumAge {
                    min_age_weeks: vaccine.min_age_weeks,
                });
            }
        }
        // Unknown date of birth: no age screen possible.
    }
    Ok(())
}

fn next_action_message(
    next: &NextAction,
    dose_number: u32,
    protocol: &ProtocolInfo,
    vaccine: &VaccineCatalogEntry,
) -> String {
    if next.is_final_dose {
        format!(
            "next reinforcement due in {} months ({})",
            vaccine.reinforcement_months, next.due_date
        )
    } else {
        let weeks = match protocol.interval_after_dose(dose_number) {
            Some(weeks) if weeks > 0 => weeks,
            _ => vaccine.dose_interval_weeks,
        };
        format!("next dose due in {} weeks ({})", weeks, next.due_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ctx(today: &str) -> ApplyContext {
        ApplyContext { today: date(today), now: Utc::now() }
    }

    fn request(date: &str) -> ApplyRequest {
        ApplyRequest {
            animal_id: "animal-1".into(),
            vaccine_id: "vaccine-1".into(),
            veterinarian_id: "vet-1".into(),
            application_date: date.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_requires_fields() {
        let mut req = request("2025-06-01");
        req.animal_id = "  ".into();
        let err = validate_request(&req, date("2025-06-01")).unwrap_err();
        assert_eq!(err.code(), "MISSING_REQUIRED_FIELD");
    }

    #[test]
    fn test_validate_date_format() {
        let err = validate_request(&request("01/06/2025"), date("2025-06-01")).unwrap_err();
        assert_eq!(err.code(), "INVALID_DATE_FORMAT");
    }

    #[test]
    fn test_validate_date_bounds() {
        let err = validate_request(&request("2025-06-02"), date("2025-06-01")).unwrap_err();
        assert_eq!(err.code(), "FUTURE_APPLICATION_DATE");

        let err = validate_request(&request("2015-05-31"), date("2025-06-01")).unwrap_err();
        assert_eq!(err.code(), "DATE_TOO_OLD");

        // Exactly ten years back is still accepted
        assert!(validate_request(&request("2015-06-01"), date("2025-06-01")).is_ok());
    }

    #[test]
    fn test_missing_referents() {
        let db = Database::open_in_memory().unwrap();
        let err = apply(&db, &request("2025-06-01"), ctx("2025-06-01")).unwrap_err();
        assert_eq!(err.code(), "ANIMAL_NOT_FOUND");
    }

    #[test]
    fn test_error_codes_are_screaming_snake() {
        let err = EngineError::RaceConflict;
        assert_eq!(err.code(), "RACE_CONFLICT");
        assert!(err.is_retryable());
        assert!(!EngineError::ProtocolStillActive.is_retryable());
    }
}
