//! Vaccine catalog models.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One step of a custom multi-stage protocol.
///
/// The list as a whole overrides `dose_total`/`dose_interval_weeks`; a step
/// with a missing or zero `weeks_to_next` falls back to the vaccine's base
/// interval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplexDoseStep {
    /// 1-based dose index this step describes
    pub dose_index: u32,
    /// Weeks until the following dose
    pub weeks_to_next: Option<u32>,
}

/// Override protocol for juvenile animals.
///
/// Applies only to an animal at most one year old with no prior applications
/// of the vaccine. Zero entries fall back to the standard values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JuvenileProtocol {
    pub dose_total: u32,
    pub intervals_weeks: Vec<u32>,
}

/// A configured vaccine and its scheduling rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaccineCatalogEntry {
    /// Unique catalog id
    pub id: String,
    /// Vaccine name (e.g., "Quintuple (DHPP)")
    pub name: String,
    /// Applicable species (empty = all species)
    pub species: Vec<String>,
    /// Whether the vaccine is legally required
    pub obligatory: bool,
    /// Inactive entries are not applicable
    pub active: bool,
    /// Diseases prevented (display only)
    pub prevents: Option<String>,
    /// Doses in the standard initial protocol
    pub dose_total: u32,
    /// Weeks between initial-protocol doses
    pub dose_interval_weeks: u32,
    /// Months until the periodic reinforcement once the protocol is complete
    pub reinforcement_months: u32,
    /// Minimum age for the first dose
    pub min_age_weeks: u32,
    /// Maximum delay before a protocol is considered broken
    pub max_backlog_days: u32,
    /// Custom multi-stage protocol; takes precedence when non-empty
    pub complex_protocol: Vec<ComplexDoseStep>,
    /// Juvenile override protocol
    pub juvenile_protocol: Option<JuvenileProtocol>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

/// A fatal configuration fault on a catalog entry.
///
/// These are never silently corrected: a vaccine that fails validation cannot
/// produce a computed date and the apply operation rejects it outright.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigViolation {
    #[error("dose_total must be at least 1")]
    ZeroDoseTotal,
    #[error("dose_interval_weeks must be positive when dose_total is greater than 1")]
    MissingDoseInterval,
    #[error("reinforcement_months must be positive")]
    ZeroReinforcementMonths,
    #[error("max_backlog_days must be positive")]
    ZeroMaxBacklogDays,
}

impl VaccineCatalogEntry {
    /// Create a new catalog entry with a sane single-dose configuration.
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            species: Vec::new(),
            obligatory: false,
            active: true,
            prevents: None,
            dose_total: 1,
            dose_interval_weeks: 0,
            reinforcement_months: 12,
            min_age_weeks: 0,
            max_backlog_days: 30,
            complex_protocol: Vec::new(),
            juvenile_protocol: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Check if this vaccine is applicable to a given species.
    pub fn is_species_compatible(&self, species: &str) -> bool {
        if self.species.is_empty() {
            return true; // No restriction means all species
        }
        let species_lower = species.to_lowercase();
        self.species
            .iter()
            .any(|s| s.to_lowercase() == species_lower)
    }

    /// Whether a custom multi-stage protocol is configured.
    pub fn has_complex_protocol(&self) -> bool {
        !self.complex_protocol.is_empty()
    }

    /// Dose total before any juvenile resolution: the complex protocol's
    /// length when present, the standard total otherwise.
    pub fn base_dose_total(&self) -> u32 {
        if self.has_complex_protocol() {
            self.complex_protocol.len() as u32
        } else {
            self.dose_total
        }
    }

    /// Validate the scheduling invariants.
    pub fn validate(&self) -> Result<(), ConfigViolation> {
        if self.dose_total < 1 {
            return Err(ConfigViolation::ZeroDoseTotal);
        }
        if self.dose_total > 1 && self.dose_interval_weeks == 0 {
            return Err(ConfigViolation::MissingDoseInterval);
        }
        if self.reinforcement_months == 0 {
            return Err(ConfigViolation::ZeroReinforcementMonths);
        }
        if self.max_backlog_days == 0 {
            return Err(ConfigViolation::ZeroMaxBacklogDays);
        }
        Ok(())
    }
}
