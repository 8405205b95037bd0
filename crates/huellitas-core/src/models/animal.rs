//! Animal (patient) models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Age in days under which an animal counts as juvenile.
pub const JUVENILE_MAX_AGE_DAYS: i64 = 365;

/// An animal registered at the clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Animal {
    /// Unique id
    pub id: String,
    /// Animal name
    pub name: String,
    /// Species (e.g., "canine", "feline")
    pub species: String,
    /// Breed
    pub breed: Option<String>,
    /// Weight in kg
    pub weight_kg: Option<f64>,
    /// Date of birth, when known
    pub date_of_birth: Option<NaiveDate>,
    /// Owner/client name
    pub owner_name: Option<String>,
    /// Additional notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Animal {
    /// Create a new animal with required fields.
    pub fn new(name: String, species: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            species,
            breed: None,
            weight_kg: None,
            date_of_birth: None,
            owner_name: None,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Get the canonical species name (lowercase).
    pub fn canonical_species(&self) -> String {
        self.species.to_lowercase()
    }

    /// Age in days on the given date, when the date of birth is known.
    ///
    /// Returns `None` for animals born after `on` (bad data) as well as for
    /// unknown dates of birth.
    pub fn age_days(&self, on: NaiveDate) -> Option<i64> {
        let dob = self.date_of_birth?;
        let days = (on - dob).num_days();
        if days < 0 {
            return None;
        }
        Some(days)
    }

    /// Age in whole weeks on the given date.
    pub fn age_weeks(&self, on: NaiveDate) -> Option<i64> {
        self.age_days(on).map(|d| d / 7)
    }

    /// Whether the animal is juvenile (at most one year old) on the given
    /// date. Unknown date of birth means not juvenile.
    pub fn is_juvenile(&self, on: NaiveDate) -> bool {
        matches!(self.age_days(on), Some(days) if days <= JUVENILE_MAX_AGE_DAYS)
    }
}
