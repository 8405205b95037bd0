//! Veterinarian models.

use serde::{Deserialize, Serialize};

/// A veterinarian who applies vaccines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Veterinarian {
    /// Unique id
    pub id: String,
    /// Full name
    pub name: String,
    /// Professional license number
    pub license_number: Option<String>,
    /// Inactive veterinarians are hidden from listings
    pub active: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Veterinarian {
    /// Create a new veterinarian.
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            license_number: None,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
