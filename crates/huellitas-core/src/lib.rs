//! Huellitas Core Library
//!
//! Veterinary-clinic back office core: the vaccination protocol and
//! scheduling engine, with its SQLite record store.
//!
//! # Architecture
//!
//! ```text
//! apply request
//!      │
//!      ▼
//! input validation ──▶ referent lookup ──▶ species / age screens
//!                                                │
//!                                                ▼
//!                                         Duplicate Guard
//!                                                │
//!                                                ▼
//!                                       Protocol Resolver
//!                                  (complex > juvenile > standard)
//!                                                │
//!                                                ▼
//!                                   Backlog/Restart Detector
//!                                                │
//!                                                ▼
//!                                     Next-Date Calculator
//!                                                │
//!                              ┌─────────────────▼─────────────────┐
//!                              │  final duplicate re-check, insert │
//!                              │  + transition prior records       │
//!                              │       (one SQLite transaction)    │
//!                              └─────────────────┬─────────────────┘
//!                                                │
//!                                                ▼
//!                                      Status Deriver / alerts
//!                                      (pure, read-time only)
//! ```
//!
//! # Core Principle
//!
//! **Dates are never ambient.** Every decision takes today's date and the
//! current instant as explicit parameters, so the whole pipeline is
//! deterministic under test.
//!
//! # Modules
//!
//! - [`db`]: SQLite record store (animals, veterinarians, catalog, records)
//! - [`models`]: Domain types (VaccineCatalogEntry, ApplicationRecord, ...)
//! - [`engine`]: The protocol engine and its apply pipeline
//! - [`alerts`]: Read-only due-soon/overdue query surface

pub mod alerts;
pub mod db;
pub mod engine;
pub mod models;

// Re-export commonly used types
pub use alerts::AlertEntry;
pub use db::{Database, DbError, DbResult};
pub use engine::{
    apply, apply_protocol_complete, ApplyContext, ApplyOutcome, ApplyRequest, EngineError,
    EngineResult,
};
pub use models::{
    Animal, ApplicationRecord, ComplexDoseStep, JuvenileProtocol, ProtocolInfo, ProtocolKind,
    RecordStatus, VaccineCatalogEntry, Veterinarian,
};

use std::sync::{Arc, Mutex};

/// Service-level errors: engine rejections plus lock failures.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        ServiceError::Engine(EngineError::Db(e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for ServiceError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ServiceError::LockPoisoned(e.to_string())
    }
}

/// Open or create a clinic database at the given path.
pub fn open_clinic(path: &str) -> Result<ClinicService, ServiceError> {
    let db = Database::open(path)?;
    Ok(ClinicService { db: Arc::new(Mutex::new(db)) })
}

/// Create an in-memory clinic (for testing).
pub fn open_clinic_in_memory() -> Result<ClinicService, ServiceError> {
    let db = Database::open_in_memory()?;
    Ok(ClinicService { db: Arc::new(Mutex::new(db)) })
}

/// Thread-safe handle around one clinic database.
///
/// The mutex serializes apply operations per connection, which is what makes
/// the pipeline's check-then-insert sequence race-free across threads.
#[derive(Clone)]
pub struct ClinicService {
    db: Arc<Mutex<Database>>,
}

impl ClinicService {
    /// Register a new animal.
    pub fn register_animal(&self, animal: &Animal) -> Result<(), ServiceError> {
        let db = self.db.lock()?;
        db.insert_animal(animal)?;
        Ok(())
    }

    /// Register a new veterinarian.
    pub fn register_veterinarian(&self, vet: &Veterinarian) -> Result<(), ServiceError> {
        let db = self.db.lock()?;
        db.insert_veterinarian(vet)?;
        Ok(())
    }

    /// Add or update a vaccine catalog entry. Invalid configurations are
    /// rejected at the door rather than at apply time.
    pub fn upsert_vaccine(&self, vaccine: &VaccineCatalogEntry) -> Result<(), ServiceError> {
        vaccine
            .validate()
            .map_err(|v| EngineError::ConfigurationError(v.to_string()))?;
        let db = self.db.lock()?;
        db.upsert_vaccine(vaccine)?;
        Ok(())
    }

    /// Record one dose application.
    pub fn apply_vaccination(
        &self,
        request: &ApplyRequest,
        ctx: ApplyContext,
    ) -> Result<ApplyOutcome, ServiceError> {
        let db = self.db.lock()?;
        Ok(engine::apply(&db, request, ctx)?)
    }

    /// Record a complete external vaccination history in one record.
    pub fn record_protocol_complete(
        &self,
        request: &ApplyRequest,
        ctx: ApplyContext,
    ) -> Result<ApplyOutcome, ServiceError> {
        let db = self.db.lock()?;
        Ok(engine::apply_protocol_complete(&db, request, ctx)?)
    }

    /// Vaccinations needing attention, system-wide.
    pub fn due_alerts(&self, today: chrono::NaiveDate) -> Result<Vec<AlertEntry>, ServiceError> {
        let db = self.db.lock()?;
        Ok(alerts::due_alerts(&db, today)?)
    }

    /// Vaccinations needing attention for one animal.
    pub fn due_alerts_for_animal(
        &self,
        animal_id: &str,
        today: chrono::NaiveDate,
    ) -> Result<Vec<AlertEntry>, ServiceError> {
        let db = self.db.lock()?;
        Ok(alerts::due_alerts_for_animal(&db, animal_id, today)?)
    }

    /// Full vaccination history for one animal, newest first.
    pub fn vaccination_history(
        &self,
        animal_id: &str,
    ) -> Result<Vec<ApplicationRecord>, ServiceError> {
        let db = self.db.lock()?;
        Ok(db.records_for_animal(animal_id)?)
    }
}
