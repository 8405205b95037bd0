//! SQLite schema definition.

/// Complete database schema for the clinic back office core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Animals
-- ============================================================================

CREATE TABLE IF NOT EXISTS animals (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    species TEXT NOT NULL,
    breed TEXT,
    weight_kg REAL,
    date_of_birth TEXT,
    owner_name TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_animals_name ON animals(name);

-- ============================================================================
-- Veterinarians
-- ============================================================================

CREATE TABLE IF NOT EXISTS veterinarians (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    license_number TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Vaccine Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS vaccine_catalog (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    species TEXT NOT NULL DEFAULT '[]',          -- JSON array of strings
    obligatory INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    prevents TEXT,
    dose_total INTEGER NOT NULL DEFAULT 1,
    dose_interval_weeks INTEGER NOT NULL DEFAULT 0,
    reinforcement_months INTEGER NOT NULL DEFAULT 12,
    min_age_weeks INTEGER NOT NULL DEFAULT 0,
    max_backlog_days INTEGER NOT NULL DEFAULT 30,
    complex_protocol TEXT NOT NULL DEFAULT '[]', -- JSON array of dose steps
    juvenile_protocol TEXT,                      -- JSON object, nullable
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_catalog_name ON vaccine_catalog(name);
CREATE INDEX IF NOT EXISTS idx_catalog_active ON vaccine_catalog(active);

-- ============================================================================
-- Vaccination Records (append-mostly ledger)
-- ============================================================================

CREATE TABLE IF NOT EXISTS vaccination_records (
    id TEXT PRIMARY KEY,
    animal_id TEXT NOT NULL REFERENCES animals(id),
    vaccine_id TEXT NOT NULL REFERENCES vaccine_catalog(id),
    veterinarian_id TEXT NOT NULL REFERENCES veterinarians(id),
    application_date TEXT NOT NULL,              -- ISO date
    next_due_date TEXT,                          -- ISO date, set by apply
    dose_number INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'applied'
        CHECK (status IN ('applied', 'valid', 'due-soon', 'overdue',
                          'restart-required', 'superseded')),
    batch_lot TEXT,
    manufacturer TEXT,
    notes TEXT,
    created_at TEXT NOT NULL                     -- RFC 3339 instant
);

-- Store-level duplicate backstop: one application per
-- (animal, vaccine, date, dose). Restart-voided rows are excluded so a fresh
-- protocol can legitimately reuse a dose number.
CREATE UNIQUE INDEX IF NOT EXISTS idx_records_unique_application
ON vaccination_records (animal_id, vaccine_id, application_date, dose_number)
WHERE status != 'restart-required';

-- Pair lookups drive the duplicate guard and backlog detection
CREATE INDEX IF NOT EXISTS idx_records_pair
ON vaccination_records (animal_id, vaccine_id, status);

-- The alert feed scans by due date
CREATE INDEX IF NOT EXISTS idx_records_next_due
ON vaccination_records (next_due_date);
"#;
