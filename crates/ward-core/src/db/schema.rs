//! SQLite schema definition.

/// Complete database schema for ward-core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Care systems, rooms, beds
-- ============================================================================

CREATE TABLE IF NOT EXISTS systems (
    system_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS rooms (
    room_id TEXT PRIMARY KEY,
    system_id TEXT NOT NULL REFERENCES systems(system_id),
    number INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rooms_system ON rooms(system_id);

-- ============================================================================
-- Insurance lookup
-- ============================================================================

CREATE TABLE IF NOT EXISTS medical_ensurances (
    medical_ensurance_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    lastname TEXT NOT NULL,
    dni TEXT NOT NULL UNIQUE,
    address TEXT,
    phone TEXT,
    birth_date TEXT,
    personal_background TEXT,
    email TEXT,
    contact_name TEXT,
    contact_lastname TEXT,
    contact_phone TEXT,
    medical_ensurance_id TEXT REFERENCES medical_ensurances(medical_ensurance_id),
    state TEXT NOT NULL DEFAULT 'hospitalized'
        CHECK (state IN ('hospitalized', 'discharged', 'deceased')),
    system_id TEXT NOT NULL REFERENCES systems(system_id),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_system ON patients(system_id);
CREATE INDEX IF NOT EXISTS idx_patients_state ON patients(state);

-- ============================================================================
-- Beds
-- ============================================================================

CREATE TABLE IF NOT EXISTS beds (
    bed_id TEXT PRIMARY KEY,
    room_id TEXT NOT NULL REFERENCES rooms(room_id),
    number INTEGER NOT NULL,
    is_occupied INTEGER NOT NULL DEFAULT 0,
    patient_id TEXT REFERENCES patients(patient_id),
    -- occupant set iff occupied
    CHECK (
        (is_occupied = 0 AND patient_id IS NULL) OR
        (is_occupied = 1 AND patient_id IS NOT NULL)
    )
);

-- At most one bed per patient at any time
CREATE UNIQUE INDEX IF NOT EXISTS idx_beds_patient
    ON beds(patient_id) WHERE patient_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_beds_room ON beds(room_id);

-- ============================================================================
-- Clinical record chain (entries -> hospitalizations -> evolutions)
-- ============================================================================

CREATE TABLE IF NOT EXISTS entries (
    entry_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    date TEXT NOT NULL DEFAULT (datetime('now')),
    actual_disease TEXT,
    date_of_symptoms TEXT,
    date_of_diagnosis TEXT,
    date_of_admission TEXT,
    date_of_death TEXT,
    date_of_exit TEXT
);

CREATE INDEX IF NOT EXISTS idx_entries_patient ON entries(patient_id, date);

CREATE TABLE IF NOT EXISTS hospitalizations (
    hospitalization_id TEXT PRIMARY KEY,
    entry_id TEXT NOT NULL REFERENCES entries(entry_id),
    system_id TEXT NOT NULL REFERENCES systems(system_id),
    date TEXT NOT NULL DEFAULT (datetime('now')),
    ordered_by TEXT
);

CREATE INDEX IF NOT EXISTS idx_hospitalizations_entry ON hospitalizations(entry_id, date);

-- Movement audit trail: rewriting history is forbidden
CREATE TRIGGER IF NOT EXISTS hospitalizations_no_update BEFORE UPDATE ON hospitalizations
BEGIN
    SELECT RAISE(ABORT, 'hospitalizations are append-only');
END;

CREATE TRIGGER IF NOT EXISTS hospitalizations_no_delete BEFORE DELETE ON hospitalizations
BEGIN
    SELECT RAISE(ABORT, 'hospitalizations are append-only');
END;

CREATE TABLE IF NOT EXISTS evolutions (
    evolution_id TEXT PRIMARY KEY,
    hospitalization_id TEXT NOT NULL REFERENCES hospitalizations(hospitalization_id),
    date TEXT NOT NULL DEFAULT (datetime('now')),
    note TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_evolutions_hospitalization ON evolutions(hospitalization_id, date);

CREATE TRIGGER IF NOT EXISTS evolutions_no_update BEFORE UPDATE ON evolutions
BEGIN
    SELECT RAISE(ABORT, 'evolutions are append-only');
END;

CREATE TRIGGER IF NOT EXISTS evolutions_no_delete BEFORE DELETE ON evolutions
BEGIN
    SELECT RAISE(ABORT, 'evolutions are append-only');
END;

-- ============================================================================
-- Staff assignment
-- ============================================================================

CREATE TABLE IF NOT EXISTS medics (
    medic_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    lastname TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS patient_medic (
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    medic_id TEXT NOT NULL REFERENCES medics(medic_id),
    UNIQUE (patient_id, medic_id)
);
"#;
