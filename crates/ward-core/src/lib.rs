//! Ward Core Library
//!
//! Hospital patient-lifecycle and bed-management core.
//!
//! # Architecture
//!
//! ```text
//! Intake ──▶ Guard placement ──▶ transfers between systems ──▶ discharge / death
//!    │              │                      │                         │
//!    │         bed claimed           bed swapped               bed freed,
//!    │         in Guard              (old freed,               exit/death date
//!    │                               new claimed)              stamped
//!    │
//!    └─▶ Entry (one per stay)
//!            └─▶ Hospitalization appended per movement (append-only)
//!                    └─▶ Evolutions (clinical notes, append-only)
//! ```
//!
//! # Core principle
//!
//! **A transition is one transaction.** Bed release, bed allocation, audit
//! append and the patient-row update either all commit or none do; a patient
//! never ends up bed-less in a system that claims otherwise.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer (facility registry, patients, clinical
//!   records, staff assignment, read-model projections)
//! - [`models`]: Domain types (Patient, CareSystem, Bed, Entry, ...)
//! - [`lifecycle`]: The transition state machine and its transfer-policy
//!   extension point

pub mod db;
pub mod lifecycle;
pub mod models;

// Re-export commonly used types
pub use db::Database;
pub use lifecycle::{
    AllowAllTransfers, LifecycleConfig, LifecycleError, LifecycleManager, TransferPolicy,
};
pub use models::{
    Bed, CareSystem, Entry, EntryForm, Evolution, Hospitalization, Medic, MedicalEnsurance,
    Patient, PatientForm, PatientOverview, PatientState, Room,
};

use std::sync::{Arc, Mutex};

use db::records::DEFAULT_EVOLUTION_LIMIT;

/// Top-level error for the embedding API.
#[derive(Debug, thiserror::Error)]
pub enum WardError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Lifecycle(#[from] lifecycle::LifecycleError),
}

impl From<db::DbError> for WardError {
    fn from(e: db::DbError) -> Self {
        WardError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for WardError {
    fn from(e: serde_json::Error) -> Self {
        WardError::Serialization(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for WardError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        WardError::Database(format!("lock poisoned: {}", e))
    }
}

/// Thread-safe embedding API over the database and the lifecycle manager.
pub struct WardCore {
    db: Arc<Mutex<Database>>,
    lifecycle: LifecycleManager,
}

impl WardCore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<std::path::Path>>(
        path: P,
        config: LifecycleConfig,
    ) -> Result<Self, WardError> {
        let db = Database::open(path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            lifecycle: LifecycleManager::new(config),
        })
    }

    /// Create an in-memory instance (for testing).
    pub fn open_in_memory(config: LifecycleConfig) -> Result<Self, WardError> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            lifecycle: LifecycleManager::new(config),
        })
    }

    /// Rebuild the facade with another lifecycle configuration, keeping the
    /// database handle. Useful once the intake system's ID is known.
    pub fn with_config(self, config: LifecycleConfig) -> Self {
        Self {
            db: self.db,
            lifecycle: LifecycleManager::new(config),
        }
    }

    /// Replace the transfer policy.
    pub fn set_transfer_policy(&mut self, policy: Box<dyn TransferPolicy>) {
        let config = self.lifecycle.config().clone();
        self.lifecycle = LifecycleManager::with_policy(config, policy);
    }

    // =========================================================================
    // Facility registration
    // =========================================================================

    /// Register a care system by name.
    pub fn register_system(&self, name: &str) -> Result<CareSystem, WardError> {
        let db = self.db.lock()?;
        let system = CareSystem::new(name.to_string());
        db.insert_system(&system)?;
        Ok(system)
    }

    /// Register a room within a system.
    pub fn register_room(&self, system_id: &str, number: i64) -> Result<Room, WardError> {
        let db = self.db.lock()?;
        let room = Room::new(system_id.to_string(), number);
        db.insert_room(&room)?;
        Ok(room)
    }

    /// Register a free bed within a room.
    pub fn register_bed(&self, room_id: &str, number: i64) -> Result<Bed, WardError> {
        let db = self.db.lock()?;
        let bed = Bed::new(room_id.to_string(), number);
        db.insert_bed(&bed)?;
        Ok(bed)
    }

    /// List all care systems.
    pub fn list_systems(&self) -> Result<Vec<CareSystem>, WardError> {
        let db = self.db.lock()?;
        Ok(db.list_systems()?)
    }

    /// Register a medical insurance entry.
    pub fn register_medical_ensurance(&self, name: &str) -> Result<MedicalEnsurance, WardError> {
        let db = self.db.lock()?;
        let ensurance = MedicalEnsurance::new(name.to_string());
        db.insert_medical_ensurance(&ensurance)?;
        Ok(ensurance)
    }

    /// List all medical insurance entries.
    pub fn list_medical_ensurances(&self) -> Result<Vec<MedicalEnsurance>, WardError> {
        let db = self.db.lock()?;
        Ok(db.list_medical_ensurances()?)
    }

    // =========================================================================
    // Lifecycle operations
    // =========================================================================

    /// Admit a new patient into the default intake system.
    pub fn admit_patient(
        &self,
        patient: PatientForm,
        entry: EntryForm,
    ) -> Result<Patient, WardError> {
        let mut db = self.db.lock()?;
        Ok(self.lifecycle.intake(&mut db, patient, entry)?)
    }

    /// Readmit a discharged patient, opening a fresh entry.
    pub fn readmit_patient(
        &self,
        patient_id: &str,
        entry: EntryForm,
    ) -> Result<Patient, WardError> {
        let mut db = self.db.lock()?;
        Ok(self.lifecycle.readmit(&mut db, patient_id, entry)?)
    }

    /// Transfer a patient to another care system.
    pub fn transfer_patient(
        &self,
        patient_id: &str,
        system_id: &str,
        acting_user_id: &str,
    ) -> Result<Patient, WardError> {
        let mut db = self.db.lock()?;
        Ok(self
            .lifecycle
            .change_system(&mut db, patient_id, system_id, acting_user_id)?)
    }

    /// Discharge a patient, freeing their bed.
    pub fn discharge_patient(&self, patient_id: &str) -> Result<Patient, WardError> {
        let mut db = self.db.lock()?;
        Ok(self.lifecycle.discharge(&mut db, patient_id)?)
    }

    /// Record a patient's death, freeing their bed.
    pub fn mark_patient_deceased(&self, patient_id: &str) -> Result<Patient, WardError> {
        let mut db = self.db.lock()?;
        Ok(self.lifecycle.mark_deceased(&mut db, patient_id)?)
    }

    // =========================================================================
    // Patients & read model
    // =========================================================================

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, WardError> {
        let db = self.db.lock()?;
        Ok(db.get_patient(patient_id)?)
    }

    /// Update a patient's demographic data.
    pub fn update_patient_data(
        &self,
        patient_id: &str,
        form: PatientForm,
    ) -> Result<Patient, WardError> {
        let db = self.db.lock()?;
        let mut patient = db
            .get_patient(patient_id)?
            .ok_or_else(|| WardError::NotFound(format!("patient {}", patient_id)))?;
        patient.apply(form);
        db.update_patient(&patient)?;
        Ok(patient)
    }

    /// Flat projection of every patient.
    pub fn patients_overview(&self) -> Result<Vec<PatientOverview>, WardError> {
        let db = self.db.lock()?;
        Ok(db.list_overviews()?)
    }

    /// Flat projection filtered by lifecycle state.
    pub fn patients_overview_by_state(
        &self,
        state: PatientState,
    ) -> Result<Vec<PatientOverview>, WardError> {
        let db = self.db.lock()?;
        Ok(db.list_overviews_by_state(state)?)
    }

    /// Flat projection filtered by current system.
    pub fn patients_overview_by_system(
        &self,
        system_id: &str,
    ) -> Result<Vec<PatientOverview>, WardError> {
        let db = self.db.lock()?;
        Ok(db.list_overviews_by_system(system_id)?)
    }

    /// Flat projection filtered by system and state.
    pub fn patients_overview_by_system_and_state(
        &self,
        system_id: &str,
        state: PatientState,
    ) -> Result<Vec<PatientOverview>, WardError> {
        let db = self.db.lock()?;
        Ok(db.list_overviews_by_system_and_state(system_id, state)?)
    }

    /// Single-patient projection.
    pub fn patient_overview(&self, patient_id: &str) -> Result<Option<PatientOverview>, WardError> {
        let db = self.db.lock()?;
        Ok(db.patient_overview(patient_id)?)
    }

    /// Export the patient read model as JSON.
    pub fn export_patients_json(&self) -> Result<String, WardError> {
        let db = self.db.lock()?;
        let overviews = db.list_overviews()?;
        Ok(serde_json::to_string(&overviews)?)
    }

    // =========================================================================
    // Clinical records
    // =========================================================================

    /// The patient's current (most recent) entry.
    pub fn current_entry(&self, patient_id: &str) -> Result<Option<Entry>, WardError> {
        let db = self.db.lock()?;
        Ok(db.current_entry(patient_id)?)
    }

    /// The patient's latest hospitalization record.
    pub fn current_hospitalization(
        &self,
        patient_id: &str,
    ) -> Result<Option<Hospitalization>, WardError> {
        let db = self.db.lock()?;
        Ok(db.current_hospitalization(patient_id)?)
    }

    /// Append an evolution note to the patient's current hospitalization.
    pub fn add_evolution(&self, patient_id: &str, note: &str) -> Result<Evolution, WardError> {
        let db = self.db.lock()?;
        let hosp = db.current_hospitalization(patient_id)?.ok_or_else(|| {
            WardError::NotFound(format!("patient {} has no hospitalization", patient_id))
        })?;
        let evolution = Evolution::new(hosp.hospitalization_id, note.to_string());
        db.insert_evolution(&evolution)?;
        Ok(evolution)
    }

    /// The most recent evolution notes for a patient, newest first.
    pub fn latest_evolutions(&self, patient_id: &str) -> Result<Vec<Evolution>, WardError> {
        let db = self.db.lock()?;
        Ok(db.latest_evolutions(patient_id, DEFAULT_EVOLUTION_LIMIT)?)
    }

    // =========================================================================
    // Staff assignment
    // =========================================================================

    /// Register a medic.
    pub fn register_medic(
        &self,
        name: &str,
        lastname: &str,
        email: &str,
    ) -> Result<Medic, WardError> {
        let db = self.db.lock()?;
        let medic = Medic::new(name.to_string(), lastname.to_string(), email.to_string());
        db.insert_medic(&medic)?;
        Ok(medic)
    }

    /// Assign a medic to a patient. Returns false if already assigned.
    pub fn assign_medic(&self, patient_id: &str, medic_id: &str) -> Result<bool, WardError> {
        let db = self.db.lock()?;
        Ok(db.assign_medic(patient_id, medic_id)?)
    }

    /// Remove a medic assignment.
    pub fn unassign_medic(&self, patient_id: &str, medic_id: &str) -> Result<bool, WardError> {
        let db = self.db.lock()?;
        Ok(db.unassign_medic(patient_id, medic_id)?)
    }

    /// Check whether a medic is assigned to a patient.
    pub fn has_medic(&self, patient_id: &str, medic_id: &str) -> Result<bool, WardError> {
        let db = self.db.lock()?;
        Ok(db.has_medic(patient_id, medic_id)?)
    }

    /// Medics assigned to a patient.
    pub fn medics_for_patient(&self, patient_id: &str) -> Result<Vec<Medic>, WardError> {
        let db = self.db.lock()?;
        Ok(db.medics_for_patient(patient_id)?)
    }

    /// Medics available for assignment to a patient.
    pub fn available_medics(&self, patient_id: &str) -> Result<Vec<Medic>, WardError> {
        let db = self.db.lock()?;
        Ok(db.available_medics(patient_id)?)
    }
}
