//! Patient lifecycle orchestration.
//!
//! The one place that enacts a system transition as a single logical
//! operation: append the audit hospitalization, release the held bed, claim a
//! bed in the target system and update the patient row. Every public
//! operation runs inside one SQLite transaction; an error on any step returns
//! early and the dropped transaction rolls back, leaving the patient's prior
//! state intact.

use log::{debug, info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{facility, patients, records, Database, DbError};
use crate::models::{
    CareSystem, Entry, EntryForm, Hospitalization, Patient, PatientForm, PatientState,
};

/// Errors surfaced by lifecycle transitions.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// No free bed in the target system. Retrying does not create capacity.
    #[error("no free bed available in system {system_id}")]
    BedUnavailable { system_id: String },

    #[error("patient not found: {0}")]
    PatientNotFound(String),

    #[error("system not found: {0}")]
    SystemNotFound(String),

    /// Transition attempted with no open clinical record.
    #[error("patient {0} has no entry")]
    NoCurrentEntry(String),

    #[error("invalid patient data: {0}")]
    Validation(String),

    #[error("transfer denied: {0}")]
    PolicyDenied(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Admission-control extension point consulted before a system transfer.
///
/// The transfer is aborted (nothing committed) when `authorize` returns an
/// error, which is surfaced as [`LifecycleError::PolicyDenied`].
pub trait TransferPolicy: Send + Sync {
    fn authorize(
        &self,
        patient: &Patient,
        target: &CareSystem,
        acting_user_id: &str,
    ) -> Result<(), String>;
}

/// Default policy: every transfer is allowed.
pub struct AllowAllTransfers;

impl TransferPolicy for AllowAllTransfers {
    fn authorize(&self, _: &Patient, _: &CareSystem, _: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LifecycleConfig {
    /// Identifier of the distinguished intake system ("Guard"). Injected
    /// here once instead of looked up by name at call sites.
    pub default_system_id: String,
}

/// Orchestrates patient state transitions.
pub struct LifecycleManager {
    config: LifecycleConfig,
    policy: Box<dyn TransferPolicy>,
}

impl LifecycleManager {
    pub fn new(config: LifecycleConfig) -> Self {
        Self::with_policy(config, Box::new(AllowAllTransfers))
    }

    pub fn with_policy(config: LifecycleConfig, policy: Box<dyn TransferPolicy>) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Admit a new patient: create the patient row, open the first entry and
    /// place the patient in the default intake system. Atomic: on bed
    /// exhaustion neither the patient nor the entry persists.
    pub fn intake(
        &self,
        db: &mut Database,
        patient_form: PatientForm,
        entry_form: EntryForm,
    ) -> LifecycleResult<Patient> {
        validate_intake(&patient_form)?;
        if db.dni_exists(&patient_form.dni)? {
            return Err(LifecycleError::Validation(format!(
                "patient with dni {} already registered",
                patient_form.dni
            )));
        }

        let mut patient = Patient::new(patient_form, self.config.default_system_id.clone());
        let entry = Entry::new(patient.patient_id.clone(), entry_form);

        let tx = db.transaction()?;
        patients::insert_patient(&tx, &patient)?;
        records::insert_entry(&tx, &entry)?;
        self.place_in_system(&tx, &mut patient, &self.config.default_system_id, &entry)?;
        tx.commit().map_err(DbError::from)?;

        info!(
            "patient {} admitted into system {}",
            patient.patient_id, patient.system_id
        );
        Ok(patient)
    }

    /// Place a patient into a system against the given entry, or against the
    /// current one when no entry is supplied. Used at intake and on
    /// readmission after discharge.
    pub fn set_initial_system(
        &self,
        db: &mut Database,
        patient_id: &str,
        new_system_id: &str,
        entry: Option<Entry>,
    ) -> LifecycleResult<Patient> {
        let mut patient = db
            .get_patient(patient_id)?
            .ok_or_else(|| LifecycleError::PatientNotFound(patient_id.to_string()))?;

        let tx = db.transaction()?;
        let entry = match entry {
            Some(entry) => entry,
            None => records::current_entry(&tx, patient_id)?
                .ok_or_else(|| LifecycleError::NoCurrentEntry(patient_id.to_string()))?,
        };
        self.place_in_system(&tx, &mut patient, new_system_id, &entry)?;
        tx.commit().map_err(DbError::from)?;
        Ok(patient)
    }

    /// Readmission after a terminal state: opens a fresh entry and runs the
    /// initial placement into the default intake system.
    pub fn readmit(
        &self,
        db: &mut Database,
        patient_id: &str,
        entry_form: EntryForm,
    ) -> LifecycleResult<Patient> {
        let mut patient = db
            .get_patient(patient_id)?
            .ok_or_else(|| LifecycleError::PatientNotFound(patient_id.to_string()))?;
        if patient.is_hospitalized() {
            return Err(LifecycleError::Validation(format!(
                "patient {} is already hospitalized",
                patient_id
            )));
        }

        let entry = Entry::new(patient.patient_id.clone(), entry_form);

        let tx = db.transaction()?;
        records::insert_entry(&tx, &entry)?;
        self.place_in_system(&tx, &mut patient, &self.config.default_system_id, &entry)?;
        patients::set_state(&tx, patient_id, PatientState::Hospitalized)?;
        tx.commit().map_err(DbError::from)?;

        patient.state = PatientState::Hospitalized;
        info!("patient {} readmitted", patient.patient_id);
        Ok(patient)
    }

    /// Transfer a hospitalized patient to another care system. Appends the
    /// audit hospitalization for the target system, swaps beds and updates
    /// the patient row, all or nothing.
    pub fn change_system(
        &self,
        db: &mut Database,
        patient_id: &str,
        new_system_id: &str,
        acting_user_id: &str,
    ) -> LifecycleResult<Patient> {
        let mut patient = db
            .get_patient(patient_id)?
            .ok_or_else(|| LifecycleError::PatientNotFound(patient_id.to_string()))?;
        // Terminal states hold no bed; only admitted patients move
        if !patient.is_hospitalized() {
            return Err(LifecycleError::Validation(format!(
                "patient {} is not hospitalized",
                patient_id
            )));
        }
        let target = db
            .get_system(new_system_id)?
            .ok_or_else(|| LifecycleError::SystemNotFound(new_system_id.to_string()))?;

        self.policy
            .authorize(&patient, &target, acting_user_id)
            .map_err(LifecycleError::PolicyDenied)?;

        let tx = db.transaction()?;
        let entry = records::current_entry(&tx, patient_id)?
            .ok_or_else(|| LifecycleError::NoCurrentEntry(patient_id.to_string()))?;

        let hosp = Hospitalization::new(
            entry.entry_id.clone(),
            target.system_id.clone(),
            Some(acting_user_id.to_string()),
        );
        records::insert_hospitalization(&tx, &hosp)?;
        facility::free_bed(&tx, patient_id)?;
        let bed = facility::occupy_bed(&tx, &target.system_id, patient_id)?.ok_or_else(|| {
            warn!(
                "transfer of patient {} aborted: system {} has no free bed",
                patient_id, target.name
            );
            LifecycleError::BedUnavailable {
                system_id: target.system_id.clone(),
            }
        })?;
        patients::set_system(&tx, patient_id, &target.system_id)?;
        tx.commit().map_err(DbError::from)?;

        patient.system_id = target.system_id;
        info!(
            "patient {} transferred to {} (bed {}) by {}",
            patient.patient_id, target.name, bed.number, acting_user_id
        );
        Ok(patient)
    }

    /// Discharge: terminal state. Frees the bed and stamps the exit date on
    /// the current entry.
    pub fn discharge(&self, db: &mut Database, patient_id: &str) -> LifecycleResult<Patient> {
        self.close_stay(db, patient_id, PatientState::Discharged)
    }

    /// Death: terminal state. Frees the bed and stamps the death date on the
    /// current entry.
    pub fn mark_deceased(&self, db: &mut Database, patient_id: &str) -> LifecycleResult<Patient> {
        self.close_stay(db, patient_id, PatientState::Deceased)
    }

    /// Shared placement step. Frees any held bed, claims a bed in
    /// `system_id` and records the movement on `entry`.
    ///
    /// The hospitalization is always recorded against the configured default
    /// system, mirroring the intake flow; both callers target that system,
    /// so record and placement agree.
    fn place_in_system(
        &self,
        conn: &Connection,
        patient: &mut Patient,
        system_id: &str,
        entry: &Entry,
    ) -> LifecycleResult<()> {
        let target = facility::get_system(conn, system_id)?
            .ok_or_else(|| LifecycleError::SystemNotFound(system_id.to_string()))?;

        let hosp = Hospitalization::new(
            entry.entry_id.clone(),
            self.config.default_system_id.clone(),
            None,
        );
        records::insert_hospitalization(conn, &hosp)?;
        facility::free_bed(conn, &patient.patient_id)?;
        let bed = facility::occupy_bed(conn, &target.system_id, &patient.patient_id)?
            .ok_or_else(|| {
            warn!(
                "placement of patient {} aborted: system {} has no free bed",
                patient.patient_id, target.name
            );
            LifecycleError::BedUnavailable {
                system_id: target.system_id.clone(),
            }
        })?;
        patients::set_system(conn, &patient.patient_id, &target.system_id)?;
        patient.system_id = target.system_id;
        debug!(
            "patient {} placed in bed {} of {}",
            patient.patient_id, bed.number, target.name
        );
        Ok(())
    }

    fn close_stay(
        &self,
        db: &mut Database,
        patient_id: &str,
        state: PatientState,
    ) -> LifecycleResult<Patient> {
        debug_assert!(state.is_terminal());
        let mut patient = db
            .get_patient(patient_id)?
            .ok_or_else(|| LifecycleError::PatientNotFound(patient_id.to_string()))?;
        // Terminal states never transition further
        if !patient.is_hospitalized() {
            return Err(LifecycleError::Validation(format!(
                "patient {} is not hospitalized",
                patient_id
            )));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let tx = db.transaction()?;
        facility::free_bed(&tx, patient_id)?;
        patients::set_state(&tx, patient_id, state)?;
        if let Some(entry) = records::current_entry(&tx, patient_id)? {
            match state {
                PatientState::Discharged => {
                    records::stamp_exit_date(&tx, &entry.entry_id, &now)?;
                }
                PatientState::Deceased => {
                    records::stamp_death_date(&tx, &entry.entry_id, &now)?;
                }
                PatientState::Hospitalized => {}
            }
        }
        tx.commit().map_err(DbError::from)?;

        patient.state = state;
        info!("patient {} marked {}", patient_id, state.as_str());
        Ok(patient)
    }
}

fn validate_intake(form: &PatientForm) -> LifecycleResult<()> {
    for (field, value) in [
        ("name", &form.name),
        ("lastname", &form.lastname),
        ("dni", &form.dni),
    ] {
        if value.trim().is_empty() {
            return Err(LifecycleError::Validation(format!(
                "missing required field: {}",
                field
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bed, Room};

    fn manager_for(system_id: &str) -> LifecycleManager {
        LifecycleManager::new(LifecycleConfig {
            default_system_id: system_id.to_string(),
        })
    }

    fn setup_guard(db: &Database, beds: usize) -> CareSystem {
        let guard = CareSystem::new("Guard".into());
        db.insert_system(&guard).unwrap();
        let room = Room::new(guard.system_id.clone(), 1);
        db.insert_room(&room).unwrap();
        for number in 0..beds {
            db.insert_bed(&Bed::new(room.room_id.clone(), number as i64 + 1))
                .unwrap();
        }
        guard
    }

    fn intake_form(dni: &str) -> PatientForm {
        PatientForm {
            name: "Ana".into(),
            lastname: "Suarez".into(),
            dni: dni.into(),
            ..PatientForm::default()
        }
    }

    #[test]
    fn test_intake_requires_identity_fields() {
        let mut db = Database::open_in_memory().unwrap();
        let guard = setup_guard(&db, 1);
        let manager = manager_for(&guard.system_id);

        let mut form = intake_form("100");
        form.name = "  ".into();
        let err = manager
            .intake(&mut db, form, EntryForm::default())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
    }

    #[test]
    fn test_intake_rejects_duplicate_dni() {
        let mut db = Database::open_in_memory().unwrap();
        let guard = setup_guard(&db, 2);
        let manager = manager_for(&guard.system_id);

        manager
            .intake(&mut db, intake_form("100"), EntryForm::default())
            .unwrap();
        let err = manager
            .intake(&mut db, intake_form("100"), EntryForm::default())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
    }

    #[test]
    fn test_transfer_denied_by_policy() {
        struct DenyAll;
        impl TransferPolicy for DenyAll {
            fn authorize(&self, _: &Patient, _: &CareSystem, _: &str) -> Result<(), String> {
                Err("transfers are suspended".into())
            }
        }

        let mut db = Database::open_in_memory().unwrap();
        let guard = setup_guard(&db, 1);
        let icu = CareSystem::new("ICU".into());
        db.insert_system(&icu).unwrap();

        let manager = LifecycleManager::with_policy(
            LifecycleConfig {
                default_system_id: guard.system_id.clone(),
            },
            Box::new(DenyAll),
        );
        let patient = manager
            .intake(&mut db, intake_form("100"), EntryForm::default())
            .unwrap();

        let err = manager
            .change_system(&mut db, &patient.patient_id, &icu.system_id, "user-7")
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PolicyDenied(_)));
        // Patient untouched
        let reread = db.get_patient(&patient.patient_id).unwrap().unwrap();
        assert_eq!(reread.system_id, guard.system_id);
    }

    #[test]
    fn test_unknown_patient_and_system() {
        let mut db = Database::open_in_memory().unwrap();
        let guard = setup_guard(&db, 1);
        let manager = manager_for(&guard.system_id);

        let err = manager
            .change_system(&mut db, "nope", &guard.system_id, "user-1")
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PatientNotFound(_)));

        let patient = manager
            .intake(&mut db, intake_form("100"), EntryForm::default())
            .unwrap();
        let err = manager
            .change_system(&mut db, &patient.patient_id, "nope", "user-1")
            .unwrap_err();
        assert!(matches!(err, LifecycleError::SystemNotFound(_)));
    }
}
