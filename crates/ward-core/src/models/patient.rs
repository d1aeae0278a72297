//! Patient model and lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a patient. Stored as TEXT in the database.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PatientState {
    /// Admitted and residing in some care system
    Hospitalized,
    /// Stay ended, patient left the hospital
    Discharged,
    /// Stay ended by death
    Deceased,
}

impl PatientState {
    /// Database/text representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientState::Hospitalized => "hospitalized",
            PatientState::Discharged => "discharged",
            PatientState::Deceased => "deceased",
        }
    }

    /// Parse the text representation. `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hospitalized" => Some(PatientState::Hospitalized),
            "discharged" => Some(PatientState::Discharged),
            "deceased" => Some(PatientState::Deceased),
            _ => None,
        }
    }

    /// Terminal states never transition further on their own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PatientState::Discharged | PatientState::Deceased)
    }
}

/// Demographic and contact data supplied at intake or on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientForm {
    pub name: String,
    pub lastname: String,
    /// National identity document, unique per patient
    pub dni: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub personal_background: Option<String>,
    pub email: Option<String>,
    pub medical_ensurance_id: Option<String>,
    pub contact_name: Option<String>,
    pub contact_lastname: Option<String>,
    pub contact_phone: Option<String>,
}

/// A patient record. Created at intake, never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub patient_id: String,
    pub name: String,
    pub lastname: String,
    pub dni: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub personal_background: Option<String>,
    pub email: Option<String>,
    pub contact_name: Option<String>,
    pub contact_lastname: Option<String>,
    pub contact_phone: Option<String>,
    pub medical_ensurance_id: Option<String>,
    /// Lifecycle state
    pub state: PatientState,
    /// Care system the patient currently resides in
    pub system_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient from intake data, placed in `system_id`.
    pub fn new(form: PatientForm, system_id: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            patient_id: uuid::Uuid::new_v4().to_string(),
            name: form.name,
            lastname: form.lastname,
            dni: form.dni,
            address: form.address,
            phone: form.phone,
            birth_date: form.birth_date,
            personal_background: form.personal_background,
            email: form.email,
            contact_name: form.contact_name,
            contact_lastname: form.contact_lastname,
            contact_phone: form.contact_phone,
            medical_ensurance_id: form.medical_ensurance_id,
            state: PatientState::Hospitalized,
            system_id,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Overwrite demographic fields from an update form.
    pub fn apply(&mut self, form: PatientForm) {
        self.name = form.name;
        self.lastname = form.lastname;
        self.dni = form.dni;
        self.address = form.address;
        self.phone = form.phone;
        self.birth_date = form.birth_date;
        self.personal_background = form.personal_background;
        self.email = form.email;
        self.contact_name = form.contact_name;
        self.contact_lastname = form.contact_lastname;
        self.contact_phone = form.contact_phone;
        self.medical_ensurance_id = form.medical_ensurance_id;
        self.touch();
    }

    /// Check whether the patient is currently admitted.
    pub fn is_hospitalized(&self) -> bool {
        self.state == PatientState::Hospitalized
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Medical insurance lookup entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalEnsurance {
    pub medical_ensurance_id: String,
    pub name: String,
}

impl MedicalEnsurance {
    pub fn new(name: String) -> Self {
        Self {
            medical_ensurance_id: uuid::Uuid::new_v4().to_string(),
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake_form() -> PatientForm {
        PatientForm {
            name: "Ana".into(),
            lastname: "Suarez".into(),
            dni: "31442876".into(),
            ..PatientForm::default()
        }
    }

    #[test]
    fn test_new_patient() {
        let patient = Patient::new(intake_form(), "sys-1".into());
        assert_eq!(patient.name, "Ana");
        assert_eq!(patient.system_id, "sys-1");
        assert!(patient.is_hospitalized());
        assert_eq!(patient.patient_id.len(), 36); // UUID format
    }

    #[test]
    fn test_apply_update() {
        let mut patient = Patient::new(intake_form(), "sys-1".into());
        let mut form = intake_form();
        form.address = Some("Calle 7 n. 1450".into());
        patient.apply(form);
        assert_eq!(patient.address, Some("Calle 7 n. 1450".into()));
        assert_eq!(patient.system_id, "sys-1"); // transitions own this field
    }

    #[test]
    fn test_state_round_trip() {
        for state in [
            PatientState::Hospitalized,
            PatientState::Discharged,
            PatientState::Deceased,
        ] {
            assert_eq!(PatientState::parse(state.as_str()), Some(state));
        }
        assert_eq!(PatientState::parse("resting"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PatientState::Hospitalized.is_terminal());
        assert!(PatientState::Discharged.is_terminal());
        assert!(PatientState::Deceased.is_terminal());
    }
}
