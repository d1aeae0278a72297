//! Clinical record chain: entries, hospitalizations and evolutions.
//!
//! One [`Entry`] per continuous hospital stay. Each system movement inside a
//! stay appends a [`Hospitalization`]; clinical notes attach to
//! hospitalizations as [`Evolution`] records. Hospitalizations and evolutions
//! are append-only.

use serde::{Deserialize, Serialize};

/// Admission metadata supplied when opening an entry. All dates optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntryForm {
    pub actual_disease: Option<String>,
    pub date_of_symptoms: Option<String>,
    pub date_of_diagnosis: Option<String>,
    pub date_of_admission: Option<String>,
    pub date_of_death: Option<String>,
    pub date_of_exit: Option<String>,
}

/// One continuous hospital visit for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub entry_id: String,
    pub patient_id: String,
    /// Timestamp the entry was opened; orders entries per patient
    pub date: String,
    pub actual_disease: Option<String>,
    pub date_of_symptoms: Option<String>,
    pub date_of_diagnosis: Option<String>,
    pub date_of_admission: Option<String>,
    pub date_of_death: Option<String>,
    pub date_of_exit: Option<String>,
}

impl Entry {
    /// Open a new entry for a patient, timestamped now.
    pub fn new(patient_id: String, form: EntryForm) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            date: chrono::Utc::now().to_rfc3339(),
            actual_disease: form.actual_disease,
            date_of_symptoms: form.date_of_symptoms,
            date_of_diagnosis: form.date_of_diagnosis,
            date_of_admission: form.date_of_admission,
            date_of_death: form.date_of_death,
            date_of_exit: form.date_of_exit,
        }
    }

    /// An entry stays open until an exit or death date is stamped.
    pub fn is_open(&self) -> bool {
        self.date_of_exit.is_none() && self.date_of_death.is_none()
    }
}

/// One residence segment in a care system, the audit record of a movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hospitalization {
    pub hospitalization_id: String,
    pub entry_id: String,
    pub system_id: String,
    pub date: String,
    /// User that ordered the movement, when known
    pub ordered_by: Option<String>,
}

impl Hospitalization {
    pub fn new(entry_id: String, system_id: String, ordered_by: Option<String>) -> Self {
        Self {
            hospitalization_id: uuid::Uuid::new_v4().to_string(),
            entry_id,
            system_id,
            date: chrono::Utc::now().to_rfc3339(),
            ordered_by,
        }
    }
}

/// A clinical progress note attached to a hospitalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evolution {
    pub evolution_id: String,
    pub hospitalization_id: String,
    pub date: String,
    pub note: String,
}

impl Evolution {
    pub fn new(hospitalization_id: String, note: String) -> Self {
        Self {
            evolution_id: uuid::Uuid::new_v4().to_string(),
            hospitalization_id,
            date: chrono::Utc::now().to_rfc3339(),
            note,
        }
    }
}
