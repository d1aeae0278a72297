//! Read-model projection of a patient and their current placement.

use serde::{Deserialize, Serialize};

use super::PatientState;

/// Flat patient projection for listings: patient + system + insurance +
/// current room/bed in one row. Bed fields are `None` for patients who hold
/// no bed (discharged, deceased).
///
/// Produced by the query layer only; the write side works on the entities in
/// [`crate::models`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientOverview {
    pub patient_id: String,
    pub name: String,
    pub lastname: String,
    pub dni: String,
    pub state: PatientState,
    pub system_id: String,
    pub system_name: String,
    pub medical_ensurance: Option<String>,
    pub room_number: Option<i64>,
    pub bed_number: Option<i64>,
    pub updated_at: String,
}
