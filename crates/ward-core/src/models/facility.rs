//! Facility models: care systems, rooms and beds.

use serde::{Deserialize, Serialize};

/// A named care unit (e.g. "Guard", "ICU", general ward).
///
/// One system is designated as the intake default; its identifier is carried
/// by [`crate::lifecycle::LifecycleConfig`] rather than looked up by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareSystem {
    pub system_id: String,
    pub name: String,
}

impl CareSystem {
    pub fn new(name: String) -> Self {
        Self {
            system_id: uuid::Uuid::new_v4().to_string(),
            name,
        }
    }
}

/// A room inside a care system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub room_id: String,
    pub system_id: String,
    pub number: i64,
}

impl Room {
    pub fn new(system_id: String, number: i64) -> Self {
        Self {
            room_id: uuid::Uuid::new_v4().to_string(),
            system_id,
            number,
        }
    }
}

/// The atomic occupancy unit. `patient_id` is set iff `is_occupied`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bed {
    pub bed_id: String,
    pub room_id: String,
    pub number: i64,
    pub is_occupied: bool,
    pub patient_id: Option<String>,
}

impl Bed {
    /// Create a free bed in a room.
    pub fn new(room_id: String, number: i64) -> Self {
        Self {
            bed_id: uuid::Uuid::new_v4().to_string(),
            room_id,
            number,
            is_occupied: false,
            patient_id: None,
        }
    }
}
