//! Medical staff model.

use serde::{Deserialize, Serialize};

/// A medic that can be assigned to patients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medic {
    pub medic_id: String,
    pub name: String,
    pub lastname: String,
    pub email: String,
}

impl Medic {
    pub fn new(name: String, lastname: String, email: String) -> Self {
        Self {
            medic_id: uuid::Uuid::new_v4().to_string(),
            name,
            lastname,
            email,
        }
    }
}
