//! Medic registry and the patient-medic association set.

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::Medic;

impl Database {
    /// Register a medic.
    pub fn insert_medic(&self, medic: &Medic) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO medics (medic_id, name, lastname, email) VALUES (?1, ?2, ?3, ?4)",
            params![medic.medic_id, medic.name, medic.lastname, medic.email],
        )?;
        Ok(())
    }

    /// List all medics.
    pub fn list_medics(&self) -> DbResult<Vec<Medic>> {
        let mut stmt = self.conn.prepare(
            "SELECT medic_id, name, lastname, email FROM medics ORDER BY lastname, name",
        )?;
        let rows = stmt.query_map([], medic_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Assign a medic to a patient. Returns false if already assigned.
    pub fn assign_medic(&self, patient_id: &str, medic_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "INSERT OR IGNORE INTO patient_medic (patient_id, medic_id) VALUES (?1, ?2)",
            params![patient_id, medic_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Remove a medic assignment. Returns whether one existed.
    pub fn unassign_medic(&self, patient_id: &str, medic_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM patient_medic WHERE patient_id = ?1 AND medic_id = ?2",
            params![patient_id, medic_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Check whether a medic is assigned to a patient.
    pub fn has_medic(&self, patient_id: &str, medic_id: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM patient_medic WHERE patient_id = ?1 AND medic_id = ?2",
            params![patient_id, medic_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Medics assigned to a patient.
    pub fn medics_for_patient(&self, patient_id: &str) -> DbResult<Vec<Medic>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT m.medic_id, m.name, m.lastname, m.email
            FROM medics m
            JOIN patient_medic pm ON pm.medic_id = m.medic_id
            WHERE pm.patient_id = ?
            ORDER BY m.lastname, m.name
            "#,
        )?;
        let rows = stmt.query_map([patient_id], medic_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Medics not yet assigned to the patient, i.e. candidates for
    /// assignment.
    pub fn available_medics(&self, patient_id: &str) -> DbResult<Vec<Medic>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT m.medic_id, m.name, m.lastname, m.email
            FROM medics m
            WHERE m.medic_id NOT IN (
                SELECT medic_id FROM patient_medic WHERE patient_id = ?
            )
            ORDER BY m.lastname, m.name
            "#,
        )?;
        let rows = stmt.query_map([patient_id], medic_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn medic_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medic> {
    Ok(Medic {
        medic_id: row.get(0)?,
        name: row.get(1)?,
        lastname: row.get(2)?,
        email: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CareSystem, Patient, PatientForm};

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let system = CareSystem::new("Guard".into());
        db.insert_system(&system).unwrap();
        let patient = Patient::new(
            PatientForm {
                name: "Ana".into(),
                lastname: "Suarez".into(),
                dni: "31442876".into(),
                ..PatientForm::default()
            },
            system.system_id.clone(),
        );
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    #[test]
    fn test_assign_and_unassign() {
        let (db, patient) = setup_db();
        let medic = Medic::new("Julia".into(), "Roca".into(), "jroca@hospital.test".into());
        db.insert_medic(&medic).unwrap();

        assert!(!db.has_medic(&patient.patient_id, &medic.medic_id).unwrap());
        assert!(db.assign_medic(&patient.patient_id, &medic.medic_id).unwrap());
        assert!(db.has_medic(&patient.patient_id, &medic.medic_id).unwrap());
        // Duplicate assignment is reported, not an error
        assert!(!db.assign_medic(&patient.patient_id, &medic.medic_id).unwrap());

        assert!(db.unassign_medic(&patient.patient_id, &medic.medic_id).unwrap());
        assert!(!db.has_medic(&patient.patient_id, &medic.medic_id).unwrap());
        assert!(!db.unassign_medic(&patient.patient_id, &medic.medic_id).unwrap());
    }

    #[test]
    fn test_available_medics_excludes_assigned() {
        let (db, patient) = setup_db();
        let assigned = Medic::new("Julia".into(), "Roca".into(), "jroca@hospital.test".into());
        let free = Medic::new("Pedro".into(), "Vega".into(), "pvega@hospital.test".into());
        db.insert_medic(&assigned).unwrap();
        db.insert_medic(&free).unwrap();
        db.assign_medic(&patient.patient_id, &assigned.medic_id).unwrap();

        let available = db.available_medics(&patient.patient_id).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].medic_id, free.medic_id);

        let mine = db.medics_for_patient(&patient.patient_id).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].medic_id, assigned.medic_id);
    }
}
