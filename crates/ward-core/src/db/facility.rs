//! Facility database operations: systems, rooms and the bed registry.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Bed, CareSystem, Room};

impl Database {
    /// Register a care system.
    pub fn insert_system(&self, system: &CareSystem) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO systems (system_id, name) VALUES (?1, ?2)",
            params![system.system_id, system.name],
        )?;
        Ok(())
    }

    /// Get a system by ID.
    pub fn get_system(&self, system_id: &str) -> DbResult<Option<CareSystem>> {
        get_system(self.conn(), system_id)
    }

    /// Get a system by its unique name.
    pub fn get_system_by_name(&self, name: &str) -> DbResult<Option<CareSystem>> {
        self.conn
            .query_row(
                "SELECT system_id, name FROM systems WHERE name = ?",
                [name],
                |row| {
                    Ok(CareSystem {
                        system_id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all systems.
    pub fn list_systems(&self) -> DbResult<Vec<CareSystem>> {
        let mut stmt = self
            .conn
            .prepare("SELECT system_id, name FROM systems ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(CareSystem {
                system_id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Register a room within a system.
    pub fn insert_room(&self, room: &Room) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO rooms (room_id, system_id, number) VALUES (?1, ?2, ?3)",
            params![room.room_id, room.system_id, room.number],
        )?;
        Ok(())
    }

    /// Register a bed within a room.
    pub fn insert_bed(&self, bed: &Bed) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO beds (bed_id, room_id, number, is_occupied, patient_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                bed.bed_id,
                bed.room_id,
                bed.number,
                bed.is_occupied,
                bed.patient_id,
            ],
        )?;
        Ok(())
    }

    /// Get a bed by ID.
    pub fn get_bed(&self, bed_id: &str) -> DbResult<Option<Bed>> {
        self.conn
            .query_row(
                r#"
                SELECT bed_id, room_id, number, is_occupied, patient_id
                FROM beds
                WHERE bed_id = ?
                "#,
                [bed_id],
                bed_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get the bed currently held by a patient, if any.
    pub fn bed_for_patient(&self, patient_id: &str) -> DbResult<Option<Bed>> {
        bed_for_patient(self.conn(), patient_id)
    }

    /// Release the bed held by a patient. Returns whether a bed was freed;
    /// calling with no bed held is a no-op.
    pub fn free_bed(&self, patient_id: &str) -> DbResult<bool> {
        free_bed(self.conn(), patient_id)
    }

    /// Claim a free bed in a system for a patient. `None` when the system
    /// has no capacity.
    pub fn occupy_bed(&self, system_id: &str, patient_id: &str) -> DbResult<Option<Bed>> {
        occupy_bed(self.conn(), system_id, patient_id)
    }

    /// Count free beds in a system.
    pub fn free_bed_count(&self, system_id: &str) -> DbResult<i64> {
        let count = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM beds b
            JOIN rooms r ON r.room_id = b.room_id
            WHERE r.system_id = ? AND b.is_occupied = 0
            "#,
            [system_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

pub(crate) fn get_system(conn: &Connection, system_id: &str) -> DbResult<Option<CareSystem>> {
    conn.query_row(
        "SELECT system_id, name FROM systems WHERE system_id = ?",
        [system_id],
        |row| {
            Ok(CareSystem {
                system_id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn bed_for_patient(conn: &Connection, patient_id: &str) -> DbResult<Option<Bed>> {
    conn.query_row(
        r#"
        SELECT bed_id, room_id, number, is_occupied, patient_id
        FROM beds
        WHERE patient_id = ?
        "#,
        [patient_id],
        bed_from_row,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn free_bed(conn: &Connection, patient_id: &str) -> DbResult<bool> {
    let rows_affected = conn.execute(
        "UPDATE beds SET is_occupied = 0, patient_id = NULL WHERE patient_id = ?",
        [patient_id],
    )?;
    Ok(rows_affected > 0)
}

/// Selection is deterministic: lowest bed number wins, ties broken by the
/// lowest room number.
pub(crate) fn occupy_bed(
    conn: &Connection,
    system_id: &str,
    patient_id: &str,
) -> DbResult<Option<Bed>> {
    let candidate = conn
        .query_row(
            r#"
            SELECT b.bed_id, b.room_id, b.number, b.is_occupied, b.patient_id
            FROM beds b
            JOIN rooms r ON r.room_id = b.room_id
            WHERE r.system_id = ?1 AND b.is_occupied = 0
            ORDER BY b.number ASC, r.number ASC
            LIMIT 1
            "#,
            [system_id],
            bed_from_row,
        )
        .optional()?;

    let mut bed = match candidate {
        Some(bed) => bed,
        None => return Ok(None),
    };

    conn.execute(
        "UPDATE beds SET is_occupied = 1, patient_id = ?1 WHERE bed_id = ?2",
        params![patient_id, bed.bed_id],
    )?;
    bed.is_occupied = true;
    bed.patient_id = Some(patient_id.to_string());
    Ok(Some(bed))
}

fn bed_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bed> {
    Ok(Bed {
        bed_id: row.get(0)?,
        room_id: row.get(1)?,
        number: row.get(2)?,
        is_occupied: row.get(3)?,
        patient_id: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, PatientForm};

    fn setup_db() -> (Database, CareSystem) {
        let db = Database::open_in_memory().unwrap();
        let system = CareSystem::new("Guard".into());
        db.insert_system(&system).unwrap();
        (db, system)
    }

    fn add_room_with_beds(db: &Database, system: &CareSystem, room_no: i64, beds: &[i64]) -> Room {
        let room = Room::new(system.system_id.clone(), room_no);
        db.insert_room(&room).unwrap();
        for number in beds {
            db.insert_bed(&Bed::new(room.room_id.clone(), *number)).unwrap();
        }
        room
    }

    fn add_patient(db: &Database, system: &CareSystem, dni: &str) -> Patient {
        let patient = Patient::new(
            PatientForm {
                name: "Ana".into(),
                lastname: "Suarez".into(),
                dni: dni.into(),
                ..PatientForm::default()
            },
            system.system_id.clone(),
        );
        db.insert_patient(&patient).unwrap();
        patient
    }

    #[test]
    fn test_occupy_picks_lowest_bed_number() {
        let (db, system) = setup_db();
        add_room_with_beds(&db, &system, 1, &[5, 2]);
        add_room_with_beds(&db, &system, 2, &[3]);
        let patient = add_patient(&db, &system, "100");

        let bed = db
            .occupy_bed(&system.system_id, &patient.patient_id)
            .unwrap()
            .unwrap();
        assert_eq!(bed.number, 2);
        assert!(bed.is_occupied);
        assert_eq!(bed.patient_id.as_deref(), Some(patient.patient_id.as_str()));
    }

    #[test]
    fn test_occupy_exhausts_capacity() {
        let (db, system) = setup_db();
        add_room_with_beds(&db, &system, 1, &[1]);
        let first = add_patient(&db, &system, "100");
        let second = add_patient(&db, &system, "200");

        assert!(db
            .occupy_bed(&system.system_id, &first.patient_id)
            .unwrap()
            .is_some());
        assert!(db
            .occupy_bed(&system.system_id, &second.patient_id)
            .unwrap()
            .is_none());
        assert_eq!(db.free_bed_count(&system.system_id).unwrap(), 0);
    }

    #[test]
    fn test_free_bed_is_idempotent() {
        let (db, system) = setup_db();
        add_room_with_beds(&db, &system, 1, &[1]);
        let patient = add_patient(&db, &system, "100");

        db.occupy_bed(&system.system_id, &patient.patient_id)
            .unwrap()
            .unwrap();

        assert!(db.free_bed(&patient.patient_id).unwrap());
        // Second free is a no-op, not an error
        assert!(!db.free_bed(&patient.patient_id).unwrap());
        assert!(db.bed_for_patient(&patient.patient_id).unwrap().is_none());
        assert_eq!(db.free_bed_count(&system.system_id).unwrap(), 1);
    }

    #[test]
    fn test_get_system_by_name() {
        let (db, system) = setup_db();
        let found = db.get_system_by_name("Guard").unwrap().unwrap();
        assert_eq!(found.system_id, system.system_id);
        assert!(db.get_system_by_name("ICU").unwrap().is_none());
    }
}
