//! Patient database operations and read-model projections.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{MedicalEnsurance, Patient, PatientOverview, PatientState};

const PATIENT_COLUMNS: &str = "patient_id, name, lastname, dni, address, phone, birth_date, \
     personal_background, email, contact_name, contact_lastname, contact_phone, \
     medical_ensurance_id, state, system_id, created_at, updated_at";

const OVERVIEW_SELECT: &str = r#"
    SELECT p.patient_id, p.name, p.lastname, p.dni, p.state,
           p.system_id, s.name AS system_name,
           m.name AS medical_ensurance,
           r.number AS room_number, b.number AS bed_number,
           p.updated_at
    FROM patients p
    JOIN systems s ON s.system_id = p.system_id
    LEFT JOIN medical_ensurances m ON m.medical_ensurance_id = p.medical_ensurance_id
    LEFT JOIN beds b ON b.patient_id = p.patient_id
    LEFT JOIN rooms r ON r.room_id = b.room_id
"#;

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        insert_patient(self.conn(), patient)
    }

    /// Update an existing patient's demographic data and state.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                name = ?2,
                lastname = ?3,
                dni = ?4,
                address = ?5,
                phone = ?6,
                birth_date = ?7,
                personal_background = ?8,
                email = ?9,
                contact_name = ?10,
                contact_lastname = ?11,
                contact_phone = ?12,
                medical_ensurance_id = ?13,
                state = ?14,
                updated_at = ?15
            WHERE patient_id = ?1
            "#,
            params![
                patient.patient_id,
                patient.name,
                patient.lastname,
                patient.dni,
                patient.address,
                patient.phone,
                patient.birth_date,
                patient.personal_background,
                patient.email,
                patient.contact_name,
                patient.contact_lastname,
                patient.contact_phone,
                patient.medical_ensurance_id,
                patient.state.as_str(),
                patient.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: &str) -> DbResult<Option<Patient>> {
        get_patient(self.conn(), patient_id)
    }

    /// Check whether a patient with this DNI is already registered.
    pub fn dni_exists(&self, dni: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE dni = ?",
            [dni],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all patients, most recently touched first.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let sql = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY updated_at DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], patient_row)?;
        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Flat projection of every patient.
    pub fn list_overviews(&self) -> DbResult<Vec<PatientOverview>> {
        let sql = format!("{OVERVIEW_SELECT} ORDER BY p.updated_at DESC");
        self.collect_overviews(&sql, [])
    }

    /// Projection filtered by lifecycle state.
    pub fn list_overviews_by_state(&self, state: PatientState) -> DbResult<Vec<PatientOverview>> {
        let sql = format!("{OVERVIEW_SELECT} WHERE p.state = ?1 ORDER BY p.updated_at DESC");
        self.collect_overviews(&sql, [state.as_str()])
    }

    /// Projection filtered by current system.
    pub fn list_overviews_by_system(&self, system_id: &str) -> DbResult<Vec<PatientOverview>> {
        let sql = format!("{OVERVIEW_SELECT} WHERE p.system_id = ?1 ORDER BY p.updated_at DESC");
        self.collect_overviews(&sql, [system_id])
    }

    /// Projection filtered by system and state.
    pub fn list_overviews_by_system_and_state(
        &self,
        system_id: &str,
        state: PatientState,
    ) -> DbResult<Vec<PatientOverview>> {
        let sql = format!(
            "{OVERVIEW_SELECT} WHERE p.system_id = ?1 AND p.state = ?2 ORDER BY p.updated_at DESC"
        );
        self.collect_overviews(&sql, [system_id, state.as_str()])
    }

    /// Single-patient projection.
    pub fn patient_overview(&self, patient_id: &str) -> DbResult<Option<PatientOverview>> {
        let sql = format!("{OVERVIEW_SELECT} WHERE p.patient_id = ?1");
        let mut rows = self.collect_overviews(&sql, [patient_id])?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    fn collect_overviews<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> DbResult<Vec<PatientOverview>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, overview_row)?;
        let mut overviews = Vec::new();
        for row in rows {
            overviews.push(row?.try_into()?);
        }
        Ok(overviews)
    }

    /// Register a medical insurance entry.
    pub fn insert_medical_ensurance(&self, ensurance: &MedicalEnsurance) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO medical_ensurances (medical_ensurance_id, name) VALUES (?1, ?2)",
            params![ensurance.medical_ensurance_id, ensurance.name],
        )?;
        Ok(())
    }

    /// List all medical insurance entries.
    pub fn list_medical_ensurances(&self) -> DbResult<Vec<MedicalEnsurance>> {
        let mut stmt = self.conn.prepare(
            "SELECT medical_ensurance_id, name FROM medical_ensurances ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(MedicalEnsurance {
                medical_ensurance_id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

pub(crate) fn insert_patient(conn: &Connection, patient: &Patient) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO patients (
            patient_id, name, lastname, dni, address, phone, birth_date,
            personal_background, email, contact_name, contact_lastname,
            contact_phone, medical_ensurance_id, state, system_id,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#,
        params![
            patient.patient_id,
            patient.name,
            patient.lastname,
            patient.dni,
            patient.address,
            patient.phone,
            patient.birth_date,
            patient.personal_background,
            patient.email,
            patient.contact_name,
            patient.contact_lastname,
            patient.contact_phone,
            patient.medical_ensurance_id,
            patient.state.as_str(),
            patient.system_id,
            patient.created_at,
            patient.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn get_patient(conn: &Connection, patient_id: &str) -> DbResult<Option<Patient>> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE patient_id = ?");
    conn.query_row(&sql, [patient_id], patient_row)
        .optional()?
        .map(|row| row.try_into())
        .transpose()
}

/// Move a patient to another system, touching updated_at.
///
/// updated_at keeps the RFC 3339 encoding inserts use; the overview queries
/// sort this TEXT column, so one encoding must hold everywhere.
pub(crate) fn set_system(conn: &Connection, patient_id: &str, system_id: &str) -> DbResult<bool> {
    let rows_affected = conn.execute(
        "UPDATE patients SET system_id = ?2, updated_at = ?3 WHERE patient_id = ?1",
        params![patient_id, system_id, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(rows_affected > 0)
}

/// Set a patient's lifecycle state, touching updated_at.
pub(crate) fn set_state(conn: &Connection, patient_id: &str, state: PatientState) -> DbResult<bool> {
    let rows_affected = conn.execute(
        "UPDATE patients SET state = ?2, updated_at = ?3 WHERE patient_id = ?1",
        params![patient_id, state.as_str(), chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(rows_affected > 0)
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    patient_id: String,
    name: String,
    lastname: String,
    dni: String,
    address: Option<String>,
    phone: Option<String>,
    birth_date: Option<String>,
    personal_background: Option<String>,
    email: Option<String>,
    contact_name: Option<String>,
    contact_lastname: Option<String>,
    contact_phone: Option<String>,
    medical_ensurance_id: Option<String>,
    state: String,
    system_id: String,
    created_at: String,
    updated_at: String,
}

fn patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        patient_id: row.get(0)?,
        name: row.get(1)?,
        lastname: row.get(2)?,
        dni: row.get(3)?,
        address: row.get(4)?,
        phone: row.get(5)?,
        birth_date: row.get(6)?,
        personal_background: row.get(7)?,
        email: row.get(8)?,
        contact_name: row.get(9)?,
        contact_lastname: row.get(10)?,
        contact_phone: row.get(11)?,
        medical_ensurance_id: row.get(12)?,
        state: row.get(13)?,
        system_id: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let state = parse_state(&row.state)?;
        Ok(Patient {
            patient_id: row.patient_id,
            name: row.name,
            lastname: row.lastname,
            dni: row.dni,
            address: row.address,
            phone: row.phone,
            birth_date: row.birth_date,
            personal_background: row.personal_background,
            email: row.email,
            contact_name: row.contact_name,
            contact_lastname: row.contact_lastname,
            contact_phone: row.contact_phone,
            medical_ensurance_id: row.medical_ensurance_id,
            state,
            system_id: row.system_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct OverviewRow {
    patient_id: String,
    name: String,
    lastname: String,
    dni: String,
    state: String,
    system_id: String,
    system_name: String,
    medical_ensurance: Option<String>,
    room_number: Option<i64>,
    bed_number: Option<i64>,
    updated_at: String,
}

fn overview_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OverviewRow> {
    Ok(OverviewRow {
        patient_id: row.get(0)?,
        name: row.get(1)?,
        lastname: row.get(2)?,
        dni: row.get(3)?,
        state: row.get(4)?,
        system_id: row.get(5)?,
        system_name: row.get(6)?,
        medical_ensurance: row.get(7)?,
        room_number: row.get(8)?,
        bed_number: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl TryFrom<OverviewRow> for PatientOverview {
    type Error = DbError;

    fn try_from(row: OverviewRow) -> Result<Self, Self::Error> {
        let state = parse_state(&row.state)?;
        Ok(PatientOverview {
            patient_id: row.patient_id,
            name: row.name,
            lastname: row.lastname,
            dni: row.dni,
            state,
            system_id: row.system_id,
            system_name: row.system_name,
            medical_ensurance: row.medical_ensurance,
            room_number: row.room_number,
            bed_number: row.bed_number,
            updated_at: row.updated_at,
        })
    }
}

fn parse_state(s: &str) -> Result<PatientState, DbError> {
    PatientState::parse(s)
        .ok_or_else(|| DbError::Constraint(format!("Unknown patient state: {}", s)))
}
