//! Clinical record chain operations: entries, hospitalizations, evolutions.

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Entry, Evolution, Hospitalization};

/// Default window for the evolutions listing.
pub const DEFAULT_EVOLUTION_LIMIT: usize = 8;

impl Database {
    /// Open a new entry for a patient.
    pub fn insert_entry(&self, entry: &Entry) -> DbResult<()> {
        insert_entry(self.conn(), entry)
    }

    /// Get an entry by ID.
    pub fn get_entry(&self, entry_id: &str) -> DbResult<Option<Entry>> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE entry_id = ?"),
                [entry_id],
                entry_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// The patient's most recent entry, or `None` for a new patient.
    pub fn current_entry(&self, patient_id: &str) -> DbResult<Option<Entry>> {
        current_entry(self.conn(), patient_id)
    }

    /// All entries for a patient, newest first. This is the patient's
    /// clinical history.
    pub fn entries_for_patient(&self, patient_id: &str) -> DbResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE patient_id = ? ORDER BY date DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([patient_id], entry_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Append a hospitalization record.
    pub fn insert_hospitalization(&self, hosp: &Hospitalization) -> DbResult<()> {
        insert_hospitalization(self.conn(), hosp)
    }

    /// The latest hospitalization across the patient's most recent entry.
    pub fn current_hospitalization(&self, patient_id: &str) -> DbResult<Option<Hospitalization>> {
        current_hospitalization(self.conn(), patient_id)
    }

    /// Hospitalizations of one entry in movement order.
    pub fn hospitalizations_for_entry(&self, entry_id: &str) -> DbResult<Vec<Hospitalization>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT hospitalization_id, entry_id, system_id, date, ordered_by
            FROM hospitalizations
            WHERE entry_id = ?
            ORDER BY date ASC, rowid ASC
            "#,
        )?;
        let rows = stmt.query_map([entry_id], hospitalization_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Append an evolution note.
    pub fn insert_evolution(&self, evolution: &Evolution) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO evolutions (evolution_id, hospitalization_id, date, note)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                evolution.evolution_id,
                evolution.hospitalization_id,
                evolution.date,
                evolution.note,
            ],
        )?;
        Ok(())
    }

    /// Most recent evolution notes across all of the patient's
    /// hospitalizations, newest first.
    pub fn latest_evolutions(&self, patient_id: &str, limit: usize) -> DbResult<Vec<Evolution>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT ev.evolution_id, ev.hospitalization_id, ev.date, ev.note
            FROM evolutions ev
            JOIN hospitalizations h ON h.hospitalization_id = ev.hospitalization_id
            JOIN entries e ON e.entry_id = h.entry_id
            WHERE e.patient_id = ?1
            ORDER BY ev.date DESC, ev.rowid DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![patient_id, limit as i64], |row| {
            Ok(Evolution {
                evolution_id: row.get(0)?,
                hospitalization_id: row.get(1)?,
                date: row.get(2)?,
                note: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

const ENTRY_COLUMNS: &str = "entry_id, patient_id, date, actual_disease, date_of_symptoms, \
     date_of_diagnosis, date_of_admission, date_of_death, date_of_exit";

pub(crate) fn insert_entry(conn: &Connection, entry: &Entry) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO entries (
            entry_id, patient_id, date, actual_disease, date_of_symptoms,
            date_of_diagnosis, date_of_admission, date_of_death, date_of_exit
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            entry.entry_id,
            entry.patient_id,
            entry.date,
            entry.actual_disease,
            entry.date_of_symptoms,
            entry.date_of_diagnosis,
            entry.date_of_admission,
            entry.date_of_death,
            entry.date_of_exit,
        ],
    )?;
    Ok(())
}

pub(crate) fn current_entry(conn: &Connection, patient_id: &str) -> DbResult<Option<Entry>> {
    conn.query_row(
        &format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE patient_id = ? \
             ORDER BY date DESC, rowid DESC LIMIT 1"
        ),
        [patient_id],
        entry_from_row,
    )
    .optional()
    .map_err(Into::into)
}

pub(crate) fn insert_hospitalization(conn: &Connection, hosp: &Hospitalization) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO hospitalizations (hospitalization_id, entry_id, system_id, date, ordered_by)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            hosp.hospitalization_id,
            hosp.entry_id,
            hosp.system_id,
            hosp.date,
            hosp.ordered_by,
        ],
    )?;
    Ok(())
}

pub(crate) fn current_hospitalization(
    conn: &Connection,
    patient_id: &str,
) -> DbResult<Option<Hospitalization>> {
    // Scoped to the most recent entry; within it the latest appended
    // movement wins (the table is append-only, so rowid is insertion order).
    conn.query_row(
        r#"
        SELECT h.hospitalization_id, h.entry_id, h.system_id, h.date, h.ordered_by
        FROM hospitalizations h
        JOIN entries e ON e.entry_id = h.entry_id
        WHERE e.patient_id = ?
        ORDER BY e.date DESC, e.rowid DESC, h.date DESC, h.rowid DESC
        LIMIT 1
        "#,
        [patient_id],
        hospitalization_from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Stamp the exit date on an entry, closing it.
pub(crate) fn stamp_exit_date(conn: &Connection, entry_id: &str, date: &str) -> DbResult<bool> {
    let rows_affected = conn.execute(
        "UPDATE entries SET date_of_exit = ?2 WHERE entry_id = ?1",
        params![entry_id, date],
    )?;
    Ok(rows_affected > 0)
}

/// Stamp the death date on an entry, closing it.
pub(crate) fn stamp_death_date(conn: &Connection, entry_id: &str, date: &str) -> DbResult<bool> {
    let rows_affected = conn.execute(
        "UPDATE entries SET date_of_death = ?2 WHERE entry_id = ?1",
        params![entry_id, date],
    )?;
    Ok(rows_affected > 0)
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        entry_id: row.get(0)?,
        patient_id: row.get(1)?,
        date: row.get(2)?,
        actual_disease: row.get(3)?,
        date_of_symptoms: row.get(4)?,
        date_of_diagnosis: row.get(5)?,
        date_of_admission: row.get(6)?,
        date_of_death: row.get(7)?,
        date_of_exit: row.get(8)?,
    })
}

fn hospitalization_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Hospitalization> {
    Ok(Hospitalization {
        hospitalization_id: row.get(0)?,
        entry_id: row.get(1)?,
        system_id: row.get(2)?,
        date: row.get(3)?,
        ordered_by: row.get(4)?,
    })
}
