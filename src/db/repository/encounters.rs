use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{ConsultationOutcome, EncounterStatus};
use crate::models::{Diagnosis, Encounter};

pub fn insert_encounter(conn: &Connection, enc: &Encounter) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO encounters (id, patient_id, status, outcome, procedure_name,
         procedure_gdrg_code, first_visit_date, second_visit_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            enc.id.to_string(),
            enc.patient_id.to_string(),
            enc.status.as_str(),
            enc.outcome.as_ref().map(|o| o.as_str()),
            enc.procedure_name,
            enc.procedure_gdrg_code,
            enc.first_visit_date.map(|d| d.to_string()),
            enc.second_visit_date.map(|d| d.to_string()),
            enc.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_encounter(conn: &Connection, id: &Uuid) -> Result<Option<Encounter>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, status, outcome, procedure_name, procedure_gdrg_code,
         first_visit_date, second_visit_date, created_at
         FROM encounters WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| Ok(encounter_row_from_rusqlite(row)));

    match result {
        Ok(row) => Ok(Some(encounter_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_encounter_status(
    conn: &Connection,
    id: &Uuid,
    status: &EncounterStatus,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE encounters SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Encounter", id));
    }
    Ok(())
}

pub fn update_encounter_outcome(
    conn: &Connection,
    id: &Uuid,
    outcome: Option<&ConsultationOutcome>,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE encounters SET outcome = ?2 WHERE id = ?1",
        params![id.to_string(), outcome.map(|o| o.as_str())],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Encounter", id));
    }
    Ok(())
}

/// Overwrite the claim-facing fields a detailed claim edit pushes back to
/// the encounter: visit dates and the recorded procedure.
pub fn update_encounter_claim_fields(
    conn: &Connection,
    id: &Uuid,
    first_visit: Option<NaiveDate>,
    second_visit: Option<NaiveDate>,
    procedure_name: Option<&str>,
    procedure_gdrg_code: Option<&str>,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE encounters SET first_visit_date = ?2, second_visit_date = ?3,
         procedure_name = ?4, procedure_gdrg_code = ?5 WHERE id = ?1",
        params![
            id.to_string(),
            first_visit.map(|d| d.to_string()),
            second_visit.map(|d| d.to_string()),
            procedure_name,
            procedure_gdrg_code,
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Encounter", id));
    }
    Ok(())
}

/// Finalized encounters that no claim row references yet, oldest first.
pub fn get_unclaimed_finalized_encounters(
    conn: &Connection,
) -> Result<Vec<Encounter>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.patient_id, e.status, e.outcome, e.procedure_name, e.procedure_gdrg_code,
         e.first_visit_date, e.second_visit_date, e.created_at
         FROM encounters e
         WHERE e.status = 'finalized'
           AND NOT EXISTS (SELECT 1 FROM claims c WHERE c.encounter_id = e.id)
         ORDER BY e.created_at ASC",
    )?;

    let rows = stmt.query_map([], |row| Ok(encounter_row_from_rusqlite(row)))?;

    let mut encounters = Vec::new();
    for row in rows {
        encounters.push(encounter_from_row(row??)?);
    }
    Ok(encounters)
}

pub fn insert_diagnosis(conn: &Connection, diag: &Diagnosis) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO diagnoses (id, encounter_id, description, icd10_code, gdrg_code, is_chief, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            diag.id.to_string(),
            diag.encounter_id.to_string(),
            diag.description,
            diag.icd10_code,
            diag.gdrg_code,
            diag.is_chief as i32,
            diag.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_diagnoses_for_encounter(
    conn: &Connection,
    encounter_id: &Uuid,
) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, encounter_id, description, icd10_code, gdrg_code, is_chief, created_at
         FROM diagnoses WHERE encounter_id = ?1 ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![encounter_id.to_string()], |row| {
        Ok(Diagnosis {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
            encounter_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
            description: row.get(2)?,
            icd10_code: row.get(3)?,
            gdrg_code: row.get(4)?,
            is_chief: row.get::<_, i32>(5)? != 0,
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(6)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .unwrap_or_default(),
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

// Internal row type for Encounter mapping
struct EncounterRow {
    id: String,
    patient_id: String,
    status: String,
    outcome: Option<String>,
    procedure_name: Option<String>,
    procedure_gdrg_code: Option<String>,
    first_visit_date: Option<String>,
    second_visit_date: Option<String>,
    created_at: String,
}

fn encounter_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<EncounterRow, rusqlite::Error> {
    Ok(EncounterRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        status: row.get(2)?,
        outcome: row.get(3)?,
        procedure_name: row.get(4)?,
        procedure_gdrg_code: row.get(5)?,
        first_visit_date: row.get(6)?,
        second_visit_date: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn encounter_from_row(row: EncounterRow) -> Result<Encounter, DatabaseError> {
    let outcome = match row.outcome {
        Some(s) => Some(ConsultationOutcome::from_str(&s)?),
        None => None,
    };
    Ok(Encounter {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: Uuid::parse_str(&row.patient_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        status: EncounterStatus::from_str(&row.status)?,
        outcome,
        procedure_name: row.procedure_name,
        procedure_gdrg_code: row.procedure_gdrg_code,
        first_visit_date: row
            .first_visit_date
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        second_visit_date: row
            .second_visit_date
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        created_at: NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}
