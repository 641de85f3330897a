use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{ClaimStatus, InvestigationType, ServiceType};
use crate::models::{Claim, ClaimDiagnosis, ClaimInvestigation, ClaimPrescription, ClaimProcedure};

pub fn insert_claim(conn: &Connection, claim: &Claim) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO claims (id, encounter_id, claim_id, claim_check_code, physician_id,
         physician_name, member_no, card_serial_no, is_dependant, type_of_service,
         type_of_attendance, specialty_attended, service_outcome, principal_gdrg,
         includes_pharmacy, first_visit_date, second_visit_date, duration_of_spell,
         status, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22)",
        params![
            claim.id.to_string(),
            claim.encounter_id.to_string(),
            claim.claim_id,
            claim.claim_check_code,
            claim.physician_id,
            claim.physician_name,
            claim.member_no,
            claim.card_serial_no,
            claim.is_dependant as i32,
            claim.type_of_service.as_str(),
            claim.type_of_attendance,
            claim.specialty_attended,
            claim.service_outcome,
            claim.principal_gdrg,
            claim.includes_pharmacy as i32,
            claim.first_visit_date.map(|d| d.to_string()),
            claim.second_visit_date.map(|d| d.to_string()),
            claim.duration_of_spell,
            claim.status.as_str(),
            claim.created_by,
            claim.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            claim.updated_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        ],
    )?;
    Ok(())
}

const CLAIM_COLUMNS: &str = "id, encounter_id, claim_id, claim_check_code, physician_id,
    physician_name, member_no, card_serial_no, is_dependant, type_of_service,
    type_of_attendance, specialty_attended, service_outcome, principal_gdrg,
    includes_pharmacy, first_visit_date, second_visit_date, duration_of_spell,
    status, created_by, created_at, updated_at";

pub fn get_claim(conn: &Connection, id: &Uuid) -> Result<Option<Claim>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE id = ?1"))?;

    let result = stmt.query_row(params![id.to_string()], |row| Ok(claim_row_from_rusqlite(row)));

    match result {
        Ok(row) => Ok(Some(claim_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_claim_for_encounter(
    conn: &Connection,
    encounter_id: &Uuid,
) -> Result<Option<Claim>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CLAIM_COLUMNS} FROM claims WHERE encounter_id = ?1 LIMIT 1"
    ))?;

    let result = stmt.query_row(params![encounter_id.to_string()], |row| {
        Ok(claim_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(claim_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_claims(conn: &Connection) -> Result<Vec<Claim>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {CLAIM_COLUMNS} FROM claims ORDER BY created_at ASC"))?;

    let rows = stmt.query_map([], |row| Ok(claim_row_from_rusqlite(row)))?;

    let mut claims = Vec::new();
    for row in rows {
        claims.push(claim_from_row(row??)?);
    }
    Ok(claims)
}

pub fn claim_external_id_exists(conn: &Connection, claim_id: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM claims WHERE claim_id = ?1",
        params![claim_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Rewrite the editable header fields of a claim.
pub fn update_claim(conn: &Connection, claim: &Claim) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE claims SET physician_id = ?2, physician_name = ?3, is_dependant = ?4,
         type_of_attendance = ?5, specialty_attended = ?6, service_outcome = ?7,
         principal_gdrg = ?8, includes_pharmacy = ?9, first_visit_date = ?10,
         second_visit_date = ?11, duration_of_spell = ?12, status = ?13, updated_at = ?14
         WHERE id = ?1",
        params![
            claim.id.to_string(),
            claim.physician_id,
            claim.physician_name,
            claim.is_dependant as i32,
            claim.type_of_attendance,
            claim.specialty_attended,
            claim.service_outcome,
            claim.principal_gdrg,
            claim.includes_pharmacy as i32,
            claim.first_visit_date.map(|d| d.to_string()),
            claim.second_visit_date.map(|d| d.to_string()),
            claim.duration_of_spell,
            claim.status.as_str(),
            claim.updated_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Claim", claim.id));
    }
    Ok(())
}

pub fn update_claim_status(
    conn: &Connection,
    id: &Uuid,
    status: &ClaimStatus,
    updated_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE claims SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            id.to_string(),
            status.as_str(),
            updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Claim", id));
    }
    Ok(())
}

pub fn delete_claim(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute("DELETE FROM claims WHERE id = ?1", params![id.to_string()])?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Claim", id));
    }
    Ok(())
}

/// Wipe all four detail collections ahead of a rebuild.
pub fn delete_claim_details(conn: &Connection, claim_id: &Uuid) -> Result<(), DatabaseError> {
    let id = claim_id.to_string();
    conn.execute("DELETE FROM claim_diagnoses WHERE claim_id = ?1", params![id])?;
    conn.execute("DELETE FROM claim_investigations WHERE claim_id = ?1", params![id])?;
    conn.execute("DELETE FROM claim_prescriptions WHERE claim_id = ?1", params![id])?;
    conn.execute("DELETE FROM claim_procedures WHERE claim_id = ?1", params![id])?;
    Ok(())
}

/// A claim counts as hand-edited once any diagnosis snapshot row exists.
pub fn has_claim_diagnoses(conn: &Connection, claim_id: &Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM claim_diagnoses WHERE claim_id = ?1",
        params![claim_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn insert_claim_diagnosis(conn: &Connection, diag: &ClaimDiagnosis) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO claim_diagnoses (id, claim_id, source_diagnosis_id, description,
         icd10_code, gdrg_code, is_chief, display_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            diag.id.to_string(),
            diag.claim_id.to_string(),
            diag.source_diagnosis_id.map(|id| id.to_string()),
            diag.description,
            diag.icd10_code,
            diag.gdrg_code,
            diag.is_chief as i32,
            diag.display_order,
        ],
    )?;
    Ok(())
}

pub fn get_claim_diagnoses(
    conn: &Connection,
    claim_id: &Uuid,
) -> Result<Vec<ClaimDiagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, claim_id, source_diagnosis_id, description, icd10_code, gdrg_code,
         is_chief, display_order
         FROM claim_diagnoses WHERE claim_id = ?1 ORDER BY display_order ASC",
    )?;

    let rows = stmt.query_map(params![claim_id.to_string()], |row| {
        Ok(ClaimDiagnosis {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
            claim_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
            source_diagnosis_id: row
                .get::<_, Option<String>>(2)?
                .and_then(|s| Uuid::parse_str(&s).ok()),
            description: row.get(3)?,
            icd10_code: row.get(4)?,
            gdrg_code: row.get(5)?,
            is_chief: row.get::<_, i32>(6)? != 0,
            display_order: row.get(7)?,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn insert_claim_investigation(
    conn: &Connection,
    inv: &ClaimInvestigation,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO claim_investigations (id, claim_id, source_investigation_id, description,
         gdrg_code, investigation_type, service_date, display_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            inv.id.to_string(),
            inv.claim_id.to_string(),
            inv.source_investigation_id.map(|id| id.to_string()),
            inv.description,
            inv.gdrg_code,
            inv.investigation_type.as_ref().map(|t| t.as_str()),
            inv.service_date.map(|d| d.to_string()),
            inv.display_order,
        ],
    )?;
    Ok(())
}

pub fn get_claim_investigations(
    conn: &Connection,
    claim_id: &Uuid,
) -> Result<Vec<ClaimInvestigation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, claim_id, source_investigation_id, description, gdrg_code,
         investigation_type, service_date, display_order
         FROM claim_investigations WHERE claim_id = ?1 ORDER BY display_order ASC",
    )?;

    let rows = stmt.query_map(params![claim_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, i32>(7)?,
        ))
    })?;

    let mut investigations = Vec::new();
    for row in rows {
        let (id, claim_id, source_id, description, gdrg_code, inv_type, service_date, order) =
            row?;
        let investigation_type = match inv_type {
            Some(s) => Some(InvestigationType::from_str(&s)?),
            None => None,
        };
        investigations.push(ClaimInvestigation {
            id: Uuid::parse_str(&id).unwrap_or_default(),
            claim_id: Uuid::parse_str(&claim_id).unwrap_or_default(),
            source_investigation_id: source_id.and_then(|s| Uuid::parse_str(&s).ok()),
            description,
            gdrg_code,
            investigation_type,
            service_date: service_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            display_order: order,
        });
    }
    Ok(investigations)
}

pub fn insert_claim_prescription(
    conn: &Connection,
    rx: &ClaimPrescription,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO claim_prescriptions (id, claim_id, source_prescription_id, medicine_code,
         description, dose, frequency, duration, unparsed, quantity, unit_price, total_cost,
         service_date, display_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            rx.id.to_string(),
            rx.claim_id.to_string(),
            rx.source_prescription_id.map(|id| id.to_string()),
            rx.medicine_code,
            rx.description,
            rx.dose,
            rx.frequency,
            rx.duration,
            rx.unparsed,
            rx.quantity,
            rx.unit_price,
            rx.total_cost,
            rx.service_date.map(|d| d.to_string()),
            rx.display_order,
        ],
    )?;
    Ok(())
}

pub fn get_claim_prescriptions(
    conn: &Connection,
    claim_id: &Uuid,
) -> Result<Vec<ClaimPrescription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, claim_id, source_prescription_id, medicine_code, description, dose,
         frequency, duration, unparsed, quantity, unit_price, total_cost, service_date,
         display_order
         FROM claim_prescriptions WHERE claim_id = ?1 ORDER BY display_order ASC",
    )?;

    let rows = stmt.query_map(params![claim_id.to_string()], |row| {
        Ok(ClaimPrescription {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
            claim_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
            source_prescription_id: row
                .get::<_, Option<String>>(2)?
                .and_then(|s| Uuid::parse_str(&s).ok()),
            medicine_code: row.get(3)?,
            description: row.get(4)?,
            dose: row.get(5)?,
            frequency: row.get(6)?,
            duration: row.get(7)?,
            unparsed: row.get(8)?,
            quantity: row.get(9)?,
            unit_price: row.get(10)?,
            total_cost: row.get(11)?,
            service_date: row
                .get::<_, Option<String>>(12)?
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            display_order: row.get(13)?,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn insert_claim_procedure(conn: &Connection, proc: &ClaimProcedure) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO claim_procedures (id, claim_id, description, gdrg_code, service_date, display_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            proc.id.to_string(),
            proc.claim_id.to_string(),
            proc.description,
            proc.gdrg_code,
            proc.service_date.map(|d| d.to_string()),
            proc.display_order,
        ],
    )?;
    Ok(())
}

pub fn get_claim_procedures(
    conn: &Connection,
    claim_id: &Uuid,
) -> Result<Vec<ClaimProcedure>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, claim_id, description, gdrg_code, service_date, display_order
         FROM claim_procedures WHERE claim_id = ?1 ORDER BY display_order ASC",
    )?;

    let rows = stmt.query_map(params![claim_id.to_string()], |row| {
        Ok(ClaimProcedure {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
            claim_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
            description: row.get(2)?,
            gdrg_code: row.get(3)?,
            service_date: row
                .get::<_, Option<String>>(4)?
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            display_order: row.get(5)?,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

// Internal row type for Claim mapping
struct ClaimRow {
    id: String,
    encounter_id: String,
    claim_id: String,
    claim_check_code: String,
    physician_id: Option<String>,
    physician_name: Option<String>,
    member_no: String,
    card_serial_no: String,
    is_dependant: i32,
    type_of_service: String,
    type_of_attendance: Option<String>,
    specialty_attended: Option<String>,
    service_outcome: String,
    principal_gdrg: Option<String>,
    includes_pharmacy: i32,
    first_visit_date: Option<String>,
    second_visit_date: Option<String>,
    duration_of_spell: Option<i32>,
    status: String,
    created_by: Option<String>,
    created_at: String,
    updated_at: Option<String>,
}

fn claim_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ClaimRow, rusqlite::Error> {
    Ok(ClaimRow {
        id: row.get(0)?,
        encounter_id: row.get(1)?,
        claim_id: row.get(2)?,
        claim_check_code: row.get(3)?,
        physician_id: row.get(4)?,
        physician_name: row.get(5)?,
        member_no: row.get(6)?,
        card_serial_no: row.get(7)?,
        is_dependant: row.get(8)?,
        type_of_service: row.get(9)?,
        type_of_attendance: row.get(10)?,
        specialty_attended: row.get(11)?,
        service_outcome: row.get(12)?,
        principal_gdrg: row.get(13)?,
        includes_pharmacy: row.get(14)?,
        first_visit_date: row.get(15)?,
        second_visit_date: row.get(16)?,
        duration_of_spell: row.get(17)?,
        status: row.get(18)?,
        created_by: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
    })
}

fn claim_from_row(row: ClaimRow) -> Result<Claim, DatabaseError> {
    Ok(Claim {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        encounter_id: Uuid::parse_str(&row.encounter_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        claim_id: row.claim_id,
        claim_check_code: row.claim_check_code,
        physician_id: row.physician_id,
        physician_name: row.physician_name,
        member_no: row.member_no,
        card_serial_no: row.card_serial_no,
        is_dependant: row.is_dependant != 0,
        type_of_service: ServiceType::from_str(&row.type_of_service)?,
        type_of_attendance: row.type_of_attendance,
        specialty_attended: row.specialty_attended,
        service_outcome: row.service_outcome,
        principal_gdrg: row.principal_gdrg,
        includes_pharmacy: row.includes_pharmacy != 0,
        first_visit_date: row
            .first_visit_date
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        second_visit_date: row
            .second_visit_date
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        duration_of_spell: row.duration_of_spell,
        status: ClaimStatus::from_str(&row.status)?,
        created_by: row.created_by,
        created_at: NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
        updated_at: row
            .updated_at
            .and_then(|dt| NaiveDateTime::parse_from_str(&dt, "%Y-%m-%d %H:%M:%S").ok()),
    })
}
