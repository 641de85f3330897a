use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{AdmissionStatus, DischargeOutcome, RecommendationStatus};
use crate::models::{AdmissionRecommendation, Bed, InpatientDiagnosis, InpatientReview, WardAdmission};

pub fn insert_bed(conn: &Connection, bed: &Bed) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO beds (id, ward, bed_number, is_occupied, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            bed.id.to_string(),
            bed.ward,
            bed.bed_number,
            bed.is_occupied as i32,
            bed.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_bed(conn: &Connection, id: &Uuid) -> Result<Option<Bed>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, ward, bed_number, is_occupied, is_active FROM beds WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i32>(3)?,
            row.get::<_, i32>(4)?,
        ))
    });

    match result {
        Ok((id, ward, bed_number, is_occupied, is_active)) => Ok(Some(Bed {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            ward,
            bed_number,
            is_occupied: is_occupied != 0,
            is_active: is_active != 0,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_beds_for_ward(conn: &Connection, ward: &str) -> Result<Vec<Bed>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, ward, bed_number, is_occupied, is_active
         FROM beds WHERE ward = ?1 AND is_active = 1 ORDER BY bed_number ASC",
    )?;

    let rows = stmt.query_map(params![ward], |row| {
        Ok(Bed {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
            ward: row.get(1)?,
            bed_number: row.get(2)?,
            is_occupied: row.get::<_, i32>(3)? != 0,
            is_active: row.get::<_, i32>(4)? != 0,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Atomically claim a bed. Returns false when the bed was already occupied
/// or inactive; the caller must then abort its admission.
pub fn occupy_bed(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "UPDATE beds SET is_occupied = 1 WHERE id = ?1 AND is_occupied = 0 AND is_active = 1",
        params![id.to_string()],
    )?;
    Ok(rows == 1)
}

pub fn release_bed(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE beds SET is_occupied = 0 WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(())
}

pub fn insert_recommendation(
    conn: &Connection,
    rec: &AdmissionRecommendation,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO admission_recommendations (id, encounter_id, ward, status, cancelled_by,
         cancelled_by_name, cancellation_reason, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            rec.id.to_string(),
            rec.encounter_id.to_string(),
            rec.ward,
            rec.status.as_str(),
            rec.cancelled_by,
            rec.cancelled_by_name,
            rec.cancellation_reason,
            rec.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            rec.updated_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_recommendation(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<AdmissionRecommendation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, encounter_id, ward, status, cancelled_by, cancelled_by_name,
         cancellation_reason, created_at, updated_at
         FROM admission_recommendations WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(recommendation_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(recommendation_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_recommendation_for_encounter(
    conn: &Connection,
    encounter_id: &Uuid,
) -> Result<Option<AdmissionRecommendation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, encounter_id, ward, status, cancelled_by, cancelled_by_name,
         cancellation_reason, created_at, updated_at
         FROM admission_recommendations WHERE encounter_id = ?1",
    )?;

    let result = stmt.query_row(params![encounter_id.to_string()], |row| {
        Ok(recommendation_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(recommendation_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_recommendation(
    conn: &Connection,
    rec: &AdmissionRecommendation,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE admission_recommendations SET ward = ?2, status = ?3, cancelled_by = ?4,
         cancelled_by_name = ?5, cancellation_reason = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            rec.id.to_string(),
            rec.ward,
            rec.status.as_str(),
            rec.cancelled_by,
            rec.cancelled_by_name,
            rec.cancellation_reason,
            rec.updated_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("AdmissionRecommendation", rec.id));
    }
    Ok(())
}

pub fn delete_recommendation(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM admission_recommendations WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(())
}

pub fn insert_admission(conn: &Connection, adm: &WardAdmission) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO ward_admissions (id, recommendation_id, patient_id, encounter_id, ward,
         bed_id, doctor_id, doctor_name, status, admitted_by, admitted_by_name, admitted_at,
         partially_discharged_by, partially_discharged_by_name, partially_discharged_at,
         discharge_outcome, discharge_condition, final_orders,
         discharged_by, discharged_by_name, discharged_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21)",
        params![
            adm.id.to_string(),
            adm.recommendation_id.to_string(),
            adm.patient_id.to_string(),
            adm.encounter_id.to_string(),
            adm.ward,
            adm.bed_id.map(|id| id.to_string()),
            adm.doctor_id,
            adm.doctor_name,
            adm.status.as_str(),
            adm.admitted_by,
            adm.admitted_by_name,
            adm.admitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            adm.partially_discharged_by,
            adm.partially_discharged_by_name,
            adm.partially_discharged_at
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            adm.discharge_outcome.as_ref().map(|o| o.as_str()),
            adm.discharge_condition,
            adm.final_orders,
            adm.discharged_by,
            adm.discharged_by_name,
            adm.discharged_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        ],
    )?;
    Ok(())
}

const ADMISSION_COLUMNS: &str = "id, recommendation_id, patient_id, encounter_id, ward, bed_id,
    doctor_id, doctor_name, status, admitted_by, admitted_by_name, admitted_at,
    partially_discharged_by, partially_discharged_by_name, partially_discharged_at,
    discharge_outcome, discharge_condition, final_orders,
    discharged_by, discharged_by_name, discharged_at";

pub fn get_admission(conn: &Connection, id: &Uuid) -> Result<Option<WardAdmission>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADMISSION_COLUMNS} FROM ward_admissions WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(admission_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(admission_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_admission_for_encounter(
    conn: &Connection,
    encounter_id: &Uuid,
) -> Result<Option<WardAdmission>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADMISSION_COLUMNS} FROM ward_admissions WHERE encounter_id = ?1 LIMIT 1"
    ))?;

    let result = stmt.query_row(params![encounter_id.to_string()], |row| {
        Ok(admission_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(admission_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// The patient's current admission, if any. Discharged stays in history and
/// does not count.
pub fn get_active_admission_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<WardAdmission>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADMISSION_COLUMNS} FROM ward_admissions
         WHERE patient_id = ?1 AND status != 'discharged' LIMIT 1"
    ))?;

    let result = stmt.query_row(params![patient_id.to_string()], |row| {
        Ok(admission_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(admission_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Discharged admissions whose encounter has no claim yet, oldest first.
pub fn get_unclaimed_discharged_admissions(
    conn: &Connection,
) -> Result<Vec<WardAdmission>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADMISSION_COLUMNS} FROM ward_admissions w
         WHERE w.status = 'discharged'
           AND NOT EXISTS (SELECT 1 FROM claims c WHERE c.encounter_id = w.encounter_id)
         ORDER BY w.admitted_at ASC"
    ))?;

    let rows = stmt.query_map([], |row| Ok(admission_row_from_rusqlite(row)))?;

    let mut admissions = Vec::new();
    for row in rows {
        admissions.push(admission_from_row(row??)?);
    }
    Ok(admissions)
}

pub fn update_admission(conn: &Connection, adm: &WardAdmission) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE ward_admissions SET status = ?2,
         partially_discharged_by = ?3, partially_discharged_by_name = ?4, partially_discharged_at = ?5,
         discharge_outcome = ?6, discharge_condition = ?7, final_orders = ?8,
         discharged_by = ?9, discharged_by_name = ?10, discharged_at = ?11
         WHERE id = ?1",
        params![
            adm.id.to_string(),
            adm.status.as_str(),
            adm.partially_discharged_by,
            adm.partially_discharged_by_name,
            adm.partially_discharged_at
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            adm.discharge_outcome.as_ref().map(|o| o.as_str()),
            adm.discharge_condition,
            adm.final_orders,
            adm.discharged_by,
            adm.discharged_by_name,
            adm.discharged_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("WardAdmission", adm.id));
    }
    Ok(())
}

pub fn delete_admission(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "DELETE FROM ward_admissions WHERE id = ?1",
        params![id.to_string()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("WardAdmission", id));
    }
    Ok(())
}

pub fn insert_review(conn: &Connection, review: &InpatientReview) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO inpatient_reviews (id, admission_id, notes, reviewed_by, reviewed_by_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            review.id.to_string(),
            review.admission_id.to_string(),
            review.notes,
            review.reviewed_by,
            review.reviewed_by_name,
            review.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_review(conn: &Connection, id: &Uuid) -> Result<Option<InpatientReview>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, admission_id, notes, reviewed_by, reviewed_by_name, created_at
         FROM inpatient_reviews WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
        ))
    });

    match result {
        Ok((id, admission_id, notes, reviewed_by, reviewed_by_name, created_at)) => {
            Ok(Some(InpatientReview {
                id: Uuid::parse_str(&id)
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
                admission_id: Uuid::parse_str(&admission_id)
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
                notes,
                reviewed_by,
                reviewed_by_name,
                created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S")
                    .unwrap_or_default(),
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_reviews_for_admission(
    conn: &Connection,
    admission_id: &Uuid,
) -> Result<Vec<InpatientReview>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, admission_id, notes, reviewed_by, reviewed_by_name, created_at
         FROM inpatient_reviews WHERE admission_id = ?1 ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![admission_id.to_string()], |row| {
        Ok(InpatientReview {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
            admission_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
            notes: row.get(2)?,
            reviewed_by: row.get(3)?,
            reviewed_by_name: row.get(4)?,
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(5)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .unwrap_or_default(),
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn insert_inpatient_diagnosis(
    conn: &Connection,
    diag: &InpatientDiagnosis,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO inpatient_diagnoses (id, review_id, description, icd10_code, gdrg_code,
         is_chief, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            diag.id.to_string(),
            diag.review_id.to_string(),
            diag.description,
            diag.icd10_code,
            diag.gdrg_code,
            diag.is_chief as i32,
            diag.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_inpatient_diagnoses_for_review(
    conn: &Connection,
    review_id: &Uuid,
) -> Result<Vec<InpatientDiagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, review_id, description, icd10_code, gdrg_code, is_chief, created_at
         FROM inpatient_diagnoses WHERE review_id = ?1 ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![review_id.to_string()], |row| {
        Ok(inpatient_diagnosis_from_rusqlite(row))
    })?;

    let mut diagnoses = Vec::new();
    for row in rows {
        diagnoses.push(row??);
    }
    Ok(diagnoses)
}

/// All ward-round diagnoses under an admission, in review order.
pub fn get_inpatient_diagnoses_for_admission(
    conn: &Connection,
    admission_id: &Uuid,
) -> Result<Vec<InpatientDiagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.review_id, d.description, d.icd10_code, d.gdrg_code, d.is_chief, d.created_at
         FROM inpatient_diagnoses d JOIN inpatient_reviews r ON r.id = d.review_id
         WHERE r.admission_id = ?1 ORDER BY r.created_at ASC, d.created_at ASC",
    )?;

    let rows = stmt.query_map(params![admission_id.to_string()], |row| {
        Ok(inpatient_diagnosis_from_rusqlite(row))
    })?;

    let mut diagnoses = Vec::new();
    for row in rows {
        diagnoses.push(row??);
    }
    Ok(diagnoses)
}

fn inpatient_diagnosis_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<InpatientDiagnosis, rusqlite::Error> {
    Ok(InpatientDiagnosis {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
        review_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
        description: row.get(2)?,
        icd10_code: row.get(3)?,
        gdrg_code: row.get(4)?,
        is_chief: row.get::<_, i32>(5)? != 0,
        created_at: NaiveDateTime::parse_from_str(&row.get::<_, String>(6)?, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}

// Internal row type for AdmissionRecommendation mapping
struct RecommendationRow {
    id: String,
    encounter_id: String,
    ward: String,
    status: String,
    cancelled_by: Option<String>,
    cancelled_by_name: Option<String>,
    cancellation_reason: Option<String>,
    created_at: String,
    updated_at: Option<String>,
}

fn recommendation_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<RecommendationRow, rusqlite::Error> {
    Ok(RecommendationRow {
        id: row.get(0)?,
        encounter_id: row.get(1)?,
        ward: row.get(2)?,
        status: row.get(3)?,
        cancelled_by: row.get(4)?,
        cancelled_by_name: row.get(5)?,
        cancellation_reason: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn recommendation_from_row(
    row: RecommendationRow,
) -> Result<AdmissionRecommendation, DatabaseError> {
    Ok(AdmissionRecommendation {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        encounter_id: Uuid::parse_str(&row.encounter_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        ward: row.ward,
        status: RecommendationStatus::from_str(&row.status)?,
        cancelled_by: row.cancelled_by,
        cancelled_by_name: row.cancelled_by_name,
        cancellation_reason: row.cancellation_reason,
        created_at: NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
        updated_at: row
            .updated_at
            .and_then(|dt| NaiveDateTime::parse_from_str(&dt, "%Y-%m-%d %H:%M:%S").ok()),
    })
}

// Internal row type for WardAdmission mapping
struct AdmissionRow {
    id: String,
    recommendation_id: String,
    patient_id: String,
    encounter_id: String,
    ward: String,
    bed_id: Option<String>,
    doctor_id: Option<String>,
    doctor_name: Option<String>,
    status: String,
    admitted_by: String,
    admitted_by_name: Option<String>,
    admitted_at: String,
    partially_discharged_by: Option<String>,
    partially_discharged_by_name: Option<String>,
    partially_discharged_at: Option<String>,
    discharge_outcome: Option<String>,
    discharge_condition: Option<String>,
    final_orders: Option<String>,
    discharged_by: Option<String>,
    discharged_by_name: Option<String>,
    discharged_at: Option<String>,
}

fn admission_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<AdmissionRow, rusqlite::Error> {
    Ok(AdmissionRow {
        id: row.get(0)?,
        recommendation_id: row.get(1)?,
        patient_id: row.get(2)?,
        encounter_id: row.get(3)?,
        ward: row.get(4)?,
        bed_id: row.get(5)?,
        doctor_id: row.get(6)?,
        doctor_name: row.get(7)?,
        status: row.get(8)?,
        admitted_by: row.get(9)?,
        admitted_by_name: row.get(10)?,
        admitted_at: row.get(11)?,
        partially_discharged_by: row.get(12)?,
        partially_discharged_by_name: row.get(13)?,
        partially_discharged_at: row.get(14)?,
        discharge_outcome: row.get(15)?,
        discharge_condition: row.get(16)?,
        final_orders: row.get(17)?,
        discharged_by: row.get(18)?,
        discharged_by_name: row.get(19)?,
        discharged_at: row.get(20)?,
    })
}

fn admission_from_row(row: AdmissionRow) -> Result<WardAdmission, DatabaseError> {
    let discharge_outcome = match row.discharge_outcome {
        Some(s) => Some(DischargeOutcome::from_str(&s)?),
        None => None,
    };
    Ok(WardAdmission {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        recommendation_id: Uuid::parse_str(&row.recommendation_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: Uuid::parse_str(&row.patient_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        encounter_id: Uuid::parse_str(&row.encounter_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        ward: row.ward,
        bed_id: row.bed_id.and_then(|s| Uuid::parse_str(&s).ok()),
        doctor_id: row.doctor_id,
        doctor_name: row.doctor_name,
        status: AdmissionStatus::from_str(&row.status)?,
        admitted_by: row.admitted_by,
        admitted_by_name: row.admitted_by_name,
        admitted_at: NaiveDateTime::parse_from_str(&row.admitted_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
        partially_discharged_by: row.partially_discharged_by,
        partially_discharged_by_name: row.partially_discharged_by_name,
        partially_discharged_at: row
            .partially_discharged_at
            .and_then(|dt| NaiveDateTime::parse_from_str(&dt, "%Y-%m-%d %H:%M:%S").ok()),
        discharge_outcome,
        discharge_condition: row.discharge_condition,
        final_orders: row.final_orders,
        discharged_by: row.discharged_by,
        discharged_by_name: row.discharged_by_name,
        discharged_at: row
            .discharged_at
            .and_then(|dt| NaiveDateTime::parse_from_str(&dt, "%Y-%m-%d %H:%M:%S").ok()),
    })
}
