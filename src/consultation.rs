//! Consultation wrap-up: diagnoses, the recorded procedure, the outcome and
//! encounter finalization.
//!
//! Saving an outcome of `recommended_for_admission` is what seeds the ward
//! pipeline: it creates (or re-targets) the encounter's admission
//! recommendation, and moving to any other outcome withdraws a
//! recommendation that is still pending. Finalization is the cash gate of
//! the outpatient episode: it raises the chief-diagnosis charges that are
//! still missing and refuses to close while positive bills are unpaid.

use chrono::Local;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::billing;
use crate::db::repository;
use crate::errors::ServiceError;
use crate::models::enums::{
    BillItemCategory, ConsultationOutcome, EncounterStatus, RecommendationStatus,
};
use crate::models::{Actor, AdmissionRecommendation, Diagnosis, Encounter};
use crate::pricing;

// ═══════════════════════════════════════════
// Request types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct NewDiagnosis {
    pub description: String,
    pub icd10_code: Option<String>,
    pub gdrg_code: Option<String>,
    #[serde(default)]
    pub is_chief: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeRequest {
    pub outcome: ConsultationOutcome,
    pub ward: Option<String>,
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

pub fn add_diagnosis(
    conn: &Connection,
    actor: &Actor,
    encounter_id: &Uuid,
    req: NewDiagnosis,
) -> Result<Diagnosis, ServiceError> {
    let encounter = open_encounter(conn, encounter_id, "add diagnosis")?;

    let diagnosis = Diagnosis {
        id: Uuid::new_v4(),
        encounter_id: encounter.id,
        description: req.description,
        icd10_code: req.icd10_code,
        gdrg_code: req.gdrg_code,
        is_chief: req.is_chief,
        created_at: Local::now().naive_local(),
    };
    repository::insert_diagnosis(conn, &diagnosis)?;
    tracing::info!(
        "Diagnosis recorded on encounter {encounter_id} by {}: {}",
        actor.id,
        diagnosis.description
    );
    Ok(diagnosis)
}

/// Record the procedure performed during the consultation. Visit dates are
/// preserved; only the procedure fields change.
pub fn record_procedure(
    conn: &Connection,
    actor: &Actor,
    encounter_id: &Uuid,
    procedure_name: &str,
    procedure_gdrg_code: Option<&str>,
) -> Result<Encounter, ServiceError> {
    let encounter = open_encounter(conn, encounter_id, "record procedure")?;

    repository::update_encounter_claim_fields(
        conn,
        &encounter.id,
        encounter.first_visit_date,
        encounter.second_visit_date,
        Some(procedure_name),
        procedure_gdrg_code,
    )?;
    tracing::info!("Procedure {procedure_name} recorded on encounter {encounter_id} by {}", actor.id);

    let updated = repository::get_encounter(conn, encounter_id)?
        .ok_or_else(|| ServiceError::not_found("Encounter", encounter_id))?;
    Ok(updated)
}

/// Save the consultation outcome. `recommended_for_admission` requires a
/// target ward and creates or re-targets the encounter's admission
/// recommendation; any other outcome withdraws a still-pending one.
pub fn save_outcome(
    conn: &Connection,
    actor: &Actor,
    encounter_id: &Uuid,
    req: OutcomeRequest,
) -> Result<Encounter, ServiceError> {
    let encounter = open_encounter(conn, encounter_id, "save outcome")?;

    let tx = conn.unchecked_transaction()?;
    repository::update_encounter_outcome(conn, &encounter.id, Some(&req.outcome))?;

    let existing = repository::get_recommendation_for_encounter(conn, &encounter.id)?;
    if req.outcome == ConsultationOutcome::RecommendedForAdmission {
        let ward = match req.ward.as_deref().map(str::trim) {
            Some(w) if !w.is_empty() => w.to_string(),
            _ => {
                return Err(ServiceError::precondition(
                    "A target ward is required to recommend admission",
                    Vec::new(),
                ));
            }
        };
        match existing {
            None => {
                repository::insert_recommendation(
                    conn,
                    &AdmissionRecommendation {
                        id: Uuid::new_v4(),
                        encounter_id: encounter.id,
                        ward,
                        status: RecommendationStatus::Pending,
                        cancelled_by: None,
                        cancelled_by_name: None,
                        cancellation_reason: None,
                        created_at: Local::now().naive_local(),
                        updated_at: None,
                    },
                )?;
            }
            Some(mut rec) => match rec.status {
                RecommendationStatus::Pending | RecommendationStatus::Cancelled => {
                    rec.ward = ward;
                    rec.status = RecommendationStatus::Pending;
                    rec.cancelled_by = None;
                    rec.cancelled_by_name = None;
                    rec.cancellation_reason = None;
                    rec.updated_at = Some(Local::now().naive_local());
                    repository::update_recommendation(conn, &rec)?;
                }
                RecommendationStatus::Confirmed => {
                    return Err(ServiceError::precondition(
                        "The admission recommendation has already been confirmed",
                        vec![rec.ward],
                    ));
                }
            },
        }
    } else if let Some(rec) = existing {
        if rec.status == RecommendationStatus::Pending {
            repository::delete_recommendation(conn, &rec.id)?;
        }
    }

    tx.commit()?;
    tracing::info!(
        "Outcome {} saved on encounter {encounter_id} by {}",
        req.outcome.as_str(),
        actor.id
    );

    let updated = repository::get_encounter(conn, encounter_id)?
        .ok_or_else(|| ServiceError::not_found("Encounter", encounter_id))?;
    Ok(updated)
}

/// Close the outpatient episode. Raises any missing chief-diagnosis charges
/// first (those commit even when finalization is then refused), then blocks
/// while positive bills remain unpaid.
pub fn finalize_encounter(
    conn: &Connection,
    actor: &Actor,
    encounter_id: &Uuid,
) -> Result<Encounter, ServiceError> {
    let encounter = open_encounter(conn, encounter_id, "finalize encounter")?;
    if encounter.outcome.is_none() {
        return Err(ServiceError::precondition(
            "A consultation outcome must be recorded before finalizing",
            Vec::new(),
        ));
    }

    let patient = repository::get_patient(conn, &encounter.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", encounter.patient_id))?;

    bill_chief_diagnoses(conn, &encounter, patient.is_insured)?;

    let unpaid = billing::unpaid_positive_bills(conn, &encounter.id)?;
    if !unpaid.is_empty() {
        return Err(ServiceError::precondition(
            "All bills must be settled before the encounter can be finalized",
            unpaid.into_iter().map(|b| b.bill_number).collect(),
        ));
    }

    repository::update_encounter_status(conn, &encounter.id, &EncounterStatus::Finalized)?;
    tracing::info!("Encounter {encounter_id} finalized by {}", actor.id);

    let updated = repository::get_encounter(conn, encounter_id)?
        .ok_or_else(|| ServiceError::not_found("Encounter", encounter_id))?;
    Ok(updated)
}

/// Raise charges for priced chief diagnoses that are not on any of the
/// encounter's bills yet. Dedup key is item code + category, so a repeated
/// finalize attempt never double-bills.
fn bill_chief_diagnoses(
    conn: &Connection,
    encounter: &Encounter,
    is_insured: bool,
) -> Result<(), ServiceError> {
    let diagnoses = repository::get_diagnoses_for_encounter(conn, &encounter.id)?;
    let billed = repository::get_bill_items_for_encounter(conn, &encounter.id)?;

    let tx = conn.unchecked_transaction()?;
    for diagnosis in diagnoses.iter().filter(|d| d.is_chief) {
        let code = match diagnosis.gdrg_code.as_deref() {
            Some(code) if !code.is_empty() => code,
            _ => continue,
        };
        let already = billed.iter().any(|item| {
            item.category == BillItemCategory::Drg && item.item_code.as_deref() == Some(code)
        });
        if already {
            continue;
        }
        let price = pricing::resolve_price(conn, code, is_insured)?;
        if price <= 0.0 {
            continue;
        }
        let bill = billing::ensure_open_bill(conn, &encounter.id, is_insured)?;
        billing::add_charge(
            conn,
            &bill,
            Some(code),
            &format!("Diagnosis: {}", diagnosis.description),
            &BillItemCategory::Drg,
            1.0,
            price,
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Fetch an encounter that is still open to clinical edits.
fn open_encounter(
    conn: &Connection,
    encounter_id: &Uuid,
    action: &'static str,
) -> Result<Encounter, ServiceError> {
    let encounter = repository::get_encounter(conn, encounter_id)?
        .ok_or_else(|| ServiceError::not_found("Encounter", encounter_id))?;
    match encounter.status {
        EncounterStatus::Finalized | EncounterStatus::Cancelled => {
            Err(ServiceError::invalid_state(action, encounter.status.as_str()))
        }
        _ => Ok(encounter),
    }
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
