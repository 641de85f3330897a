//! Ward admission lifecycle: confirming a recommendation onto a bed,
//! ward-round reviews, partial and final discharge, cancel and revert.
//!
//! Confirming an admission is the other auto-billing moment besides the
//! clinical confirms: the flat admission fee, the recorded surgery (priced
//! surgery-catalog-first) or, for cash patients without one, the chief
//! diagnosis. Final discharge is payment-gated unless the patient died or
//! absconded. The bed is claimed with a check-and-set update inside the
//! confirming transaction, so two concurrent confirms cannot share a bed.

use chrono::Local;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::billing;
use crate::consultation::NewDiagnosis;
use crate::db::repository;
use crate::errors::ServiceError;
use crate::models::enums::{
    AdmissionStatus, BillItemCategory, DischargeOutcome, RecommendationStatus,
};
use crate::models::{Actor, AdmissionRecommendation, InpatientDiagnosis, InpatientReview, WardAdmission};
use crate::pricing;

/// Flat admission fee for insured patients.
const ADMISSION_FEE_INSURED: f64 = 10.0;
/// Flat admission fee for cash patients.
const ADMISSION_FEE_CASH: f64 = 30.0;
/// Ledger code for the admission fee line, used to keep re-confirmation
/// after a revert from billing the fee twice.
const ADMISSION_FEE_CODE: &str = "ADMISSION";

// ═══════════════════════════════════════════
// Request types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmAdmission {
    pub recommendation_id: Uuid,
    pub bed_id: Uuid,
    pub doctor_id: Option<String>,
    pub doctor_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartialDischarge {
    pub outcome: DischargeOutcome,
    pub condition: Option<String>,
    pub final_orders: Option<String>,
}

// ═══════════════════════════════════════════
// Lifecycle operations
// ═══════════════════════════════════════════

/// Turn a pending recommendation into a ward admission: claims the bed,
/// raises the admission charges, and marks the recommendation confirmed.
pub fn confirm_admission(
    conn: &Connection,
    actor: &Actor,
    req: ConfirmAdmission,
) -> Result<WardAdmission, ServiceError> {
    let mut rec = repository::get_recommendation(conn, &req.recommendation_id)?
        .ok_or_else(|| ServiceError::not_found("AdmissionRecommendation", req.recommendation_id))?;
    if rec.status != RecommendationStatus::Pending {
        return Err(ServiceError::invalid_state("confirm admission", rec.status.as_str()));
    }

    let encounter = repository::get_encounter(conn, &rec.encounter_id)?
        .ok_or_else(|| ServiceError::not_found("Encounter", rec.encounter_id))?;
    let patient = repository::get_patient(conn, &encounter.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", encounter.patient_id))?;

    if let Some(active) = repository::get_active_admission_for_patient(conn, &patient.id)? {
        return Err(ServiceError::precondition(
            "Patient already has an active ward admission",
            vec![format!("{} (admitted {})", active.ward, active.admitted_at.date())],
        ));
    }

    let bed = repository::get_bed(conn, &req.bed_id)?
        .ok_or_else(|| ServiceError::not_found("Bed", req.bed_id))?;
    if bed.ward != rec.ward {
        return Err(ServiceError::precondition(
            "The selected bed is not on the recommended ward",
            vec![format!("{} {}", bed.ward, bed.bed_number)],
        ));
    }

    let tx = conn.unchecked_transaction()?;

    // Check-and-set: the update claims the bed only if it is still free.
    if !repository::occupy_bed(conn, &bed.id)? {
        return Err(ServiceError::precondition(
            "The selected bed is no longer free",
            vec![format!("{} {}", bed.ward, bed.bed_number)],
        ));
    }

    let admission = WardAdmission {
        id: Uuid::new_v4(),
        recommendation_id: rec.id,
        patient_id: patient.id,
        encounter_id: encounter.id,
        ward: rec.ward.clone(),
        bed_id: Some(bed.id),
        doctor_id: req.doctor_id,
        doctor_name: req.doctor_name,
        status: AdmissionStatus::Confirmed,
        admitted_by: actor.id.clone(),
        admitted_by_name: Some(actor.name.clone()),
        admitted_at: Local::now().naive_local(),
        partially_discharged_by: None,
        partially_discharged_by_name: None,
        partially_discharged_at: None,
        discharge_outcome: None,
        discharge_condition: None,
        final_orders: None,
        discharged_by: None,
        discharged_by_name: None,
        discharged_at: None,
    };
    repository::insert_admission(conn, &admission)?;

    rec.status = RecommendationStatus::Confirmed;
    rec.updated_at = Some(Local::now().naive_local());
    repository::update_recommendation(conn, &rec)?;

    bill_admission_charges(conn, &encounter, patient.is_insured)?;

    tx.commit()?;
    tracing::info!(
        "Patient {} admitted to {} bed {} by {}",
        patient.id,
        admission.ward,
        bed.bed_number,
        actor.id
    );
    Ok(admission)
}

/// Record a ward round. Reviews are the owners of inpatient prescriptions,
/// investigations and diagnoses.
pub fn add_review(
    conn: &Connection,
    actor: &Actor,
    admission_id: &Uuid,
    notes: Option<String>,
) -> Result<InpatientReview, ServiceError> {
    let admission = repository::get_admission(conn, admission_id)?
        .ok_or_else(|| ServiceError::not_found("WardAdmission", admission_id))?;
    if admission.status == AdmissionStatus::Discharged {
        return Err(ServiceError::invalid_state("add review", admission.status.as_str()));
    }

    let review = InpatientReview {
        id: Uuid::new_v4(),
        admission_id: admission.id,
        notes,
        reviewed_by: actor.id.clone(),
        reviewed_by_name: Some(actor.name.clone()),
        created_at: Local::now().naive_local(),
    };
    repository::insert_review(conn, &review)?;
    tracing::info!("Review recorded on admission {admission_id} by {}", actor.id);
    Ok(review)
}

pub fn add_review_diagnosis(
    conn: &Connection,
    actor: &Actor,
    review_id: &Uuid,
    req: NewDiagnosis,
) -> Result<InpatientDiagnosis, ServiceError> {
    let review = repository::get_review(conn, review_id)?
        .ok_or_else(|| ServiceError::not_found("InpatientReview", review_id))?;
    let admission = repository::get_admission(conn, &review.admission_id)?
        .ok_or_else(|| ServiceError::not_found("WardAdmission", review.admission_id))?;
    if admission.status == AdmissionStatus::Discharged {
        return Err(ServiceError::invalid_state("add diagnosis", admission.status.as_str()));
    }

    let diagnosis = InpatientDiagnosis {
        id: Uuid::new_v4(),
        review_id: review.id,
        description: req.description,
        icd10_code: req.icd10_code,
        gdrg_code: req.gdrg_code,
        is_chief: req.is_chief,
        created_at: Local::now().naive_local(),
    };
    repository::insert_inpatient_diagnosis(conn, &diagnosis)?;
    tracing::info!("Inpatient diagnosis recorded on review {review_id} by {}", actor.id);
    Ok(diagnosis)
}

/// First stage of discharge: records outcome, condition and final orders.
/// The bed stays claimed and no payment check runs yet.
pub fn partial_discharge(
    conn: &Connection,
    actor: &Actor,
    admission_id: &Uuid,
    req: PartialDischarge,
) -> Result<WardAdmission, ServiceError> {
    let mut admission = repository::get_admission(conn, admission_id)?
        .ok_or_else(|| ServiceError::not_found("WardAdmission", admission_id))?;
    if admission.status != AdmissionStatus::Confirmed {
        return Err(ServiceError::invalid_state(
            "partially discharge",
            admission.status.as_str(),
        ));
    }

    admission.status = AdmissionStatus::PartiallyDischarged;
    admission.partially_discharged_by = Some(actor.id.clone());
    admission.partially_discharged_by_name = Some(actor.name.clone());
    admission.partially_discharged_at = Some(Local::now().naive_local());
    admission.discharge_outcome = Some(req.outcome);
    admission.discharge_condition = req.condition;
    admission.final_orders = req.final_orders;
    repository::update_admission(conn, &admission)?;

    tracing::info!("Admission {admission_id} partially discharged by {}", actor.id);
    Ok(admission)
}

/// Undo a partial discharge, returning the admission to confirmed and
/// clearing the recorded outcome.
pub fn revert_partial_discharge(
    conn: &Connection,
    actor: &Actor,
    admission_id: &Uuid,
) -> Result<WardAdmission, ServiceError> {
    let mut admission = repository::get_admission(conn, admission_id)?
        .ok_or_else(|| ServiceError::not_found("WardAdmission", admission_id))?;
    if admission.status != AdmissionStatus::PartiallyDischarged {
        return Err(ServiceError::invalid_state(
            "revert partial discharge",
            admission.status.as_str(),
        ));
    }

    admission.status = AdmissionStatus::Confirmed;
    admission.partially_discharged_by = None;
    admission.partially_discharged_by_name = None;
    admission.partially_discharged_at = None;
    admission.discharge_outcome = None;
    admission.discharge_condition = None;
    admission.final_orders = None;
    repository::update_admission(conn, &admission)?;

    tracing::info!("Partial discharge reverted on admission {admission_id} by {}", actor.id);
    Ok(admission)
}

/// Final discharge. Requires a prior partial discharge and, unless the
/// recorded outcome is died or absconded, settlement of every positive
/// bill on the episode. Frees the bed.
pub fn discharge(
    conn: &Connection,
    actor: &Actor,
    admission_id: &Uuid,
) -> Result<WardAdmission, ServiceError> {
    let mut admission = repository::get_admission(conn, admission_id)?
        .ok_or_else(|| ServiceError::not_found("WardAdmission", admission_id))?;
    if admission.status != AdmissionStatus::PartiallyDischarged {
        return Err(ServiceError::invalid_state("discharge", admission.status.as_str()));
    }

    let exempt = matches!(
        admission.discharge_outcome,
        Some(DischargeOutcome::Died) | Some(DischargeOutcome::Absconded)
    );
    if !exempt {
        let unpaid = billing::unpaid_positive_bills(conn, &admission.encounter_id)?;
        if !unpaid.is_empty() {
            return Err(ServiceError::precondition(
                "All bills must be settled before discharge",
                unpaid.into_iter().map(|b| b.bill_number).collect(),
            ));
        }
    }

    let tx = conn.unchecked_transaction()?;
    if let Some(bed_id) = admission.bed_id {
        repository::release_bed(conn, &bed_id)?;
    }
    admission.status = AdmissionStatus::Discharged;
    admission.discharged_by = Some(actor.id.clone());
    admission.discharged_by_name = Some(actor.name.clone());
    admission.discharged_at = Some(Local::now().naive_local());
    repository::update_admission(conn, &admission)?;
    tx.commit()?;

    tracing::info!("Admission {admission_id} discharged by {}", actor.id);
    Ok(admission)
}

/// Cancel a still-pending recommendation. The reason is mandatory.
pub fn cancel_recommendation(
    conn: &Connection,
    actor: &Actor,
    recommendation_id: &Uuid,
    reason: &str,
) -> Result<AdmissionRecommendation, ServiceError> {
    if reason.trim().is_empty() {
        return Err(ServiceError::precondition(
            "A cancellation reason is required",
            Vec::new(),
        ));
    }

    let mut rec = repository::get_recommendation(conn, recommendation_id)?
        .ok_or_else(|| ServiceError::not_found("AdmissionRecommendation", recommendation_id))?;
    if rec.status != RecommendationStatus::Pending {
        return Err(ServiceError::invalid_state("cancel recommendation", rec.status.as_str()));
    }

    rec.status = RecommendationStatus::Cancelled;
    rec.cancelled_by = Some(actor.id.clone());
    rec.cancelled_by_name = Some(actor.name.clone());
    rec.cancellation_reason = Some(reason.into());
    rec.updated_at = Some(Local::now().naive_local());
    repository::update_recommendation(conn, &rec)?;

    tracing::info!("Recommendation {recommendation_id} cancelled by {}: {reason}", actor.id);
    Ok(rec)
}

/// Undo a confirmed admission before any discharge activity: frees the bed,
/// removes the admission and returns the recommendation to pending. The
/// auto-billed charges stay on the ledger; reconciling money is a deliberate
/// staff action.
pub fn revert_admission(
    conn: &Connection,
    actor: &Actor,
    admission_id: &Uuid,
) -> Result<AdmissionRecommendation, ServiceError> {
    let admission = repository::get_admission(conn, admission_id)?
        .ok_or_else(|| ServiceError::not_found("WardAdmission", admission_id))?;
    if admission.status != AdmissionStatus::Confirmed {
        return Err(ServiceError::invalid_state("revert admission", admission.status.as_str()));
    }

    let mut rec = repository::get_recommendation(conn, &admission.recommendation_id)?
        .ok_or_else(|| {
            ServiceError::not_found("AdmissionRecommendation", admission.recommendation_id)
        })?;

    let tx = conn.unchecked_transaction()?;
    if let Some(bed_id) = admission.bed_id {
        repository::release_bed(conn, &bed_id)?;
    }
    repository::delete_admission(conn, &admission.id)?;

    rec.status = RecommendationStatus::Pending;
    rec.cancelled_by = None;
    rec.cancelled_by_name = None;
    rec.cancellation_reason = None;
    rec.updated_at = Some(Local::now().naive_local());
    repository::update_recommendation(conn, &rec)?;
    tx.commit()?;

    tracing::info!("Admission {admission_id} reverted by {}", actor.id);
    Ok(rec)
}

// ═══════════════════════════════════════════
// Admission auto-bill
// ═══════════════════════════════════════════

/// Admission fee plus the surgery charge for a recorded procedure, or the
/// chief-diagnosis charge for cash patients without one. Every line is
/// dedup-checked by code and category so a revert/re-confirm cycle cannot
/// double-bill, and the bill total is recomputed from its items at the end.
fn bill_admission_charges(
    conn: &Connection,
    encounter: &crate::models::Encounter,
    is_insured: bool,
) -> Result<(), ServiceError> {
    let billed = repository::get_bill_items_for_encounter(conn, &encounter.id)?;
    let already = |code: &str, category: &BillItemCategory| {
        billed
            .iter()
            .any(|item| item.category == *category && item.item_code.as_deref() == Some(code))
    };

    let bill = billing::ensure_open_bill(conn, &encounter.id, is_insured)?;

    let fee = if is_insured { ADMISSION_FEE_INSURED } else { ADMISSION_FEE_CASH };
    if !already(ADMISSION_FEE_CODE, &BillItemCategory::Service) {
        billing::add_charge(
            conn,
            &bill,
            Some(ADMISSION_FEE_CODE),
            "Admission fee",
            &BillItemCategory::Service,
            1.0,
            fee,
        )?;
    }

    let surgery_code = encounter
        .procedure_gdrg_code
        .as_deref()
        .filter(|c| !c.is_empty());
    if let Some(code) = surgery_code {
        if !already(code, &BillItemCategory::Surgery) {
            let price = pricing::resolve_surgery_price(conn, code, is_insured)?;
            if price > 0.0 {
                let name = encounter.procedure_name.as_deref().unwrap_or(code);
                billing::add_charge(
                    conn,
                    &bill,
                    Some(code),
                    &format!("Surgery: {name}"),
                    &BillItemCategory::Surgery,
                    1.0,
                    price,
                )?;
            }
        }
    } else if !is_insured {
        let diagnoses = repository::get_diagnoses_for_encounter(conn, &encounter.id)?;
        let chief = diagnoses
            .iter()
            .find(|d| d.is_chief && d.gdrg_code.as_deref().is_some_and(|c| !c.is_empty()));
        if let Some(diagnosis) = chief {
            let code = diagnosis.gdrg_code.as_deref().unwrap_or_default();
            if !already(code, &BillItemCategory::Drg) {
                let price = pricing::resolve_price(conn, code, is_insured)?;
                if price > 0.0 {
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
            }
        }
    }

    billing::recompute_bill_total(conn, &bill.id)?;
    Ok(())
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
