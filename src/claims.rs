//! NHIA claim aggregation: generation from finalized encounters (OPD) and
//! discharged ward admissions (IPD), regeneration, clerk edits, finalize and
//! reopen, plus the eligible-sources listing for the claims desk.
//!
//! Claim detail rows are point-in-time snapshots of the clinical records.
//! Once any diagnosis snapshot exists the claim counts as hand-edited and
//! the stored rows are served verbatim, even where a collection was
//! deliberately emptied.

use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::errors::ServiceError;
use crate::models::enums::{
    AdmissionStatus, CareSetting, ClaimStatus, ConsultationOutcome, DischargeOutcome,
    EncounterStatus, InvestigationStatus, InvestigationType, ServiceType, StaffRole,
};
use crate::models::{
    Actor, Claim, ClaimDiagnosis, ClaimInvestigation, ClaimPrescription, ClaimProcedure,
    Encounter, Investigation, Prescription, PrescriptionState, WardAdmission,
};
use crate::pricing;

const MAX_ID_ATTEMPTS: usize = 20;

// NHIA form caps for outpatient claims. Inpatient claims are uncapped.
const OPD_MAX_DIAGNOSES: usize = 4;
const OPD_MAX_INVESTIGATIONS: usize = 5;
const OPD_MAX_PRESCRIPTIONS: usize = 5;

// ═══════════════════════════════════════════
// Request and view types
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateClaim {
    /// Encounter id for OPD, ward admission id for IPD.
    pub source_id: Uuid,
    pub service_type: ServiceType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosisEntry {
    pub description: String,
    pub icd10_code: Option<String>,
    #[serde(default)]
    pub gdrg_code: String,
    #[serde(default)]
    pub is_chief: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvestigationEntry {
    pub description: String,
    #[serde(default)]
    pub gdrg_code: String,
    pub investigation_type: Option<InvestigationType>,
    pub service_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionEntry {
    #[serde(default)]
    pub medicine_code: String,
    pub description: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub unparsed: Option<String>,
    pub quantity: f64,
    pub service_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcedureEntry {
    pub description: String,
    #[serde(default)]
    pub gdrg_code: String,
    pub service_date: Option<NaiveDate>,
}

/// Clerk edit payload. The four collections replace the stored snapshots
/// wholesale; an empty list empties the collection.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimUpdate {
    pub physician_id: Option<String>,
    pub physician_name: Option<String>,
    #[serde(default)]
    pub is_dependant: bool,
    pub type_of_attendance: Option<String>,
    pub specialty_attended: Option<String>,
    pub service_outcome: String,
    pub first_visit_date: Option<NaiveDate>,
    pub second_visit_date: Option<NaiveDate>,
    pub duration_of_spell: Option<i32>,
    #[serde(default)]
    pub diagnoses: Vec<DiagnosisEntry>,
    #[serde(default)]
    pub investigations: Vec<InvestigationEntry>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionEntry>,
    #[serde(default)]
    pub procedures: Vec<ProcedureEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimEditView {
    pub claim: Claim,
    pub patient_name: String,
    pub hand_edited: bool,
    pub diagnoses: Vec<ClaimDiagnosis>,
    pub investigations: Vec<ClaimInvestigation>,
    pub prescriptions: Vec<ClaimPrescription>,
    pub procedures: Vec<ClaimProcedure>,
    pub investigations_amount: f64,
    pub pharmacy_amount: f64,
    pub procedure_amount: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EligibleFilter {
    pub service_type: Option<ServiceType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub claimed: Option<bool>,
    pub card_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EligibleSource {
    pub source_id: Uuid,
    pub encounter_id: Uuid,
    pub service_type: ServiceType,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub card_number: Option<String>,
    pub date: NaiveDate,
    pub claim_id: Option<String>,
    pub claim_status: Option<ClaimStatus>,
}

// ═══════════════════════════════════════════
// Generation
// ═══════════════════════════════════════════

pub fn generate_claim(
    conn: &Connection,
    actor: &Actor,
    req: GenerateClaim,
) -> Result<Claim, ServiceError> {
    let (encounter, admission) = match req.service_type {
        ServiceType::Opd => {
            let encounter = repository::get_encounter(conn, &req.source_id)?
                .ok_or_else(|| ServiceError::not_found("Encounter", req.source_id))?;
            if encounter.status != EncounterStatus::Finalized {
                return Err(ServiceError::invalid_state(
                    "generate claim",
                    encounter.status.as_str(),
                ));
            }
            (encounter, None)
        }
        ServiceType::Ipd => {
            let admission = repository::get_admission(conn, &req.source_id)?
                .ok_or_else(|| ServiceError::not_found("WardAdmission", req.source_id))?;
            if admission.status != AdmissionStatus::Discharged {
                return Err(ServiceError::invalid_state(
                    "generate claim",
                    admission.status.as_str(),
                ));
            }
            let encounter = repository::get_encounter(conn, &admission.encounter_id)?
                .ok_or_else(|| ServiceError::not_found("Encounter", admission.encounter_id))?;
            (encounter, Some(admission))
        }
    };

    if let Some(existing) = repository::get_claim_for_encounter(conn, &encounter.id)? {
        return Err(ServiceError::precondition(
            "A claim already exists for this episode",
            vec![existing.claim_id],
        ));
    }

    let unpaid = billing::unpaid_positive_bills(conn, &encounter.id)?;
    if !unpaid.is_empty() {
        return Err(ServiceError::precondition(
            "All bills must be settled before a claim can be generated",
            unpaid.into_iter().map(|b| b.bill_number).collect(),
        ));
    }

    let patient = repository::get_patient(conn, &encounter.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", encounter.patient_id))?;

    let records = collect_source_records(conn, &encounter, admission.as_ref())?;

    if req.service_type == ServiceType::Opd {
        let open: Vec<String> = records
            .investigations
            .iter()
            .filter(|inv| {
                inv.gdrg_code.as_deref().is_some_and(|c| !c.is_empty())
                    && inv.status != InvestigationStatus::Completed
                    && inv.status != InvestigationStatus::Cancelled
            })
            .map(investigation_description)
            .collect();
        if !open.is_empty() {
            return Err(ServiceError::precondition(
                "Coded investigations must be completed or cancelled before claiming",
                open,
            ));
        }
    }

    let claim = Claim {
        id: Uuid::new_v4(),
        encounter_id: encounter.id,
        claim_id: generate_claim_external_id(conn)?,
        claim_check_code: generate_check_code(),
        physician_id: admission.as_ref().and_then(|a| a.doctor_id.clone()),
        physician_name: admission.as_ref().and_then(|a| a.doctor_name.clone()),
        member_no: patient.insurance_id.clone().unwrap_or_default(),
        card_serial_no: patient.card_number.clone().unwrap_or_default(),
        is_dependant: false,
        type_of_service: req.service_type.clone(),
        type_of_attendance: None,
        specialty_attended: None,
        service_outcome: derive_service_outcome(&encounter, admission.as_ref()),
        principal_gdrg: principal_from_source(&records.diagnoses),
        includes_pharmacy: has_dispensed(&records.prescriptions),
        first_visit_date: encounter.first_visit_date,
        second_visit_date: encounter.second_visit_date,
        duration_of_spell: admission.as_ref().and_then(spell_duration),
        status: ClaimStatus::Draft,
        created_by: Some(actor.id.clone()),
        created_at: Local::now().naive_local(),
        updated_at: None,
    };

    let details =
        build_detail_rows(conn, &claim.id, &records, &claim.type_of_service, patient.is_insured)?;

    let tx = conn.unchecked_transaction()?;
    repository::insert_claim(conn, &claim)?;
    insert_detail_rows(conn, &details)?;
    tx.commit()?;

    tracing::info!(
        "Claim {} ({}) generated for encounter {} by {}",
        claim.claim_id,
        claim.type_of_service.as_str(),
        encounter.id,
        actor.id
    );
    Ok(claim)
}

/// Wipe and rebuild the snapshot collections from the live clinical records.
/// Only draft and reopened claims may be regenerated.
pub fn regenerate_claim(
    conn: &Connection,
    actor: &Actor,
    claim_id: &Uuid,
) -> Result<Claim, ServiceError> {
    let mut claim = repository::get_claim(conn, claim_id)?
        .ok_or_else(|| ServiceError::not_found("Claim", claim_id))?;
    if claim.status == ClaimStatus::Finalized {
        return Err(ServiceError::invalid_state("regenerate claim", claim.status.as_str()));
    }

    let encounter = repository::get_encounter(conn, &claim.encounter_id)?
        .ok_or_else(|| ServiceError::not_found("Encounter", claim.encounter_id))?;
    let patient = repository::get_patient(conn, &encounter.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", encounter.patient_id))?;
    let admission = match claim.type_of_service {
        ServiceType::Ipd => repository::get_admission_for_encounter(conn, &encounter.id)?,
        ServiceType::Opd => None,
    };

    let records = collect_source_records(conn, &encounter, admission.as_ref())?;
    let details =
        build_detail_rows(conn, &claim.id, &records, &claim.type_of_service, patient.is_insured)?;

    claim.principal_gdrg = principal_from_source(&records.diagnoses);
    claim.includes_pharmacy = has_dispensed(&records.prescriptions);
    claim.updated_at = Some(Local::now().naive_local());

    let tx = conn.unchecked_transaction()?;
    repository::delete_claim_details(conn, &claim.id)?;
    insert_detail_rows(conn, &details)?;
    repository::update_claim(conn, &claim)?;
    tx.commit()?;

    tracing::info!("Claim {} regenerated by {}", claim.claim_id, actor.id);
    Ok(claim)
}

// ═══════════════════════════════════════════
// Edit view and detailed update
// ═══════════════════════════════════════════

/// Assemble the claim form. Hand-edited claims serve their stored snapshot
/// rows; otherwise the rows are derived fresh from the source records
/// without being persisted.
pub fn claim_edit_view(conn: &Connection, claim_id: &Uuid) -> Result<ClaimEditView, ServiceError> {
    let claim = repository::get_claim(conn, claim_id)?
        .ok_or_else(|| ServiceError::not_found("Claim", claim_id))?;
    let encounter = repository::get_encounter(conn, &claim.encounter_id)?
        .ok_or_else(|| ServiceError::not_found("Encounter", claim.encounter_id))?;
    let patient = repository::get_patient(conn, &encounter.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", encounter.patient_id))?;

    let hand_edited = repository::has_claim_diagnoses(conn, &claim.id)?;
    let (diagnoses, investigations, prescriptions, procedures) = if hand_edited {
        (
            repository::get_claim_diagnoses(conn, &claim.id)?,
            repository::get_claim_investigations(conn, &claim.id)?,
            repository::get_claim_prescriptions(conn, &claim.id)?,
            repository::get_claim_procedures(conn, &claim.id)?,
        )
    } else {
        let admission = match claim.type_of_service {
            ServiceType::Ipd => repository::get_admission_for_encounter(conn, &encounter.id)?,
            ServiceType::Opd => None,
        };
        let records = collect_source_records(conn, &encounter, admission.as_ref())?;
        let rows = build_detail_rows(
            conn,
            &claim.id,
            &records,
            &claim.type_of_service,
            patient.is_insured,
        )?;
        (rows.diagnoses, rows.investigations, rows.prescriptions, rows.procedures)
    };

    let mut investigations_amount = 0.0;
    for inv in &investigations {
        investigations_amount +=
            pricing::resolve_claim_amount(conn, &inv.gdrg_code, patient.is_insured)?;
    }
    let pharmacy_amount = prescriptions.iter().map(|rx| rx.total_cost).sum();
    let mut procedure_amount = 0.0;
    for proc in &procedures {
        procedure_amount +=
            pricing::resolve_claim_amount(conn, &proc.gdrg_code, patient.is_insured)?;
    }

    Ok(ClaimEditView {
        claim,
        patient_name: patient.name,
        hand_edited,
        diagnoses,
        investigations,
        prescriptions,
        procedures,
        investigations_amount,
        pharmacy_amount,
        procedure_amount,
    })
}

/// Replace the snapshot collections and header fields from a clerk edit.
/// Rows with blank descriptions are dropped. Visit dates and the first
/// procedure flow back down to the source encounter; an emptied procedures
/// list clears the encounter's recorded procedure. A finalized claim
/// reopens implicitly.
pub fn update_claim_details(
    conn: &Connection,
    actor: &Actor,
    claim_id: &Uuid,
    update: ClaimUpdate,
) -> Result<Claim, ServiceError> {
    let mut claim = repository::get_claim(conn, claim_id)?
        .ok_or_else(|| ServiceError::not_found("Claim", claim_id))?;
    let encounter = repository::get_encounter(conn, &claim.encounter_id)?
        .ok_or_else(|| ServiceError::not_found("Encounter", claim.encounter_id))?;
    let patient = repository::get_patient(conn, &encounter.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", encounter.patient_id))?;

    if claim.status == ClaimStatus::Finalized {
        claim.status = ClaimStatus::Reopened;
    }

    let diagnoses: Vec<&DiagnosisEntry> = update
        .diagnoses
        .iter()
        .filter(|d| !d.description.trim().is_empty())
        .collect();
    let investigations: Vec<&InvestigationEntry> = update
        .investigations
        .iter()
        .filter(|i| !i.description.trim().is_empty())
        .collect();
    let prescriptions: Vec<&PrescriptionEntry> = update
        .prescriptions
        .iter()
        .filter(|p| !p.description.trim().is_empty())
        .collect();
    let procedures: Vec<&ProcedureEntry> = update
        .procedures
        .iter()
        .filter(|p| !p.description.trim().is_empty())
        .collect();

    claim.physician_id = update.physician_id.clone();
    claim.physician_name = update.physician_name.clone();
    claim.is_dependant = update.is_dependant;
    claim.type_of_attendance = update.type_of_attendance.clone();
    claim.specialty_attended = update.specialty_attended.clone();
    claim.service_outcome = update.service_outcome.clone();
    claim.first_visit_date = update.first_visit_date;
    claim.second_visit_date = update.second_visit_date;
    claim.duration_of_spell = update.duration_of_spell;
    claim.includes_pharmacy = !prescriptions.is_empty();
    claim.principal_gdrg = diagnoses
        .iter()
        .find(|d| d.is_chief)
        .or_else(|| diagnoses.first())
        .map(|d| d.gdrg_code.clone())
        .filter(|c| !c.is_empty());
    claim.updated_at = Some(Local::now().naive_local());

    let tx = conn.unchecked_transaction()?;
    repository::delete_claim_details(conn, &claim.id)?;

    for (i, entry) in diagnoses.iter().enumerate() {
        repository::insert_claim_diagnosis(
            conn,
            &ClaimDiagnosis {
                id: Uuid::new_v4(),
                claim_id: claim.id,
                source_diagnosis_id: None,
                description: entry.description.clone(),
                icd10_code: entry.icd10_code.clone(),
                gdrg_code: entry.gdrg_code.clone(),
                is_chief: entry.is_chief,
                display_order: i as i32,
            },
        )?;
    }
    for (i, entry) in investigations.iter().enumerate() {
        repository::insert_claim_investigation(
            conn,
            &ClaimInvestigation {
                id: Uuid::new_v4(),
                claim_id: claim.id,
                source_investigation_id: None,
                description: entry.description.clone(),
                gdrg_code: entry.gdrg_code.clone(),
                investigation_type: entry.investigation_type.clone(),
                service_date: entry.service_date,
                display_order: i as i32,
            },
        )?;
    }
    for (i, entry) in prescriptions.iter().enumerate() {
        let unit = pricing::resolve_claim_amount(conn, &entry.medicine_code, patient.is_insured)?;
        repository::insert_claim_prescription(
            conn,
            &ClaimPrescription {
                id: Uuid::new_v4(),
                claim_id: claim.id,
                source_prescription_id: None,
                medicine_code: entry.medicine_code.clone(),
                description: entry.description.clone(),
                dose: entry.dose.clone(),
                frequency: entry.frequency.clone(),
                duration: entry.duration.clone(),
                unparsed: entry.unparsed.clone(),
                quantity: entry.quantity,
                unit_price: unit,
                total_cost: unit * entry.quantity,
                service_date: entry.service_date,
                display_order: i as i32,
            },
        )?;
    }
    for (i, entry) in procedures.iter().enumerate() {
        repository::insert_claim_procedure(
            conn,
            &ClaimProcedure {
                id: Uuid::new_v4(),
                claim_id: claim.id,
                description: entry.description.clone(),
                gdrg_code: entry.gdrg_code.clone(),
                service_date: entry.service_date,
                display_order: i as i32,
            },
        )?;
    }

    repository::update_claim(conn, &claim)?;

    let procedure = procedures.first();
    repository::update_encounter_claim_fields(
        conn,
        &claim.encounter_id,
        claim.first_visit_date,
        claim.second_visit_date,
        procedure.map(|p| p.description.as_str()),
        procedure.map(|p| p.gdrg_code.as_str()),
    )?;
    tx.commit()?;

    tracing::info!("Claim {} updated by {}", claim.claim_id, actor.id);
    Ok(claim)
}

// ═══════════════════════════════════════════
// Finalize and reopen
// ═══════════════════════════════════════════

pub fn finalize_claim(
    conn: &Connection,
    actor: &Actor,
    claim_id: &Uuid,
) -> Result<Claim, ServiceError> {
    if !actor.can_act_as(&StaffRole::Claims) {
        return Err(ServiceError::Forbidden(format!(
            "Role {} may not finalize claims",
            actor.role.as_str()
        )));
    }

    let mut claim = repository::get_claim(conn, claim_id)?
        .ok_or_else(|| ServiceError::not_found("Claim", claim_id))?;
    if claim.status == ClaimStatus::Finalized {
        return Err(ServiceError::invalid_state("finalize claim", claim.status.as_str()));
    }

    let encounter = repository::get_encounter(conn, &claim.encounter_id)?
        .ok_or_else(|| ServiceError::not_found("Encounter", claim.encounter_id))?;
    if encounter.outcome == Some(ConsultationOutcome::RecommendedForAdmission) {
        let discharged = repository::get_admission_for_encounter(conn, &encounter.id)?
            .map(|a| a.status == AdmissionStatus::Discharged)
            .unwrap_or(false);
        if !discharged {
            return Err(ServiceError::precondition(
                "The patient has not been discharged from the ward",
                Vec::new(),
            ));
        }
    }

    let now = Local::now().naive_local();
    repository::update_claim_status(conn, &claim.id, &ClaimStatus::Finalized, now)?;
    claim.status = ClaimStatus::Finalized;
    claim.updated_at = Some(now);

    tracing::info!("Claim {} finalized by {}", claim.claim_id, actor.id);
    Ok(claim)
}

pub fn reopen_claim(
    conn: &Connection,
    actor: &Actor,
    claim_id: &Uuid,
) -> Result<Claim, ServiceError> {
    if !actor.can_act_as(&StaffRole::Claims) {
        return Err(ServiceError::Forbidden(format!(
            "Role {} may not reopen claims",
            actor.role.as_str()
        )));
    }

    let mut claim = repository::get_claim(conn, claim_id)?
        .ok_or_else(|| ServiceError::not_found("Claim", claim_id))?;

    let now = Local::now().naive_local();
    repository::update_claim_status(conn, &claim.id, &ClaimStatus::Reopened, now)?;
    claim.status = ClaimStatus::Reopened;
    claim.updated_at = Some(now);

    tracing::info!("Claim {} reopened by {}", claim.claim_id, actor.id);
    Ok(claim)
}

// ═══════════════════════════════════════════
// Eligible sources
// ═══════════════════════════════════════════

/// Episodes the claims desk can work from: finalized encounters and
/// discharged admissions, claimed or not, with the desk's usual filters.
pub fn eligible_sources(
    conn: &Connection,
    filter: &EligibleFilter,
) -> Result<Vec<EligibleSource>, ServiceError> {
    let include_type =
        |t: &ServiceType| filter.service_type.as_ref().map_or(true, |wanted| wanted == t);
    let mut sources = Vec::new();

    if filter.claimed != Some(true) {
        if include_type(&ServiceType::Opd) {
            for encounter in repository::get_unclaimed_finalized_encounters(conn)? {
                push_source(conn, &mut sources, filter, &encounter, None, None)?;
            }
        }
        if include_type(&ServiceType::Ipd) {
            for admission in repository::get_unclaimed_discharged_admissions(conn)? {
                let Some(encounter) = repository::get_encounter(conn, &admission.encounter_id)?
                else {
                    continue;
                };
                push_source(conn, &mut sources, filter, &encounter, Some(&admission), None)?;
            }
        }
    }

    if filter.claimed != Some(false) {
        for claim in repository::get_claims(conn)? {
            if !include_type(&claim.type_of_service) {
                continue;
            }
            let Some(encounter) = repository::get_encounter(conn, &claim.encounter_id)? else {
                continue;
            };
            let admission = match claim.type_of_service {
                ServiceType::Ipd => repository::get_admission_for_encounter(conn, &encounter.id)?,
                ServiceType::Opd => None,
            };
            push_source(conn, &mut sources, filter, &encounter, admission.as_ref(), Some(&claim))?;
        }
    }

    Ok(sources)
}

fn push_source(
    conn: &Connection,
    sources: &mut Vec<EligibleSource>,
    filter: &EligibleFilter,
    encounter: &Encounter,
    admission: Option<&WardAdmission>,
    claim: Option<&Claim>,
) -> Result<(), ServiceError> {
    let date = admission
        .map(|a| a.admitted_at.date())
        .unwrap_or_else(|| encounter.created_at.date());
    if filter.from.is_some_and(|from| date < from) || filter.to.is_some_and(|to| date > to) {
        return Ok(());
    }

    let patient = repository::get_patient(conn, &encounter.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", encounter.patient_id))?;
    if let Some(wanted) = filter.card_number.as_deref() {
        if patient.card_number.as_deref() != Some(wanted) {
            return Ok(());
        }
    }

    sources.push(EligibleSource {
        source_id: admission.map(|a| a.id).unwrap_or(encounter.id),
        encounter_id: encounter.id,
        service_type: if admission.is_some() { ServiceType::Ipd } else { ServiceType::Opd },
        patient_id: patient.id,
        patient_name: patient.name,
        card_number: patient.card_number,
        date,
        claim_id: claim.map(|c| c.claim_id.clone()),
        claim_status: claim.map(|c| c.status.clone()),
    });
    Ok(())
}

// ═══════════════════════════════════════════
// Source records and snapshot building
// ═══════════════════════════════════════════

struct SourceDiagnosis {
    source_id: Uuid,
    description: String,
    icd10_code: Option<String>,
    gdrg_code: Option<String>,
    is_chief: bool,
}

/// Raw clinical records feeding a claim. For IPD the outpatient records of
/// the antecedent encounter come first, then the inpatient ones in ward
/// round order.
struct SourceRecords {
    diagnoses: Vec<SourceDiagnosis>,
    investigations: Vec<Investigation>,
    prescriptions: Vec<Prescription>,
    procedure: Option<(String, String)>,
    procedure_date: Option<NaiveDate>,
}

fn collect_source_records(
    conn: &Connection,
    encounter: &Encounter,
    admission: Option<&WardAdmission>,
) -> Result<SourceRecords, DatabaseError> {
    let mut diagnoses: Vec<SourceDiagnosis> =
        repository::get_diagnoses_for_encounter(conn, &encounter.id)?
            .into_iter()
            .map(|d| SourceDiagnosis {
                source_id: d.id,
                description: d.description,
                icd10_code: d.icd10_code,
                gdrg_code: d.gdrg_code,
                is_chief: d.is_chief,
            })
            .collect();
    let mut investigations =
        repository::get_investigations_for_owner(conn, &CareSetting::Outpatient, &encounter.id)?;
    let mut prescriptions =
        repository::get_prescriptions_for_owner(conn, &CareSetting::Outpatient, &encounter.id)?;

    if let Some(admission) = admission {
        for d in repository::get_inpatient_diagnoses_for_admission(conn, &admission.id)? {
            diagnoses.push(SourceDiagnosis {
                source_id: d.id,
                description: d.description,
                icd10_code: d.icd10_code,
                gdrg_code: d.gdrg_code,
                is_chief: d.is_chief,
            });
        }
        for review in repository::get_reviews_for_admission(conn, &admission.id)? {
            investigations.extend(repository::get_investigations_for_owner(
                conn,
                &CareSetting::Inpatient,
                &review.id,
            )?);
            prescriptions.extend(repository::get_prescriptions_for_owner(
                conn,
                &CareSetting::Inpatient,
                &review.id,
            )?);
        }
    }

    let procedure = encounter
        .procedure_gdrg_code
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(|code| {
            (
                encounter.procedure_name.clone().unwrap_or_else(|| code.to_string()),
                code.to_string(),
            )
        });

    Ok(SourceRecords {
        diagnoses,
        investigations,
        prescriptions,
        procedure,
        procedure_date: encounter.first_visit_date,
    })
}

struct DetailRows {
    diagnoses: Vec<ClaimDiagnosis>,
    investigations: Vec<ClaimInvestigation>,
    prescriptions: Vec<ClaimPrescription>,
    procedures: Vec<ClaimProcedure>,
}

fn build_detail_rows(
    conn: &Connection,
    claim_id: &Uuid,
    records: &SourceRecords,
    service_type: &ServiceType,
    is_insured: bool,
) -> Result<DetailRows, DatabaseError> {
    let opd = *service_type == ServiceType::Opd;
    let dx_cap = if opd { OPD_MAX_DIAGNOSES } else { usize::MAX };
    let inv_cap = if opd { OPD_MAX_INVESTIGATIONS } else { usize::MAX };
    let rx_cap = if opd { OPD_MAX_PRESCRIPTIONS } else { usize::MAX };

    let diagnoses = records
        .diagnoses
        .iter()
        .take(dx_cap)
        .enumerate()
        .map(|(i, d)| ClaimDiagnosis {
            id: Uuid::new_v4(),
            claim_id: *claim_id,
            source_diagnosis_id: Some(d.source_id),
            description: d.description.clone(),
            icd10_code: d.icd10_code.clone(),
            gdrg_code: d.gdrg_code.clone().unwrap_or_default(),
            is_chief: d.is_chief,
            display_order: i as i32,
        })
        .collect();

    let mut investigations = Vec::new();
    for inv in records.investigations.iter().filter(|i| claimable_investigation(i)).take(inv_cap) {
        investigations.push(ClaimInvestigation {
            id: Uuid::new_v4(),
            claim_id: *claim_id,
            source_investigation_id: Some(inv.id),
            description: investigation_description(inv),
            gdrg_code: inv.gdrg_code.clone().unwrap_or_default(),
            investigation_type: Some(inv.investigation_type.clone()),
            service_date: inv.service_date,
            display_order: investigations.len() as i32,
        });
    }

    let mut prescriptions = Vec::new();
    for rx in records.prescriptions.iter().filter(|r| claimable_prescription(r)).take(rx_cap) {
        let code = rx.medicine_code.clone().unwrap_or_default();
        let unit = pricing::resolve_claim_amount(conn, &code, is_insured)?;
        prescriptions.push(ClaimPrescription {
            id: Uuid::new_v4(),
            claim_id: *claim_id,
            source_prescription_id: Some(rx.id),
            medicine_code: code,
            description: rx.medicine_name.clone(),
            dose: rx.dose.clone(),
            frequency: rx.frequency.clone(),
            duration: rx.duration.clone(),
            unparsed: rx.unparsed.clone(),
            quantity: rx.quantity,
            unit_price: unit,
            total_cost: unit * rx.quantity,
            service_date: rx.service_date,
            display_order: prescriptions.len() as i32,
        });
    }

    let procedures = records
        .procedure
        .iter()
        .map(|(name, code)| ClaimProcedure {
            id: Uuid::new_v4(),
            claim_id: *claim_id,
            description: name.clone(),
            gdrg_code: code.clone(),
            service_date: records.procedure_date,
            display_order: 0,
        })
        .collect();

    Ok(DetailRows { diagnoses, investigations, prescriptions, procedures })
}

fn insert_detail_rows(conn: &Connection, rows: &DetailRows) -> Result<(), DatabaseError> {
    for d in &rows.diagnoses {
        repository::insert_claim_diagnosis(conn, d)?;
    }
    for i in &rows.investigations {
        repository::insert_claim_investigation(conn, i)?;
    }
    for p in &rows.prescriptions {
        repository::insert_claim_prescription(conn, p)?;
    }
    for p in &rows.procedures {
        repository::insert_claim_procedure(conn, p)?;
    }
    Ok(())
}

fn claimable_investigation(inv: &Investigation) -> bool {
    inv.status == InvestigationStatus::Completed
        && inv.gdrg_code.as_deref().is_some_and(|c| !c.is_empty())
}

fn claimable_prescription(rx: &Prescription) -> bool {
    matches!(rx.state, PrescriptionState::Dispensed { .. })
        && rx.medicine_code.as_deref().is_some_and(|c| !c.is_empty())
}

fn investigation_description(inv: &Investigation) -> String {
    inv.procedure_name
        .clone()
        .or_else(|| inv.gdrg_code.clone())
        .unwrap_or_else(|| "Investigation".into())
}

/// Chief diagnosis code, outpatient records first so the outpatient chief
/// wins when both exist.
fn principal_from_source(diagnoses: &[SourceDiagnosis]) -> Option<String> {
    diagnoses
        .iter()
        .find(|d| d.is_chief)
        .and_then(|d| d.gdrg_code.clone())
        .filter(|c| !c.is_empty())
}

fn has_dispensed(prescriptions: &[Prescription]) -> bool {
    prescriptions.iter().any(|rx| matches!(rx.state, PrescriptionState::Dispensed { .. }))
}

/// NHIA service outcome code for the claim form.
fn derive_service_outcome(encounter: &Encounter, admission: Option<&WardAdmission>) -> String {
    if let Some(admission) = admission {
        return match admission.discharge_outcome {
            Some(DischargeOutcome::Referred) => "TRAN",
            Some(DischargeOutcome::Died) => "DIED",
            Some(DischargeOutcome::Absconded) => "ABSC",
            Some(DischargeOutcome::Recovered) | None => "DISC",
        }
        .to_string();
    }
    match encounter.outcome {
        Some(ConsultationOutcome::RecommendedForAdmission) => "ADMI",
        Some(ConsultationOutcome::Referred) => "TRAN",
        _ => "DISC",
    }
    .to_string()
}

fn spell_duration(admission: &WardAdmission) -> Option<i32> {
    let discharged = admission.discharged_at?;
    let days = (discharged.date() - admission.admitted_at.date()).num_days();
    Some(days.max(1) as i32)
}

fn generate_claim_external_id(conn: &Connection) -> Result<String, DatabaseError> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = format!("CLA-{:05}", rng.gen_range(0..100_000u32));
        if !repository::claim_external_id_exists(conn, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(DatabaseError::ConstraintViolation(
        "could not allocate a unique claim id".into(),
    ))
}

fn generate_check_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    format!("{:05}", rng.gen_range(0..100_000u32))
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{
        get_claim_diagnoses, get_claim_for_encounter, get_claim_prescriptions,
        get_claim_procedures, insert_admission, insert_diagnosis, insert_drg_price,
        insert_encounter, insert_investigation, insert_patient, insert_prescription,
        insert_product_price, insert_recommendation, insert_review,
    };
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::RecommendationStatus;
    use crate::models::{
        AdmissionRecommendation, Diagnosis, DrgCatalog, DrgPrice, InpatientReview, Patient,
        ProductPrice, StateStamp,
    };
    use chrono::{Duration, NaiveDateTime};

    fn clerk() -> Actor {
        Actor {
            id: "STF-400".into(),
            name: "Claims Clerk".into(),
            role: StaffRole::Claims,
        }
    }

    fn doctor() -> Actor {
        Actor {
            id: "STF-001".into(),
            name: "Dr. Sarpong".into(),
            role: StaffRole::Doctor,
        }
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn stamp(actor_id: &str) -> StateStamp {
        StateStamp {
            actor_id: actor_id.into(),
            actor_name: Some("Someone".into()),
            at: ts("2026-03-02 10:00:00"),
        }
    }

    fn seed_patient(conn: &Connection, card: Option<&str>) -> Patient {
        let patient = Patient {
            id: Uuid::new_v4(),
            name: "Ama Mensah".into(),
            is_insured: true,
            insurance_id: Some("NHIS-001122".into()),
            card_number: card.map(String::from),
            created_at: ts("2026-03-01 08:00:00"),
        };
        insert_patient(conn, &patient).unwrap();
        patient
    }

    fn seed_encounter(
        conn: &Connection,
        patient: &Patient,
        status: EncounterStatus,
        outcome: Option<ConsultationOutcome>,
    ) -> Encounter {
        let encounter = Encounter {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            status,
            outcome,
            procedure_name: None,
            procedure_gdrg_code: None,
            first_visit_date: Some(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()),
            second_visit_date: None,
            created_at: ts("2026-03-01 09:00:00"),
        };
        insert_encounter(conn, &encounter).unwrap();
        encounter
    }

    fn seed_diagnosis(
        conn: &Connection,
        encounter_id: &Uuid,
        desc: &str,
        code: &str,
        chief: bool,
        order: i64,
    ) {
        insert_diagnosis(
            conn,
            &Diagnosis {
                id: Uuid::new_v4(),
                encounter_id: *encounter_id,
                description: desc.into(),
                icd10_code: None,
                gdrg_code: (!code.is_empty()).then(|| code.to_string()),
                is_chief: chief,
                // Distinct timestamps keep the creation-order reads stable.
                created_at: ts("2026-03-01 09:05:00") + Duration::seconds(order),
            },
        )
        .unwrap();
    }

    fn seed_dispensed_rx(
        conn: &Connection,
        setting: &CareSetting,
        owner_id: &Uuid,
        code: Option<&str>,
        name: &str,
        quantity: f64,
    ) {
        insert_prescription(
            conn,
            setting,
            &Prescription {
                id: Uuid::new_v4(),
                owner_id: *owner_id,
                medicine_code: code.map(String::from),
                medicine_name: name.into(),
                dose: Some("500 MG".into()),
                frequency: Some("BDS".into()),
                duration: Some("5 days".into()),
                unparsed: None,
                quantity,
                is_external: false,
                prescribed_by: "STF-001".into(),
                prescribed_by_name: None,
                state: PrescriptionState::Dispensed {
                    confirmed: stamp("STF-200"),
                    dispensed: stamp("STF-200"),
                },
                service_date: Some(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()),
                bill_item_id: None,
                created_at: Local::now().naive_local(),
            },
        )
        .unwrap();
    }

    fn seed_investigation(
        conn: &Connection,
        setting: &CareSetting,
        owner_id: &Uuid,
        code: &str,
        status: InvestigationStatus,
    ) -> Investigation {
        let inv = Investigation {
            id: Uuid::new_v4(),
            owner_id: *owner_id,
            gdrg_code: Some(code.into()),
            procedure_name: Some(format!("Test {code}")),
            investigation_type: InvestigationType::Lab,
            status,
            price: 0.0,
            requested_by: "STF-001".into(),
            requested_by_name: None,
            confirmed_by: None,
            confirmed_by_name: None,
            confirmed_at: None,
            completed_by: None,
            completed_by_name: None,
            cancelled_by: None,
            cancelled_by_name: None,
            cancelled_at: None,
            cancellation_reason: None,
            sample_id: None,
            service_date: Some(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()),
            bill_item_id: None,
            created_at: Local::now().naive_local(),
        };
        insert_investigation(conn, setting, &inv).unwrap();
        inv
    }

    fn seed_product(conn: &Connection, code: &str, base: f64, claim_amount: Option<f64>) {
        insert_product_price(
            conn,
            &ProductPrice {
                id: Uuid::new_v4(),
                medication_code: code.into(),
                product_name: format!("Product {code}"),
                base_rate: base,
                co_payment: None,
                claim_amount,
                insurance_covered: true,
                is_active: true,
            },
        )
        .unwrap();
    }

    fn seed_discharged_admission(
        conn: &Connection,
        patient: &Patient,
        encounter: &Encounter,
    ) -> WardAdmission {
        let rec = AdmissionRecommendation {
            id: Uuid::new_v4(),
            encounter_id: encounter.id,
            ward: "Male Ward".into(),
            status: RecommendationStatus::Confirmed,
            cancelled_by: None,
            cancelled_by_name: None,
            cancellation_reason: None,
            created_at: ts("2026-03-01 10:00:00"),
            updated_at: None,
        };
        insert_recommendation(conn, &rec).unwrap();

        let admitted = ts("2026-03-01 11:00:00");
        let admission = WardAdmission {
            id: Uuid::new_v4(),
            recommendation_id: rec.id,
            patient_id: patient.id,
            encounter_id: encounter.id,
            ward: "Male Ward".into(),
            bed_id: None,
            doctor_id: Some("STF-001".into()),
            doctor_name: Some("Dr. Sarpong".into()),
            status: AdmissionStatus::Discharged,
            admitted_by: "STF-300".into(),
            admitted_by_name: None,
            admitted_at: admitted,
            partially_discharged_by: Some("STF-300".into()),
            partially_discharged_by_name: None,
            partially_discharged_at: Some(admitted + Duration::days(3)),
            discharge_outcome: Some(DischargeOutcome::Recovered),
            discharge_condition: None,
            final_orders: None,
            discharged_by: Some("STF-300".into()),
            discharged_by_name: None,
            discharged_at: Some(admitted + Duration::days(3)),
        };
        insert_admission(conn, &admission).unwrap();
        admission
    }

    fn seed_ward_review(conn: &Connection, admission_id: &Uuid) -> InpatientReview {
        let review = InpatientReview {
            id: Uuid::new_v4(),
            admission_id: *admission_id,
            notes: Some("Ward round".into()),
            reviewed_by: "STF-001".into(),
            reviewed_by_name: None,
            created_at: Local::now().naive_local(),
        };
        insert_review(conn, &review).unwrap();
        review
    }

    #[test]
    fn opd_generation_caps_and_prices_the_snapshots() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("C-1001"));
        let encounter = seed_encounter(
            &conn,
            &patient,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::Discharged),
        );

        seed_diagnosis(&conn, &encounter.id, "Malaria", "MALA01", true, 0);
        for i in 0..4 {
            seed_diagnosis(&conn, &encounter.id, &format!("Other {i}"), "", false, i + 1);
        }
        seed_product(&conn, "AMX500", 4.0, Some(3.5));
        seed_dispensed_rx(&conn, &CareSetting::Outpatient, &encounter.id, Some("AMX500"), "Amoxicillin", 10.0);
        // Uncoded and undispensed prescriptions never reach the claim.
        seed_dispensed_rx(&conn, &CareSetting::Outpatient, &encounter.id, None, "Paracetamol", 6.0);
        seed_investigation(&conn, &CareSetting::Outpatient, &encounter.id, "FBC01", InvestigationStatus::Completed);
        seed_investigation(&conn, &CareSetting::Outpatient, &encounter.id, "WID01", InvestigationStatus::Cancelled);

        let claim = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: encounter.id, service_type: ServiceType::Opd },
        )
        .unwrap();

        assert!(claim.claim_id.starts_with("CLA-") && claim.claim_id.len() == 9);
        assert_eq!(claim.claim_check_code.len(), 5);
        assert_eq!(claim.status, ClaimStatus::Draft);
        assert_eq!(claim.principal_gdrg.as_deref(), Some("MALA01"));
        assert!(claim.includes_pharmacy);
        assert_eq!(claim.member_no, "NHIS-001122");
        assert_eq!(claim.duration_of_spell, None);

        let diagnoses = get_claim_diagnoses(&conn, &claim.id).unwrap();
        assert_eq!(diagnoses.len(), 4);
        assert!(diagnoses[0].is_chief);

        let prescriptions = get_claim_prescriptions(&conn, &claim.id).unwrap();
        assert_eq!(prescriptions.len(), 1);
        assert_eq!(prescriptions[0].unit_price, 3.5);
        assert_eq!(prescriptions[0].total_cost, 35.0);

        let investigations = repository::get_claim_investigations(&conn, &claim.id).unwrap();
        assert_eq!(investigations.len(), 1);
        assert_eq!(investigations[0].gdrg_code, "FBC01");
    }

    #[test]
    fn opd_generation_blocks_on_unpaid_bills_and_open_investigations() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, None);
        let encounter = seed_encounter(
            &conn,
            &patient,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::Discharged),
        );
        let req = GenerateClaim { source_id: encounter.id, service_type: ServiceType::Opd };

        let bill = billing::ensure_open_bill(&conn, &encounter.id, true).unwrap();
        let item = billing::add_charge(
            &conn,
            &bill,
            None,
            "Consultation",
            &crate::models::enums::BillItemCategory::Service,
            1.0,
            10.0,
        )
        .unwrap();
        let err = generate_claim(&conn, &clerk(), req.clone()).unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed { .. }));

        billing::record_receipt(
            &conn,
            &clerk(),
            &bill.id,
            &[billing::PaymentAllocation { bill_item_id: item.id, amount: 10.0 }],
        )
        .unwrap();

        let open = seed_investigation(
            &conn,
            &CareSetting::Outpatient,
            &encounter.id,
            "FBC01",
            InvestigationStatus::Confirmed,
        );
        let err = generate_claim(&conn, &clerk(), req.clone()).unwrap_err();
        match err {
            ServiceError::PreconditionFailed { offending, .. } => {
                assert!(offending[0].contains("FBC01"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut cancelled = open;
        cancelled.status = InvestigationStatus::Cancelled;
        repository::update_investigation(&conn, &CareSetting::Outpatient, &cancelled).unwrap();
        generate_claim(&conn, &clerk(), req).unwrap();
    }

    #[test]
    fn unfinalized_encounters_and_repeat_claims_are_rejected() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, None);
        let open_encounter =
            seed_encounter(&conn, &patient, EncounterStatus::InConsultation, None);
        let err = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: open_encounter.id, service_type: ServiceType::Opd },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));

        let done = seed_encounter(
            &conn,
            &patient,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::Discharged),
        );
        let req = GenerateClaim { source_id: done.id, service_type: ServiceType::Opd };
        generate_claim(&conn, &clerk(), req.clone()).unwrap();
        let err = generate_claim(&conn, &clerk(), req).unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed { .. }));
    }

    #[test]
    fn ipd_generation_merges_both_record_streams_uncapped() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("C-2002"));
        let encounter = seed_encounter(
            &conn,
            &patient,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::RecommendedForAdmission),
        );
        seed_diagnosis(&conn, &encounter.id, "Severe malaria", "MALA02", true, 0);
        let admission = seed_discharged_admission(&conn, &patient, &encounter);
        let review = seed_ward_review(&conn, &admission.id);
        crate::admissions::add_review_diagnosis(
            &conn,
            &doctor(),
            &review.id,
            crate::consultation::NewDiagnosis {
                description: "Anaemia".into(),
                icd10_code: None,
                gdrg_code: Some("ANAE01".into()),
                is_chief: true,
            },
        )
        .unwrap();
        for i in 0..6 {
            seed_dispensed_rx(
                &conn,
                &CareSetting::Inpatient,
                &review.id,
                Some("AMX500"),
                &format!("Medicine {i}"),
                2.0,
            );
        }
        seed_product(&conn, "AMX500", 4.0, None);

        // Generation from a still-admitted patient fails without a claim row.
        let confirmed = WardAdmission { status: AdmissionStatus::Confirmed, ..admission.clone() };
        repository::update_admission(&conn, &confirmed).unwrap();
        let err = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: admission.id, service_type: ServiceType::Ipd },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));
        assert!(get_claim_for_encounter(&conn, &encounter.id).unwrap().is_none());
        repository::update_admission(&conn, &admission).unwrap();

        let claim = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: admission.id, service_type: ServiceType::Ipd },
        )
        .unwrap();

        // Outpatient chief wins over the inpatient one.
        assert_eq!(claim.principal_gdrg.as_deref(), Some("MALA02"));
        assert_eq!(claim.duration_of_spell, Some(3));
        assert_eq!(claim.physician_name.as_deref(), Some("Dr. Sarpong"));
        assert_eq!(claim.service_outcome, "DISC");

        let diagnoses = get_claim_diagnoses(&conn, &claim.id).unwrap();
        assert_eq!(diagnoses.len(), 2);
        assert_eq!(diagnoses[0].description, "Severe malaria");
        assert_eq!(diagnoses[1].description, "Anaemia");

        // No OPD cap: all six inpatient prescriptions, priced at base_rate.
        let prescriptions = get_claim_prescriptions(&conn, &claim.id).unwrap();
        assert_eq!(prescriptions.len(), 6);
        assert_eq!(prescriptions[0].unit_price, 4.0);
        assert_eq!(prescriptions[0].total_cost, 8.0);
    }

    #[test]
    fn regeneration_tracks_source_changes_while_open() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, None);
        let encounter = seed_encounter(
            &conn,
            &patient,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::Discharged),
        );
        seed_diagnosis(&conn, &encounter.id, "Malaria", "MALA01", true, 0);
        let claim = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: encounter.id, service_type: ServiceType::Opd },
        )
        .unwrap();
        assert_eq!(get_claim_diagnoses(&conn, &claim.id).unwrap().len(), 1);

        seed_diagnosis(&conn, &encounter.id, "Typhoid", "TYPH01", false, 1);
        regenerate_claim(&conn, &clerk(), &claim.id).unwrap();
        assert_eq!(get_claim_diagnoses(&conn, &claim.id).unwrap().len(), 2);

        // Identical source, identical rebuild.
        regenerate_claim(&conn, &clerk(), &claim.id).unwrap();
        assert_eq!(get_claim_diagnoses(&conn, &claim.id).unwrap().len(), 2);

        finalize_claim(&conn, &clerk(), &claim.id).unwrap();
        let err = regenerate_claim(&conn, &clerk(), &claim.id).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));
    }

    #[test]
    fn hand_edits_are_served_verbatim_and_flow_to_the_encounter() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, None);
        let mut encounter = seed_encounter(
            &conn,
            &patient,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::Discharged),
        );
        encounter.procedure_name = Some("Suturing".into());
        encounter.procedure_gdrg_code = Some("SUT01".into());
        repository::update_encounter_claim_fields(
            &conn,
            &encounter.id,
            encounter.first_visit_date,
            None,
            Some("Suturing"),
            Some("SUT01"),
        )
        .unwrap();
        seed_diagnosis(&conn, &encounter.id, "Laceration", "LACE01", true, 0);

        let claim = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: encounter.id, service_type: ServiceType::Opd },
        )
        .unwrap();

        let view = claim_edit_view(&conn, &claim.id).unwrap();
        assert!(view.hand_edited);
        assert_eq!(view.procedures.len(), 1);

        // Clerk empties the procedures and renames the diagnosis.
        let updated = update_claim_details(
            &conn,
            &clerk(),
            &claim.id,
            ClaimUpdate {
                physician_id: None,
                physician_name: Some("Dr. Owusu".into()),
                is_dependant: false,
                type_of_attendance: Some("Emergency".into()),
                specialty_attended: None,
                service_outcome: "DISC".into(),
                first_visit_date: NaiveDate::from_ymd_opt(2026, 3, 5),
                second_visit_date: None,
                duration_of_spell: None,
                diagnoses: vec![
                    DiagnosisEntry {
                        description: "Deep laceration".into(),
                        icd10_code: None,
                        gdrg_code: "LACE02".into(),
                        is_chief: true,
                    },
                    DiagnosisEntry {
                        description: "   ".into(),
                        icd10_code: None,
                        gdrg_code: "SKIP".into(),
                        is_chief: false,
                    },
                ],
                investigations: Vec::new(),
                prescriptions: Vec::new(),
                procedures: Vec::new(),
            },
        )
        .unwrap();

        assert_eq!(updated.principal_gdrg.as_deref(), Some("LACE02"));
        assert!(!updated.includes_pharmacy);

        // The emptied procedures stay empty; the blank diagnosis was dropped.
        let view = claim_edit_view(&conn, &claim.id).unwrap();
        assert_eq!(view.procedures.len(), 0);
        assert_eq!(view.diagnoses.len(), 1);
        assert_eq!(view.diagnoses[0].description, "Deep laceration");

        // Visit dates pushed down, recorded procedure cleared.
        let refreshed = repository::get_encounter(&conn, &encounter.id).unwrap().unwrap();
        assert_eq!(refreshed.first_visit_date, NaiveDate::from_ymd_opt(2026, 3, 5));
        assert!(refreshed.procedure_gdrg_code.is_none());
        assert_eq!(get_claim_procedures(&conn, &claim.id).unwrap().len(), 0);
    }

    #[test]
    fn edit_view_derives_live_until_a_diagnosis_snapshot_exists() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, None);
        let encounter = seed_encounter(
            &conn,
            &patient,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::Discharged),
        );
        seed_investigation(
            &conn,
            &CareSetting::Outpatient,
            &encounter.id,
            "FBC01",
            InvestigationStatus::Completed,
        );
        seed_price_for_claim(&conn, "FBC01", 12.0, Some(9.0));

        // No diagnoses at all, so generation stores no diagnosis rows.
        let claim = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: encounter.id, service_type: ServiceType::Opd },
        )
        .unwrap();

        let view = claim_edit_view(&conn, &claim.id).unwrap();
        assert!(!view.hand_edited);
        assert_eq!(view.investigations.len(), 1);
        assert_eq!(view.investigations_amount, 9.0);
    }

    fn seed_price_for_claim(conn: &Connection, code: &str, base: f64, nhia: Option<f64>) {
        insert_drg_price(
            conn,
            &DrgCatalog::Procedure,
            &DrgPrice {
                id: Uuid::new_v4(),
                gdrg_code: code.into(),
                service_name: format!("Service {code}"),
                base_rate: base,
                nhia_app: nhia,
                co_payment: None,
                is_active: true,
            },
        )
        .unwrap();
    }

    #[test]
    fn finalize_gates_on_ward_discharge_and_role() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, None);
        let encounter = seed_encounter(
            &conn,
            &patient,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::RecommendedForAdmission),
        );
        let claim = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: encounter.id, service_type: ServiceType::Opd },
        )
        .unwrap();

        let err = finalize_claim(&conn, &doctor(), &claim.id).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        // Recommended for admission but never discharged from the ward.
        let err = finalize_claim(&conn, &clerk(), &claim.id).unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed { .. }));

        seed_discharged_admission(&conn, &patient, &encounter);
        let finalized = finalize_claim(&conn, &clerk(), &claim.id).unwrap();
        assert_eq!(finalized.status, ClaimStatus::Finalized);

        let err = finalize_claim(&conn, &clerk(), &claim.id).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));

        let reopened = reopen_claim(&conn, &clerk(), &claim.id).unwrap();
        assert_eq!(reopened.status, ClaimStatus::Reopened);
    }

    #[test]
    fn editing_a_finalized_claim_reopens_it() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, None);
        let encounter = seed_encounter(
            &conn,
            &patient,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::Discharged),
        );
        seed_diagnosis(&conn, &encounter.id, "Malaria", "MALA01", true, 0);
        let claim = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: encounter.id, service_type: ServiceType::Opd },
        )
        .unwrap();
        finalize_claim(&conn, &clerk(), &claim.id).unwrap();

        let updated = update_claim_details(
            &conn,
            &clerk(),
            &claim.id,
            ClaimUpdate {
                physician_id: None,
                physician_name: None,
                is_dependant: false,
                type_of_attendance: None,
                specialty_attended: None,
                service_outcome: "DISC".into(),
                first_visit_date: None,
                second_visit_date: None,
                duration_of_spell: None,
                diagnoses: vec![DiagnosisEntry {
                    description: "Malaria".into(),
                    icd10_code: None,
                    gdrg_code: "MALA01".into(),
                    is_chief: true,
                }],
                investigations: Vec::new(),
                prescriptions: Vec::new(),
                procedures: Vec::new(),
            },
        )
        .unwrap();
        assert_eq!(updated.status, ClaimStatus::Reopened);
    }

    #[test]
    fn eligible_sources_lists_and_filters() {
        let conn = open_memory_database().unwrap();
        let carded = seed_patient(&conn, Some("C-1001"));
        let other = seed_patient(&conn, Some("C-9999"));

        let unclaimed_opd = seed_encounter(
            &conn,
            &carded,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::Discharged),
        );
        let claimed_opd = seed_encounter(
            &conn,
            &other,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::Discharged),
        );
        let claim = generate_claim(
            &conn,
            &clerk(),
            GenerateClaim { source_id: claimed_opd.id, service_type: ServiceType::Opd },
        )
        .unwrap();
        let ipd_encounter = seed_encounter(
            &conn,
            &other,
            EncounterStatus::Finalized,
            Some(ConsultationOutcome::RecommendedForAdmission),
        );
        let admission = seed_discharged_admission(&conn, &other, &ipd_encounter);

        // The admission's antecedent encounter is itself finalized and
        // unclaimed, so the same episode shows up once per service type.
        let all = eligible_sources(&conn, &EligibleFilter::default()).unwrap();
        assert_eq!(all.len(), 4);

        let unclaimed = eligible_sources(
            &conn,
            &EligibleFilter { claimed: Some(false), ..Default::default() },
        )
        .unwrap();
        assert_eq!(unclaimed.len(), 3);
        assert!(unclaimed.iter().all(|s| s.claim_id.is_none()));

        let claimed = eligible_sources(
            &conn,
            &EligibleFilter { claimed: Some(true), ..Default::default() },
        )
        .unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].claim_id.as_deref(), Some(claim.claim_id.as_str()));

        let ipd_only = eligible_sources(
            &conn,
            &EligibleFilter { service_type: Some(ServiceType::Ipd), ..Default::default() },
        )
        .unwrap();
        assert_eq!(ipd_only.len(), 1);
        assert_eq!(ipd_only[0].source_id, admission.id);

        let by_card = eligible_sources(
            &conn,
            &EligibleFilter { card_number: Some("C-1001".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(by_card.len(), 1);
        assert_eq!(by_card[0].encounter_id, unclaimed_opd.id);

        let out_of_range = eligible_sources(
            &conn,
            &EligibleFilter {
                to: NaiveDate::from_ymd_opt(2020, 1, 1),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(out_of_range.is_empty());
    }
}
