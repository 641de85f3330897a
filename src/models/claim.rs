use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ClaimStatus, InvestigationType, ServiceType};

/// NHIA claim header. `claim_id` is the externally visible `CLA-#####`
/// identifier; `id` is the row key. The four detail collections hang off
/// this row and are point-in-time snapshots, not live views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub claim_id: String,
    pub claim_check_code: String,
    pub physician_id: Option<String>,
    pub physician_name: Option<String>,
    pub member_no: String,
    pub card_serial_no: String,
    pub is_dependant: bool,
    pub type_of_service: ServiceType,
    pub type_of_attendance: Option<String>,
    pub specialty_attended: Option<String>,
    pub service_outcome: String,
    pub principal_gdrg: Option<String>,
    pub includes_pharmacy: bool,
    pub first_visit_date: Option<NaiveDate>,
    pub second_visit_date: Option<NaiveDate>,
    pub duration_of_spell: Option<i32>,
    pub status: ClaimStatus,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDiagnosis {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub source_diagnosis_id: Option<Uuid>,
    pub description: String,
    pub icd10_code: Option<String>,
    pub gdrg_code: String,
    pub is_chief: bool,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimInvestigation {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub source_investigation_id: Option<Uuid>,
    pub description: String,
    pub gdrg_code: String,
    pub investigation_type: Option<InvestigationType>,
    pub service_date: Option<NaiveDate>,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimPrescription {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub source_prescription_id: Option<Uuid>,
    pub medicine_code: String,
    pub description: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub unparsed: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_cost: f64,
    pub service_date: Option<NaiveDate>,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimProcedure {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub description: String,
    pub gdrg_code: String,
    pub service_date: Option<NaiveDate>,
    pub display_order: i32,
}
