use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AdmissionStatus, DischargeOutcome, RecommendationStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bed {
    pub id: Uuid,
    pub ward: String,
    pub bed_number: String,
    pub is_occupied: bool,
    pub is_active: bool,
}

/// Written when a consultation outcome recommends admission; at most one per
/// encounter. Confirming it creates the WardAdmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRecommendation {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub ward: String,
    pub status: RecommendationStatus,
    pub cancelled_by: Option<String>,
    pub cancelled_by_name: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardAdmission {
    pub id: Uuid,
    pub recommendation_id: Uuid,
    pub patient_id: Uuid,
    pub encounter_id: Uuid,
    pub ward: String,
    pub bed_id: Option<Uuid>,
    pub doctor_id: Option<String>,
    pub doctor_name: Option<String>,
    pub status: AdmissionStatus,
    pub admitted_by: String,
    pub admitted_by_name: Option<String>,
    pub admitted_at: NaiveDateTime,
    pub partially_discharged_by: Option<String>,
    pub partially_discharged_by_name: Option<String>,
    pub partially_discharged_at: Option<NaiveDateTime>,
    pub discharge_outcome: Option<DischargeOutcome>,
    pub discharge_condition: Option<String>,
    pub final_orders: Option<String>,
    pub discharged_by: Option<String>,
    pub discharged_by_name: Option<String>,
    pub discharged_at: Option<NaiveDateTime>,
}

/// Ward-round record. Inpatient diagnoses, prescriptions and investigations
/// hang off a review rather than the encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InpatientReview {
    pub id: Uuid,
    pub admission_id: Uuid,
    pub notes: Option<String>,
    pub reviewed_by: String,
    pub reviewed_by_name: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InpatientDiagnosis {
    pub id: Uuid,
    pub review_id: Uuid,
    pub description: String,
    pub icd10_code: Option<String>,
    pub gdrg_code: Option<String>,
    pub is_chief: bool,
    pub created_at: NaiveDateTime,
}
