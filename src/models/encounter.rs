use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConsultationOutcome, EncounterStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub status: EncounterStatus,
    pub outcome: Option<ConsultationOutcome>,
    pub procedure_name: Option<String>,
    pub procedure_gdrg_code: Option<String>,
    pub first_visit_date: Option<NaiveDate>,
    pub second_visit_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub description: String,
    pub icd10_code: Option<String>,
    pub gdrg_code: Option<String>,
    pub is_chief: bool,
    pub created_at: NaiveDateTime,
}
