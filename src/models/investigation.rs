use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{InvestigationStatus, InvestigationType};

/// A requested lab test, scan or x-ray. `owner_id` names the encounter
/// (outpatient) or ward-round review (inpatient). `price` is the amount
/// captured at request time and is only a fallback when the catalog has no
/// usable rate at confirmation. `sample_id` is assigned once, on the first
/// confirmation of a lab investigation, and never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub gdrg_code: Option<String>,
    pub procedure_name: Option<String>,
    pub investigation_type: InvestigationType,
    pub status: InvestigationStatus,
    pub price: f64,
    pub requested_by: String,
    pub requested_by_name: Option<String>,
    pub confirmed_by: Option<String>,
    pub confirmed_by_name: Option<String>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub completed_by: Option<String>,
    pub completed_by_name: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancelled_by_name: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancellation_reason: Option<String>,
    pub sample_id: Option<String>,
    pub service_date: Option<NaiveDate>,
    pub bill_item_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationResult {
    pub id: Uuid,
    pub investigation_id: Uuid,
    pub sample_id: Option<String>,
    pub result_text: String,
    pub entered_by: String,
    pub entered_by_name: Option<String>,
    pub entered_at: NaiveDateTime,
}
