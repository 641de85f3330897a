use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Slice of the registration system's patient record that billing needs:
/// insurance status plus the identifiers copied onto NHIA claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub is_insured: bool,
    pub insurance_id: Option<String>,
    pub card_number: Option<String>,
    pub created_at: NaiveDateTime,
}
