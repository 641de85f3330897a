use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who performed a state transition and when. Stored flattened into the
/// `*_by` / `*_at` columns; reconstructed by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateStamp {
    pub actor_id: String,
    pub actor_name: Option<String>,
    pub at: NaiveDateTime,
}

/// Prescription lifecycle. The stamps are payload of the state itself, so a
/// dispensed prescription always carries its confirmation and an unconfirmed
/// one cannot carry a dangling dispense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PrescriptionState {
    Pending,
    Confirmed {
        confirmed: StateStamp,
    },
    Dispensed {
        confirmed: StateStamp,
        dispensed: StateStamp,
    },
}

impl PrescriptionState {
    /// Tag persisted in the `state` column.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed { .. } => "confirmed",
            Self::Dispensed { .. } => "dispensed",
        }
    }

    pub fn confirmed_stamp(&self) -> Option<&StateStamp> {
        match self {
            Self::Pending => None,
            Self::Confirmed { confirmed } | Self::Dispensed { confirmed, .. } => Some(confirmed),
        }
    }

    pub fn dispensed_stamp(&self) -> Option<&StateStamp> {
        match self {
            Self::Dispensed { dispensed, .. } => Some(dispensed),
            _ => None,
        }
    }
}

/// An ordered medicine, outpatient or inpatient. `owner_id` names the
/// encounter (outpatient) or the ward-round review (inpatient) that owns the
/// row; `bill_item_id` is the only link to the charge ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub medicine_code: Option<String>,
    pub medicine_name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub unparsed: Option<String>,
    pub quantity: f64,
    pub is_external: bool,
    pub prescribed_by: String,
    pub prescribed_by_name: Option<String>,
    pub state: PrescriptionState,
    pub service_date: Option<NaiveDate>,
    pub bill_item_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}
