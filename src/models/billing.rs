use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::BillItemCategory;

/// One charge ledger per encounter episode. `total_amount` is maintained by
/// the ledger module and equals the sum of the bill's items at every commit
/// point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub bill_number: String,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub is_paid: bool,
    pub is_insured: bool,
    pub created_at: NaiveDateTime,
}

/// A single charge line. `total_price` may be negative for credits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillItem {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub item_code: Option<String>,
    pub item_name: String,
    pub category: BillItemCategory,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub receipt_number: String,
    pub refunded: bool,
    pub received_by: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub bill_item_id: Uuid,
    pub amount: f64,
}
