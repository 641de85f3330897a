//! Charge ledger: bills, line items and receipts.
//!
//! Every lifecycle transition that moves money goes through here. The ledger
//! maintains one invariant at every commit point: a bill's `total_amount`
//! equals the sum of its live line items. Charges are added and removed by
//! the clinical state machines; payments arrive as receipts allocated
//! against individual items, and "paid" always means net of refunded
//! receipts.

use chrono::Local;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::errors::ServiceError;
use crate::models::enums::{BillItemCategory, CareSetting};
use crate::models::{Actor, Bill, BillItem, Receipt, ReceiptItem};

/// Retries allowed when allocating an external bill number before giving up.
const MAX_NUMBER_ATTEMPTS: u32 = 20;

// ═══════════════════════════════════════════
// View types
// ═══════════════════════════════════════════

/// One payment line of a receipt: how much of the tendered amount settles
/// which bill item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub bill_item_id: Uuid,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillItemView {
    pub id: Uuid,
    pub item_code: Option<String>,
    pub item_name: String,
    pub category: BillItemCategory,
    pub service_group: &'static str,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub amount_paid: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillDetailView {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub bill_number: String,
    pub is_insured: bool,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub is_paid: bool,
    pub items: Vec<BillItemView>,
}

// ═══════════════════════════════════════════
// Ledger operations
// ═══════════════════════════════════════════

/// Allocate an unused external bill number (`BILL-` + 6 digits).
pub fn generate_bill_number(conn: &Connection) -> Result<String, DatabaseError> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_NUMBER_ATTEMPTS {
        let candidate = format!("BILL-{:06}", rng.gen_range(0..1_000_000u32));
        if !repository::bill_number_exists(conn, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(DatabaseError::ConstraintViolation(
        "could not allocate a unique bill number".into(),
    ))
}

/// The encounter episode a clinical record's charges land on, with the
/// patient's insurance status. Outpatient records hang directly off an
/// encounter; inpatient records belong to a ward-round review and bill to
/// the admission's encounter.
#[derive(Debug, Clone)]
pub struct BillingEpisode {
    pub encounter_id: Uuid,
    pub is_insured: bool,
}

pub fn episode_for_owner(
    conn: &Connection,
    setting: &CareSetting,
    owner_id: &Uuid,
) -> Result<BillingEpisode, ServiceError> {
    match setting {
        CareSetting::Outpatient => {
            let encounter = repository::get_encounter(conn, owner_id)?
                .ok_or_else(|| ServiceError::not_found("Encounter", owner_id))?;
            let patient = repository::get_patient(conn, &encounter.patient_id)?
                .ok_or_else(|| ServiceError::not_found("Patient", encounter.patient_id))?;
            Ok(BillingEpisode {
                encounter_id: encounter.id,
                is_insured: patient.is_insured,
            })
        }
        CareSetting::Inpatient => {
            let review = repository::get_review(conn, owner_id)?
                .ok_or_else(|| ServiceError::not_found("InpatientReview", owner_id))?;
            let admission = repository::get_admission(conn, &review.admission_id)?
                .ok_or_else(|| ServiceError::not_found("WardAdmission", review.admission_id))?;
            let patient = repository::get_patient(conn, &admission.patient_id)?
                .ok_or_else(|| ServiceError::not_found("Patient", admission.patient_id))?;
            Ok(BillingEpisode {
                encounter_id: admission.encounter_id,
                is_insured: patient.is_insured,
            })
        }
    }
}

/// The encounter's open unpaid bill, created on first use. Callers inside a
/// lifecycle transition share that transaction; this function does not open
/// its own.
pub fn ensure_open_bill(
    conn: &Connection,
    encounter_id: &Uuid,
    is_insured: bool,
) -> Result<Bill, DatabaseError> {
    if let Some(bill) = repository::get_open_unpaid_bill(conn, encounter_id)? {
        return Ok(bill);
    }

    let bill = Bill {
        id: Uuid::new_v4(),
        encounter_id: *encounter_id,
        bill_number: generate_bill_number(conn)?,
        total_amount: 0.0,
        paid_amount: 0.0,
        is_paid: false,
        is_insured,
        created_at: Local::now().naive_local(),
    };
    repository::insert_bill(conn, &bill)?;
    tracing::info!("Opened bill {} for encounter {encounter_id}", bill.bill_number);
    Ok(bill)
}

/// Add one charge line and bring the bill total back in line with the sum of
/// its items.
pub fn add_charge(
    conn: &Connection,
    bill: &Bill,
    item_code: Option<&str>,
    item_name: &str,
    category: &BillItemCategory,
    quantity: f64,
    unit_price: f64,
) -> Result<BillItem, DatabaseError> {
    let item = BillItem {
        id: Uuid::new_v4(),
        bill_id: bill.id,
        item_code: item_code.map(Into::into),
        item_name: item_name.into(),
        category: category.clone(),
        quantity,
        unit_price,
        total_price: unit_price * quantity,
        created_at: Local::now().naive_local(),
    };
    repository::insert_bill_item(conn, &item)?;
    recompute_bill_total(conn, &bill.id)?;
    tracing::info!(
        "Billed {item_name} ({}) at {:.2} on {}",
        category.as_str(),
        item.total_price,
        bill.bill_number
    );
    Ok(item)
}

/// True when a clinical record's charge link still points at an existing
/// bill item. The confirm paths use this as their double-billing safety net.
pub fn has_live_charge(conn: &Connection, link: Option<&Uuid>) -> Result<bool, DatabaseError> {
    match link {
        Some(item_id) => Ok(repository::get_bill_item(conn, item_id)?.is_some()),
        None => Ok(false),
    }
}

/// Remove a charge line, refusing once money has been receipted against it.
/// The bill total is decremented and floored at zero.
pub fn remove_charge(conn: &Connection, item: &BillItem) -> Result<(), ServiceError> {
    let paid = repository::paid_net_of_refunds_for_item(conn, &item.id)?;
    if paid > 0.0 {
        return Err(ServiceError::precondition(
            "Payments have been receipted against this charge; refund them before removing it",
            vec![item.item_name.clone()],
        ));
    }

    let bill = repository::get_bill(conn, &item.bill_id)?
        .ok_or_else(|| ServiceError::not_found("Bill", item.bill_id))?;
    repository::delete_bill_item(conn, &item.id)?;
    let new_total = (bill.total_amount - item.total_price).max(0.0);
    repository::update_bill_total(conn, &bill.id, new_total)?;
    tracing::info!(
        "Removed charge {} ({:.2}) from {}",
        item.item_name,
        item.total_price,
        bill.bill_number
    );
    Ok(())
}

/// Recompute and persist a bill's total from its line items. Returns the
/// settled total.
pub fn recompute_bill_total(conn: &Connection, bill_id: &Uuid) -> Result<f64, DatabaseError> {
    let total = repository::sum_bill_items(conn, bill_id)?;
    repository::update_bill_total(conn, bill_id, total)?;
    Ok(total)
}

/// Bills with a positive total that have not been settled. These gate
/// encounter finalization, claim generation and final discharge.
pub fn unpaid_positive_bills(
    conn: &Connection,
    encounter_id: &Uuid,
) -> Result<Vec<Bill>, DatabaseError> {
    let bills = repository::get_bills_for_encounter(conn, encounter_id)?;
    Ok(bills
        .into_iter()
        .filter(|b| !b.is_paid && b.total_amount > 0.0)
        .collect())
}

/// Record a payment receipt against a bill. Each allocation settles part of
/// one item and may not exceed that item's billed total. The bill flips to
/// paid once cumulative payments reach its total.
pub fn record_receipt(
    conn: &Connection,
    actor: &Actor,
    bill_id: &Uuid,
    allocations: &[PaymentAllocation],
) -> Result<Receipt, ServiceError> {
    let bill = repository::get_bill(conn, bill_id)?
        .ok_or_else(|| ServiceError::not_found("Bill", bill_id))?;

    if allocations.is_empty() {
        return Err(ServiceError::precondition(
            "A receipt must allocate payment to at least one bill item",
            Vec::new(),
        ));
    }

    let mut overpaid = Vec::new();
    for alloc in allocations {
        let item = repository::get_bill_item(conn, &alloc.bill_item_id)?
            .ok_or_else(|| ServiceError::not_found("BillItem", alloc.bill_item_id))?;
        if item.bill_id != bill.id {
            return Err(ServiceError::precondition(
                "Receipt lines must reference charges on the receipted bill",
                vec![item.item_name],
            ));
        }
        if alloc.amount <= 0.0 {
            return Err(ServiceError::precondition(
                "Receipt amounts must be positive",
                vec![item.item_name],
            ));
        }
        if alloc.amount > item.total_price {
            overpaid.push(format!(
                "{} ({:.2} > {:.2})",
                item.item_name, alloc.amount, item.total_price
            ));
        }
    }
    if !overpaid.is_empty() {
        return Err(ServiceError::precondition(
            "Receipt amounts cannot exceed the billed total of their items",
            overpaid,
        ));
    }

    let tx = conn.unchecked_transaction()?;

    let receipt = Receipt {
        id: Uuid::new_v4(),
        bill_id: bill.id,
        receipt_number: generate_receipt_number(),
        refunded: false,
        received_by: Some(actor.name.clone()),
        created_at: Local::now().naive_local(),
    };
    repository::insert_receipt(conn, &receipt)?;

    let mut received = 0.0;
    for alloc in allocations {
        repository::insert_receipt_item(
            conn,
            &ReceiptItem {
                id: Uuid::new_v4(),
                receipt_id: receipt.id,
                bill_item_id: alloc.bill_item_id,
                amount: alloc.amount,
            },
        )?;
        received += alloc.amount;
    }

    let new_paid = bill.paid_amount + received;
    let is_paid = new_paid >= bill.total_amount;
    repository::update_bill_payment(conn, &bill.id, new_paid, is_paid)?;

    tx.commit()?;
    tracing::info!(
        "Receipt {} took {received:.2} on {} (paid {new_paid:.2} of {:.2})",
        receipt.receipt_number,
        bill.bill_number,
        bill.total_amount
    );
    Ok(receipt)
}

/// Bill with per-item paid amounts (net of refunds), remaining balances and
/// cashier-facing service group labels.
pub fn bill_detail(conn: &Connection, bill_id: &Uuid) -> Result<BillDetailView, ServiceError> {
    let bill = repository::get_bill(conn, bill_id)?
        .ok_or_else(|| ServiceError::not_found("Bill", bill_id))?;

    let mut items = Vec::new();
    for item in repository::get_bill_items(conn, &bill.id)? {
        let amount_paid = repository::paid_net_of_refunds_for_item(conn, &item.id)?;
        items.push(BillItemView {
            id: item.id,
            item_code: item.item_code,
            item_name: item.item_name,
            service_group: item.category.service_group(),
            category: item.category,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
            amount_paid,
            remaining: (item.total_price - amount_paid).max(0.0),
        });
    }

    Ok(BillDetailView {
        id: bill.id,
        encounter_id: bill.encounter_id,
        bill_number: bill.bill_number,
        is_insured: bill.is_insured,
        total_amount: bill.total_amount,
        paid_amount: bill.paid_amount,
        is_paid: bill.is_paid,
        items,
    })
}

fn generate_receipt_number() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    format!("RCT-{:06}", rng.gen_range(0..1_000_000u32))
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{get_bill, get_bill_items, insert_encounter, insert_patient};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{EncounterStatus, StaffRole};
    use crate::models::{Encounter, Patient};

    fn cashier() -> Actor {
        Actor {
            id: "STF-100".into(),
            name: "Afia Owusu".into(),
            role: StaffRole::Cashier,
        }
    }

    fn seed_encounter(conn: &Connection, is_insured: bool) -> Uuid {
        let patient = Patient {
            id: Uuid::new_v4(),
            name: "Ama Mensah".into(),
            is_insured,
            insurance_id: is_insured.then(|| "NHIS-001122".to_string()),
            card_number: is_insured.then(|| "CARD-22".to_string()),
            created_at: Local::now().naive_local(),
        };
        insert_patient(conn, &patient).unwrap();

        let encounter = Encounter {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            status: EncounterStatus::InConsultation,
            outcome: None,
            procedure_name: None,
            procedure_gdrg_code: None,
            first_visit_date: None,
            second_visit_date: None,
            created_at: Local::now().naive_local(),
        };
        insert_encounter(conn, &encounter).unwrap();
        encounter.id
    }

    #[test]
    fn bill_numbers_have_the_external_format() {
        let conn = open_memory_database().unwrap();
        let number = generate_bill_number(&conn).unwrap();
        assert!(number.starts_with("BILL-"));
        assert_eq!(number.len(), 11);
        assert!(number[5..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn ensure_open_bill_creates_once_and_reuses() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, true);

        let first = ensure_open_bill(&conn, &encounter_id, true).unwrap();
        assert_eq!(first.total_amount, 0.0);
        assert!(first.is_insured);

        let second = ensure_open_bill(&conn, &encounter_id, true).unwrap();
        assert_eq!(second.id, first.id);
    }

    #[test]
    fn add_charge_keeps_total_equal_to_item_sum() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);
        let bill = ensure_open_bill(&conn, &encounter_id, false).unwrap();

        add_charge(&conn, &bill, Some("AMX500"), "Prescription: Amoxicillin", &BillItemCategory::Product, 2.0, 5.0)
            .unwrap();
        add_charge(&conn, &bill, Some("LAB010"), "Investigation: FBC", &BillItemCategory::Lab, 1.0, 15.0)
            .unwrap();

        let stored = get_bill(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(stored.total_amount, 25.0);
        assert_eq!(get_bill_items(&conn, &bill.id).unwrap().len(), 2);
    }

    #[test]
    fn remove_charge_decrements_total() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);
        let bill = ensure_open_bill(&conn, &encounter_id, false).unwrap();

        let keep = add_charge(&conn, &bill, None, "Consultation", &BillItemCategory::Service, 1.0, 20.0).unwrap();
        let drop = add_charge(&conn, &bill, Some("AMX500"), "Prescription: Amoxicillin", &BillItemCategory::Product, 1.0, 5.0)
            .unwrap();

        remove_charge(&conn, &drop).unwrap();

        let stored = get_bill(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(stored.total_amount, 20.0);
        let remaining = get_bill_items(&conn, &bill.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[test]
    fn remove_charge_refuses_receipted_items() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);
        let bill = ensure_open_bill(&conn, &encounter_id, false).unwrap();
        let item = add_charge(&conn, &bill, Some("AMX500"), "Prescription: Amoxicillin", &BillItemCategory::Product, 1.0, 5.0)
            .unwrap();

        record_receipt(
            &conn,
            &cashier(),
            &bill.id,
            &[PaymentAllocation { bill_item_id: item.id, amount: 5.0 }],
        )
        .unwrap();

        let err = remove_charge(&conn, &item).unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed { .. }));
        assert_eq!(get_bill_items(&conn, &bill.id).unwrap().len(), 1);
    }

    #[test]
    fn receipts_accumulate_until_the_bill_is_paid() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);
        let bill = ensure_open_bill(&conn, &encounter_id, false).unwrap();
        let drug = add_charge(&conn, &bill, Some("AMX500"), "Prescription: Amoxicillin", &BillItemCategory::Product, 1.0, 5.0)
            .unwrap();
        let lab = add_charge(&conn, &bill, Some("LAB010"), "Investigation: FBC", &BillItemCategory::Lab, 1.0, 10.0)
            .unwrap();

        record_receipt(
            &conn,
            &cashier(),
            &bill.id,
            &[PaymentAllocation { bill_item_id: drug.id, amount: 5.0 }],
        )
        .unwrap();
        let partial = get_bill(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(partial.paid_amount, 5.0);
        assert!(!partial.is_paid);

        record_receipt(
            &conn,
            &cashier(),
            &bill.id,
            &[PaymentAllocation { bill_item_id: lab.id, amount: 10.0 }],
        )
        .unwrap();
        let settled = get_bill(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(settled.paid_amount, 15.0);
        assert!(settled.is_paid);
    }

    #[test]
    fn receipt_rejects_overpayment_of_an_item() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);
        let bill = ensure_open_bill(&conn, &encounter_id, false).unwrap();
        let item = add_charge(&conn, &bill, Some("AMX500"), "Prescription: Amoxicillin", &BillItemCategory::Product, 1.0, 5.0)
            .unwrap();

        let err = record_receipt(
            &conn,
            &cashier(),
            &bill.id,
            &[PaymentAllocation { bill_item_id: item.id, amount: 7.5 }],
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed { .. }));

        let stored = get_bill(&conn, &bill.id).unwrap().unwrap();
        assert_eq!(stored.paid_amount, 0.0);
    }

    #[test]
    fn receipt_rejects_items_from_another_bill() {
        let conn = open_memory_database().unwrap();
        let first = seed_encounter(&conn, false);
        let second = seed_encounter(&conn, false);
        let first_bill = ensure_open_bill(&conn, &first, false).unwrap();
        let second_bill = ensure_open_bill(&conn, &second, false).unwrap();
        let foreign = add_charge(&conn, &second_bill, None, "Consultation", &BillItemCategory::Service, 1.0, 20.0)
            .unwrap();

        let err = record_receipt(
            &conn,
            &cashier(),
            &first_bill.id,
            &[PaymentAllocation { bill_item_id: foreign.id, amount: 20.0 }],
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed { .. }));
    }

    #[test]
    fn bill_detail_reports_groups_paid_and_remaining() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, true);
        let bill = ensure_open_bill(&conn, &encounter_id, true).unwrap();
        let drug = add_charge(&conn, &bill, Some("AMX500"), "Prescription: Amoxicillin", &BillItemCategory::Product, 2.0, 5.0)
            .unwrap();
        add_charge(&conn, &bill, Some("OPDC01"), "Diagnosis: Malaria", &BillItemCategory::Drg, 1.0, 20.0)
            .unwrap();

        record_receipt(
            &conn,
            &cashier(),
            &bill.id,
            &[PaymentAllocation { bill_item_id: drug.id, amount: 4.0 }],
        )
        .unwrap();

        let view = bill_detail(&conn, &bill.id).unwrap();
        assert_eq!(view.total_amount, 30.0);
        assert_eq!(view.paid_amount, 4.0);
        assert!(!view.is_paid);
        assert_eq!(view.items.len(), 2);

        let drug_line = view.items.iter().find(|i| i.id == drug.id).unwrap();
        assert_eq!(drug_line.service_group, "Pharmacy");
        assert_eq!(drug_line.amount_paid, 4.0);
        assert_eq!(drug_line.remaining, 6.0);

        let drg_line = view.items.iter().find(|i| i.id != drug.id).unwrap();
        assert_eq!(drg_line.service_group, "Diagnose");
        assert_eq!(drg_line.amount_paid, 0.0);
        assert_eq!(drg_line.remaining, 20.0);
    }
}
