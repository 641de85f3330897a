//! Prescription lifecycle for the pharmacy desk.
//!
//! `Pending → Confirmed → Dispensed`, with unconfirm and return as the
//! explicit reversals. Confirming a prescription is the moment it becomes a
//! charge: the resolved price lands on the episode's open bill and the bill
//! item id is recorded on the prescription. External prescriptions (bought
//! outside the hospital) auto-confirm on creation and never touch the
//! ledger.

use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::billing;
use crate::db::repository;
use crate::errors::ServiceError;
use crate::models::enums::{BillItemCategory, CareSetting};
use crate::models::{Actor, Prescription, PrescriptionState, StateStamp};
use crate::pricing;

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)").unwrap());

// ═══════════════════════════════════════════
// Request types
// ═══════════════════════════════════════════

/// A doctor's medicine order. `owner_id` is the encounter (outpatient) or
/// the ward-round review (inpatient). A missing quantity is filled in from
/// the dose/frequency/duration suggestion.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPrescription {
    pub owner_id: Uuid,
    pub medicine_code: Option<String>,
    pub medicine_name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub unparsed: Option<String>,
    pub quantity: Option<f64>,
    #[serde(default)]
    pub is_external: bool,
}

// ═══════════════════════════════════════════
// Lifecycle operations
// ═══════════════════════════════════════════

pub fn create_prescription(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    req: NewPrescription,
) -> Result<Prescription, ServiceError> {
    // Validates the owner chain up front rather than relying on FK errors.
    billing::episode_for_owner(conn, setting, &req.owner_id)?;

    let quantity = req.quantity.unwrap_or_else(|| {
        suggest_quantity(
            req.dose.as_deref(),
            req.frequency.as_deref(),
            req.duration.as_deref(),
        )
    });

    let state = if req.is_external {
        PrescriptionState::Confirmed { confirmed: stamp(actor) }
    } else {
        PrescriptionState::Pending
    };

    let rx = Prescription {
        id: Uuid::new_v4(),
        owner_id: req.owner_id,
        medicine_code: req.medicine_code,
        medicine_name: req.medicine_name,
        dose: req.dose,
        frequency: req.frequency,
        duration: req.duration,
        unparsed: req.unparsed,
        quantity,
        is_external: req.is_external,
        prescribed_by: actor.id.clone(),
        prescribed_by_name: Some(actor.name.clone()),
        state,
        service_date: None,
        bill_item_id: None,
        created_at: Local::now().naive_local(),
    };
    repository::insert_prescription(conn, setting, &rx)?;
    tracing::info!(
        "Prescription {} created for {} ({})",
        rx.id,
        rx.medicine_name,
        if rx.is_external { "external" } else { "in-house" }
    );
    Ok(rx)
}

/// Confirm a pending prescription and put its charge on the episode's open
/// bill. A zero resolved total confirms without billing.
pub fn confirm_prescription(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    id: &Uuid,
) -> Result<Prescription, ServiceError> {
    let mut rx = repository::get_prescription(conn, setting, id)?
        .ok_or_else(|| ServiceError::not_found("Prescription", id))?;
    if rx.is_external {
        return Err(ServiceError::invalid_state("confirm prescription", "external"));
    }
    if !matches!(rx.state, PrescriptionState::Pending) {
        return Err(ServiceError::invalid_state("confirm prescription", rx.state.tag()));
    }

    let episode = billing::episode_for_owner(conn, setting, &rx.owner_id)?;
    let unit_price = match rx.medicine_code.as_deref() {
        Some(code) => pricing::resolve_price(conn, code, episode.is_insured)?,
        None => 0.0,
    };
    let total = unit_price * rx.quantity;

    let tx = conn.unchecked_transaction()?;

    if total > 0.0 && !billing::has_live_charge(conn, rx.bill_item_id.as_ref())? {
        let bill = billing::ensure_open_bill(conn, &episode.encounter_id, episode.is_insured)?;
        let item = billing::add_charge(
            conn,
            &bill,
            rx.medicine_code.as_deref(),
            &format!("Prescription: {}", rx.medicine_name),
            &BillItemCategory::Product,
            rx.quantity,
            unit_price,
        )?;
        rx.bill_item_id = Some(item.id);
    }

    rx.state = PrescriptionState::Confirmed { confirmed: stamp(actor) };
    repository::update_prescription(conn, setting, &rx)?;
    tx.commit()?;

    tracing::info!("Prescription {} confirmed by {}", rx.id, actor.id);
    Ok(rx)
}

/// Undo a confirmation: removes the linked charge (refused once receipted)
/// and resets the prescription to pending.
pub fn unconfirm_prescription(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    id: &Uuid,
) -> Result<Prescription, ServiceError> {
    let mut rx = repository::get_prescription(conn, setting, id)?
        .ok_or_else(|| ServiceError::not_found("Prescription", id))?;
    if rx.is_external {
        return Err(ServiceError::invalid_state("unconfirm prescription", "external"));
    }
    match rx.state {
        PrescriptionState::Confirmed { .. } => {}
        PrescriptionState::Dispensed { .. } => {
            return Err(ServiceError::invalid_state("unconfirm prescription", "dispensed"));
        }
        PrescriptionState::Pending => {
            return Err(ServiceError::invalid_state("unconfirm prescription", "pending"));
        }
    }

    let tx = conn.unchecked_transaction()?;

    if let Some(item_id) = rx.bill_item_id {
        if let Some(item) = repository::get_bill_item(conn, &item_id)? {
            billing::remove_charge(conn, &item)?;
        }
        rx.bill_item_id = None;
    }

    rx.state = PrescriptionState::Pending;
    repository::update_prescription(conn, setting, &rx)?;
    tx.commit()?;

    tracing::info!("Prescription {} unconfirmed by {}", rx.id, actor.id);
    Ok(rx)
}

/// Hand the medicine over. Outpatient dispensing requires the linked charge
/// to be fully paid; inpatient charges settle at discharge, so the gate is
/// skipped.
pub fn dispense_prescription(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    id: &Uuid,
) -> Result<Prescription, ServiceError> {
    let mut rx = repository::get_prescription(conn, setting, id)?
        .ok_or_else(|| ServiceError::not_found("Prescription", id))?;
    if rx.is_external {
        return Err(ServiceError::invalid_state("dispense prescription", "external"));
    }
    let confirmed = match &rx.state {
        PrescriptionState::Confirmed { confirmed } => confirmed.clone(),
        other => {
            return Err(ServiceError::invalid_state("dispense prescription", other.tag()));
        }
    };

    if *setting == CareSetting::Outpatient {
        if let Some(item_id) = rx.bill_item_id {
            if let Some(item) = repository::get_bill_item(conn, &item_id)? {
                let paid = repository::paid_net_of_refunds_for_item(conn, &item.id)?;
                if item.total_price > 0.0 && paid < item.total_price {
                    return Err(ServiceError::precondition(
                        "Prescription must be fully paid before dispensing",
                        vec![format!(
                            "{}: paid {paid:.2} of {:.2}",
                            item.item_name, item.total_price
                        )],
                    ));
                }
            }
        }
    }

    rx.state = PrescriptionState::Dispensed {
        confirmed,
        dispensed: stamp(actor),
    };
    rx.service_date = Some(Local::now().date_naive());
    repository::update_prescription(conn, setting, &rx)?;

    tracing::info!("Prescription {} dispensed by {}", rx.id, actor.id);
    Ok(rx)
}

/// Take a dispensed medicine back. Drops to confirmed, clearing the
/// dispensing stamp and the service date. Billing is untouched.
pub fn return_prescription(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    id: &Uuid,
) -> Result<Prescription, ServiceError> {
    let mut rx = repository::get_prescription(conn, setting, id)?
        .ok_or_else(|| ServiceError::not_found("Prescription", id))?;
    if rx.is_external {
        return Err(ServiceError::invalid_state("return prescription", "external"));
    }
    let confirmed = match &rx.state {
        PrescriptionState::Dispensed { confirmed, .. } => confirmed.clone(),
        other => {
            return Err(ServiceError::invalid_state("return prescription", other.tag()));
        }
    };

    rx.state = PrescriptionState::Confirmed { confirmed };
    rx.service_date = None;
    repository::update_prescription(conn, setting, &rx)?;

    tracing::info!("Prescription {} returned by {}", rx.id, actor.id);
    Ok(rx)
}

// ═══════════════════════════════════════════
// Quantity suggestion
// ═══════════════════════════════════════════

/// Suggested dispense quantity from the free-text dose, frequency and
/// duration. Units per dose (MG strength divided by 100, MCG by 1000) times
/// doses per day times days, floored at 1. A suggestion only; prescribers
/// override it freely.
pub fn suggest_quantity(
    dose: Option<&str>,
    frequency: Option<&str>,
    duration: Option<&str>,
) -> f64 {
    let units = dose.map(units_per_dose).unwrap_or(1.0);
    let per_day = frequency.map(per_day_from_frequency).unwrap_or(1.0);
    let days = duration.and_then(leading_number).unwrap_or(1.0);
    (units * per_day * days).max(1.0)
}

fn units_per_dose(dose: &str) -> f64 {
    let upper = dose.to_uppercase();
    let number = match leading_number(&upper) {
        Some(n) => n,
        None => return 1.0,
    };
    if upper.contains("MCG") {
        number / 1000.0
    } else if upper.contains("MG") {
        number / 100.0
    } else {
        number
    }
}

fn per_day_from_frequency(frequency: &str) -> f64 {
    let upper = frequency.to_uppercase();
    if upper.contains("6 TIMES") {
        6.0
    } else if upper.contains("5X") {
        5.0
    } else if upper.contains("QDS") || upper.contains("QID") {
        4.0
    } else if upper.contains("TDS") || upper.contains("TID") {
        3.0
    } else if upper.contains("BDS") || upper.contains("BID") {
        2.0
    } else {
        // Nocte, Stat, OD, daily, PRN, every other day, at bed time
        1.0
    }
}

fn leading_number(text: &str) -> Option<f64> {
    LEADING_NUMBER
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn stamp(actor: &Actor) -> StateStamp {
    StateStamp {
        actor_id: actor.id.clone(),
        actor_name: Some(actor.name.clone()),
        at: Local::now().naive_local(),
    }
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{record_receipt, PaymentAllocation};
    use crate::db::repository::{
        get_bill, get_bill_items, get_open_unpaid_bill, insert_admission, insert_encounter,
        insert_patient, insert_product_price, insert_recommendation, insert_review,
    };
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{
        AdmissionStatus, EncounterStatus, RecommendationStatus, StaffRole,
    };
    use crate::models::{
        AdmissionRecommendation, Encounter, InpatientReview, Patient, ProductPrice, WardAdmission,
    };

    fn pharmacist() -> Actor {
        Actor {
            id: "STF-200".into(),
            name: "Kofi Asante".into(),
            role: StaffRole::Pharmacist,
        }
    }

    fn seed_encounter(conn: &Connection, is_insured: bool) -> Uuid {
        let patient = Patient {
            id: Uuid::new_v4(),
            name: "Ama Mensah".into(),
            is_insured,
            insurance_id: is_insured.then(|| "NHIS-001122".to_string()),
            card_number: None,
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

    /// Patient → encounter → recommendation → admission → review, returning
    /// the review id (inpatient prescriptions hang off reviews) and the
    /// admission's encounter id (where the charges land).
    fn seed_review(conn: &Connection, is_insured: bool) -> (Uuid, Uuid) {
        let encounter_id = seed_encounter(conn, is_insured);
        let encounter = crate::db::repository::get_encounter(conn, &encounter_id)
            .unwrap()
            .unwrap();

        let recommendation = AdmissionRecommendation {
            id: Uuid::new_v4(),
            encounter_id,
            ward: "Male Ward".into(),
            status: RecommendationStatus::Confirmed,
            cancelled_by: None,
            cancelled_by_name: None,
            cancellation_reason: None,
            created_at: Local::now().naive_local(),
            updated_at: None,
        };
        insert_recommendation(conn, &recommendation).unwrap();

        let admission = WardAdmission {
            id: Uuid::new_v4(),
            recommendation_id: recommendation.id,
            patient_id: encounter.patient_id,
            encounter_id,
            ward: "Male Ward".into(),
            bed_id: None,
            doctor_id: Some("STF-001".into()),
            doctor_name: Some("Dr. Sarpong".into()),
            status: AdmissionStatus::Confirmed,
            admitted_by: "STF-300".into(),
            admitted_by_name: Some("Akua Nurse".into()),
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
        insert_admission(conn, &admission).unwrap();

        let review = InpatientReview {
            id: Uuid::new_v4(),
            admission_id: admission.id,
            notes: Some("Day 1 round".into()),
            reviewed_by: "STF-001".into(),
            reviewed_by_name: Some("Dr. Sarpong".into()),
            created_at: Local::now().naive_local(),
        };
        insert_review(conn, &review).unwrap();
        (review.id, encounter_id)
    }

    fn seed_product(conn: &Connection, code: &str, base: f64, co_pay: Option<f64>) {
        insert_product_price(
            conn,
            &ProductPrice {
                id: Uuid::new_v4(),
                medication_code: code.into(),
                product_name: format!("Product {code}"),
                base_rate: base,
                co_payment: co_pay,
                claim_amount: None,
                insurance_covered: true,
                is_active: true,
            },
        )
        .unwrap();
    }

    fn order(owner_id: Uuid, code: Option<&str>, quantity: f64) -> NewPrescription {
        NewPrescription {
            owner_id,
            medicine_code: code.map(Into::into),
            medicine_name: "Amoxicillin 500mg".into(),
            dose: Some("1".into()),
            frequency: Some("TDS".into()),
            duration: Some("5 days".into()),
            unparsed: None,
            quantity: Some(quantity),
            is_external: false,
        }
    }

    #[test]
    fn external_prescriptions_auto_confirm_and_never_bill() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);
        seed_product(&conn, "AMX500", 5.0, None);

        let mut req = order(encounter_id, Some("AMX500"), 2.0);
        req.is_external = true;
        let rx = create_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), req).unwrap();

        assert!(matches!(rx.state, PrescriptionState::Confirmed { .. }));
        assert!(rx.bill_item_id.is_none());
        assert!(get_open_unpaid_bill(&conn, &encounter_id).unwrap().is_none());

        let err =
            confirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));
    }

    #[test]
    fn confirm_bills_the_resolved_price_once() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, true);
        seed_product(&conn, "AMX500", 12.0, Some(5.0));

        let rx = create_prescription(
            &conn,
            &CareSetting::Outpatient,
            &pharmacist(),
            order(encounter_id, Some("AMX500"), 2.0),
        )
        .unwrap();
        let confirmed =
            confirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();

        assert!(matches!(confirmed.state, PrescriptionState::Confirmed { .. }));
        let item_id = confirmed.bill_item_id.unwrap();
        let bill = get_open_unpaid_bill(&conn, &encounter_id).unwrap().unwrap();
        assert_eq!(bill.total_amount, 10.0);

        let items = get_bill_items(&conn, &bill.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, item_id);
        assert_eq!(items[0].item_name, "Prescription: Amoxicillin 500mg");

        let err = confirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));
        assert_eq!(get_bill_items(&conn, &bill.id).unwrap().len(), 1);
    }

    #[test]
    fn zero_price_confirms_without_billing() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);

        let rx = create_prescription(
            &conn,
            &CareSetting::Outpatient,
            &pharmacist(),
            order(encounter_id, Some("UNPRICED"), 3.0),
        )
        .unwrap();
        let confirmed =
            confirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();

        assert!(matches!(confirmed.state, PrescriptionState::Confirmed { .. }));
        assert!(confirmed.bill_item_id.is_none());
        assert!(get_open_unpaid_bill(&conn, &encounter_id).unwrap().is_none());
    }

    #[test]
    fn unconfirm_removes_the_charge_and_resets_to_pending() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);
        seed_product(&conn, "AMX500", 5.0, None);

        let rx = create_prescription(
            &conn,
            &CareSetting::Outpatient,
            &pharmacist(),
            order(encounter_id, Some("AMX500"), 2.0),
        )
        .unwrap();
        confirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();

        let reset =
            unconfirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();
        assert!(matches!(reset.state, PrescriptionState::Pending));
        assert!(reset.bill_item_id.is_none());

        let bill = get_open_unpaid_bill(&conn, &encounter_id).unwrap().unwrap();
        assert_eq!(bill.total_amount, 0.0);
        assert!(get_bill_items(&conn, &bill.id).unwrap().is_empty());
    }

    #[test]
    fn unconfirm_is_blocked_once_receipted() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);
        seed_product(&conn, "AMX500", 5.0, None);

        let rx = create_prescription(
            &conn,
            &CareSetting::Outpatient,
            &pharmacist(),
            order(encounter_id, Some("AMX500"), 1.0),
        )
        .unwrap();
        let confirmed =
            confirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();
        let bill = get_open_unpaid_bill(&conn, &encounter_id).unwrap().unwrap();
        record_receipt(
            &conn,
            &pharmacist(),
            &bill.id,
            &[PaymentAllocation {
                bill_item_id: confirmed.bill_item_id.unwrap(),
                amount: 5.0,
            }],
        )
        .unwrap();

        let err = unconfirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed { .. }));

        let still = repository::get_prescription(&conn, &CareSetting::Outpatient, &rx.id)
            .unwrap()
            .unwrap();
        assert!(matches!(still.state, PrescriptionState::Confirmed { .. }));
        assert!(still.bill_item_id.is_some());
    }

    #[test]
    fn outpatient_dispense_requires_full_payment() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);
        seed_product(&conn, "AMX500", 5.0, None);

        let rx = create_prescription(
            &conn,
            &CareSetting::Outpatient,
            &pharmacist(),
            order(encounter_id, Some("AMX500"), 2.0),
        )
        .unwrap();
        let confirmed =
            confirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();

        let err = dispense_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::PreconditionFailed { .. }));

        let bill = get_open_unpaid_bill(&conn, &encounter_id).unwrap().unwrap();
        record_receipt(
            &conn,
            &pharmacist(),
            &bill.id,
            &[PaymentAllocation {
                bill_item_id: confirmed.bill_item_id.unwrap(),
                amount: 10.0,
            }],
        )
        .unwrap();

        let dispensed =
            dispense_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();
        assert!(matches!(dispensed.state, PrescriptionState::Dispensed { .. }));
        assert!(dispensed.service_date.is_some());
        assert!(get_bill(&conn, &bill.id).unwrap().unwrap().is_paid);
    }

    #[test]
    fn inpatient_dispense_skips_the_payment_gate() {
        let conn = open_memory_database().unwrap();
        let (review_id, encounter_id) = seed_review(&conn, false);
        seed_product(&conn, "AMX500", 5.0, None);

        let rx = create_prescription(
            &conn,
            &CareSetting::Inpatient,
            &pharmacist(),
            order(review_id, Some("AMX500"), 2.0),
        )
        .unwrap();
        confirm_prescription(&conn, &CareSetting::Inpatient, &pharmacist(), &rx.id).unwrap();

        // Charge landed on the admission's encounter bill.
        let bill = get_open_unpaid_bill(&conn, &encounter_id).unwrap().unwrap();
        assert_eq!(bill.total_amount, 10.0);

        let dispensed =
            dispense_prescription(&conn, &CareSetting::Inpatient, &pharmacist(), &rx.id).unwrap();
        assert!(matches!(dispensed.state, PrescriptionState::Dispensed { .. }));
    }

    #[test]
    fn return_drops_back_to_confirmed() {
        let conn = open_memory_database().unwrap();
        let encounter_id = seed_encounter(&conn, false);

        let rx = create_prescription(
            &conn,
            &CareSetting::Outpatient,
            &pharmacist(),
            order(encounter_id, None, 1.0),
        )
        .unwrap();
        confirm_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();
        dispense_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();

        let returned =
            return_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id).unwrap();
        assert!(matches!(returned.state, PrescriptionState::Confirmed { .. }));
        assert!(returned.state.dispensed_stamp().is_none());
        assert!(returned.service_date.is_none());

        let err = return_prescription(&conn, &CareSetting::Outpatient, &pharmacist(), &rx.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState { .. }));
    }

    #[test]
    fn quantity_suggestion_multiplies_dose_frequency_duration() {
        assert_eq!(suggest_quantity(Some("1"), Some("TDS"), Some("5 days")), 15.0);
        assert_eq!(suggest_quantity(Some("2 tablets"), Some("BDS"), Some("7 days")), 28.0);
        assert_eq!(suggest_quantity(Some("1"), Some("QID"), Some("3/7")), 12.0);
    }

    #[test]
    fn quantity_suggestion_converts_strength_units() {
        // 500 MG → 5 strength units per dose.
        assert_eq!(suggest_quantity(Some("500 MG"), Some("BDS"), Some("3 days")), 30.0);
        // 500 MCG → 0.5, floored to 1 by the final clamp when alone.
        assert_eq!(suggest_quantity(Some("500 MCG"), None, None), 1.0);
    }

    #[test]
    fn quantity_suggestion_defaults_and_floors_at_one() {
        assert_eq!(suggest_quantity(None, None, None), 1.0);
        assert_eq!(suggest_quantity(Some("no digits"), Some("PRN"), None), 1.0);
        assert_eq!(suggest_quantity(None, Some("Nocte"), Some("10 days")), 10.0);
    }
}
