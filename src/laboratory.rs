//! Investigation lifecycle for the lab, scan and x-ray desks.
//!
//! `requested → confirmed → completed`, with cancel from the first two
//! states, an admin-only unconfirm, and a privileged revert out of
//! completed. Confirmation is the billing moment and, for lab work, the
//! moment the sample identifier is issued. Completion is implicit: entering
//! a result completes the investigation.

use chrono::Local;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::billing;
use crate::db::{repository, DatabaseError};
use crate::errors::ServiceError;
use crate::models::enums::{CareSetting, InvestigationStatus, InvestigationType, StaffRole};
use crate::models::{Actor, Investigation, InvestigationResult};
use crate::pricing;

// ═══════════════════════════════════════════
// Request types
// ═══════════════════════════════════════════

/// A doctor's investigation request. `price` captures the rate quoted at
/// request time and is only a fallback when the catalog has no usable rate
/// at confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvestigation {
    pub owner_id: Uuid,
    pub gdrg_code: Option<String>,
    pub procedure_name: Option<String>,
    pub investigation_type: InvestigationType,
    #[serde(default)]
    pub price: f64,
}

// ═══════════════════════════════════════════
// Lifecycle operations
// ═══════════════════════════════════════════

pub fn create_investigation(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    req: NewInvestigation,
) -> Result<Investigation, ServiceError> {
    billing::episode_for_owner(conn, setting, &req.owner_id)?;

    let inv = Investigation {
        id: Uuid::new_v4(),
        owner_id: req.owner_id,
        gdrg_code: req.gdrg_code,
        procedure_name: req.procedure_name,
        investigation_type: req.investigation_type,
        status: InvestigationStatus::Requested,
        price: req.price,
        requested_by: actor.id.clone(),
        requested_by_name: Some(actor.name.clone()),
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
        service_date: None,
        bill_item_id: None,
        created_at: Local::now().naive_local(),
    };
    repository::insert_investigation(conn, setting, &inv)?;
    tracing::info!(
        "Investigation {} requested ({})",
        inv.id,
        inv.investigation_type.as_str()
    );
    Ok(inv)
}

/// Confirm a requested investigation: role-gated, issues the lab sample id
/// on first confirm, resolves the price and puts the charge on the
/// episode's open bill.
pub fn confirm_investigation(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    id: &Uuid,
) -> Result<Investigation, ServiceError> {
    let mut inv = repository::get_investigation(conn, setting, id)?
        .ok_or_else(|| ServiceError::not_found("Investigation", id))?;
    match inv.status {
        InvestigationStatus::Requested => {}
        ref other => {
            return Err(ServiceError::invalid_state("confirm investigation", other.as_str()));
        }
    }

    let required = inv.investigation_type.servicing_role();
    if !actor.can_act_as(&required) {
        return Err(ServiceError::Forbidden(format!(
            "Role {} may not confirm {} investigations",
            actor.role.as_str(),
            inv.investigation_type.as_str()
        )));
    }

    let episode = billing::episode_for_owner(conn, setting, &inv.owner_id)?;

    // Sample ids are issued exactly once; an existing one survives
    // unconfirm/reconfirm cycles.
    if inv.investigation_type == InvestigationType::Lab
        && inv.sample_id.as_deref().map_or(true, str::is_empty)
    {
        inv.sample_id = Some(next_sample_id(conn)?);
    }

    let catalog = match inv.gdrg_code.as_deref() {
        Some(code) => pricing::resolve_price(conn, code, episode.is_insured)?,
        None => 0.0,
    };
    let unit_price = if catalog > 0.0 {
        catalog
    } else if inv.price > 0.0 {
        inv.price
    } else {
        0.0
    };

    let tx = conn.unchecked_transaction()?;

    if unit_price > 0.0 && !billing::has_live_charge(conn, inv.bill_item_id.as_ref())? {
        let bill = billing::ensure_open_bill(conn, &episode.encounter_id, episode.is_insured)?;
        let item = billing::add_charge(
            conn,
            &bill,
            inv.gdrg_code.as_deref(),
            &format!("Investigation: {}", display_name(&inv)),
            &inv.investigation_type.category(),
            1.0,
            unit_price,
        )?;
        inv.bill_item_id = Some(item.id);
    } else if unit_price <= 0.0 {
        tracing::warn!(
            "No price resolved for investigation {}; confirming with zero charge",
            inv.id
        );
    }

    inv.status = InvestigationStatus::Confirmed;
    inv.confirmed_by = Some(actor.id.clone());
    inv.confirmed_by_name = Some(actor.name.clone());
    inv.confirmed_at = Some(Local::now().naive_local());
    inv.service_date = Some(Local::now().date_naive());
    repository::update_investigation(conn, setting, &inv)?;
    tx.commit()?;

    tracing::info!("Investigation {} confirmed by {}", inv.id, actor.id);
    Ok(inv)
}

/// Record the outcome of a confirmed investigation. This is the implicit
/// completion transition; re-entry on a completed investigation requires a
/// revert first. The result keeps the investigation's sample id.
pub fn enter_result(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    id: &Uuid,
    result_text: &str,
) -> Result<InvestigationResult, ServiceError> {
    let mut inv = repository::get_investigation(conn, setting, id)?
        .ok_or_else(|| ServiceError::not_found("Investigation", id))?;
    match inv.status {
        InvestigationStatus::Confirmed => {}
        ref other => {
            return Err(ServiceError::invalid_state("enter result", other.as_str()));
        }
    }

    let required = inv.investigation_type.servicing_role();
    if !actor.can_act_as(&required) {
        return Err(ServiceError::Forbidden(format!(
            "Role {} may not enter {} results",
            actor.role.as_str(),
            inv.investigation_type.as_str()
        )));
    }

    if result_text.trim().is_empty() {
        return Err(ServiceError::precondition("Result text is required", Vec::new()));
    }

    let tx = conn.unchecked_transaction()?;

    let result = match repository::get_result_for_investigation(conn, setting, &inv.id)? {
        Some(existing) => {
            let replaced = InvestigationResult {
                id: existing.id,
                investigation_id: inv.id,
                sample_id: inv.sample_id.clone(),
                result_text: result_text.into(),
                entered_by: actor.id.clone(),
                entered_by_name: Some(actor.name.clone()),
                entered_at: Local::now().naive_local(),
            };
            repository::update_result(conn, setting, &replaced)?;
            replaced
        }
        None => {
            let created = InvestigationResult {
                id: Uuid::new_v4(),
                investigation_id: inv.id,
                sample_id: inv.sample_id.clone(),
                result_text: result_text.into(),
                entered_by: actor.id.clone(),
                entered_by_name: Some(actor.name.clone()),
                entered_at: Local::now().naive_local(),
            };
            repository::insert_result(conn, setting, &created)?;
            created
        }
    };

    inv.status = InvestigationStatus::Completed;
    inv.completed_by = Some(actor.id.clone());
    inv.completed_by_name = Some(actor.name.clone());
    repository::update_investigation(conn, setting, &inv)?;
    tx.commit()?;

    tracing::info!("Investigation {} completed by {}", inv.id, actor.id);
    Ok(result)
}

/// Reopen a completed investigation for correction. Restricted to the lab
/// head or an admin. The charge stays on the bill.
pub fn revert_investigation(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    id: &Uuid,
) -> Result<Investigation, ServiceError> {
    if !(actor.is_admin() || actor.role == StaffRole::LabHead) {
        return Err(ServiceError::Forbidden(
            "Only the lab head or an admin may revert a completed investigation".into(),
        ));
    }

    let mut inv = repository::get_investigation(conn, setting, id)?
        .ok_or_else(|| ServiceError::not_found("Investigation", id))?;
    match inv.status {
        InvestigationStatus::Completed => {}
        ref other => {
            return Err(ServiceError::invalid_state("revert investigation", other.as_str()));
        }
    }

    inv.status = InvestigationStatus::Confirmed;
    inv.completed_by = None;
    inv.completed_by_name = None;
    repository::update_investigation(conn, setting, &inv)?;

    tracing::info!("Investigation {} reverted to confirmed by {}", inv.id, actor.id);
    Ok(inv)
}

/// Cancel a requested or confirmed investigation. The reason is mandatory.
/// A confirmed investigation's bill item is left in place; removing the
/// charge is a deliberate staff action, not a side effect.
pub fn cancel_investigation(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    id: &Uuid,
    reason: &str,
) -> Result<Investigation, ServiceError> {
    if reason.trim().is_empty() {
        return Err(ServiceError::precondition(
            "A cancellation reason is required",
            Vec::new(),
        ));
    }

    let mut inv = repository::get_investigation(conn, setting, id)?
        .ok_or_else(|| ServiceError::not_found("Investigation", id))?;
    match inv.status {
        InvestigationStatus::Requested | InvestigationStatus::Confirmed => {}
        ref other => {
            return Err(ServiceError::invalid_state("cancel investigation", other.as_str()));
        }
    }

    inv.status = InvestigationStatus::Cancelled;
    inv.cancelled_by = Some(actor.id.clone());
    inv.cancelled_by_name = Some(actor.name.clone());
    inv.cancelled_at = Some(Local::now().naive_local());
    inv.cancellation_reason = Some(reason.into());
    repository::update_investigation(conn, setting, &inv)?;

    tracing::info!("Investigation {} cancelled by {}: {reason}", inv.id, actor.id);
    Ok(inv)
}

/// Push a confirmed investigation back to requested. Admin only, reason
/// required; the linked charge is removed under the same receipt guard as a
/// prescription unconfirm.
pub fn unconfirm_investigation(
    conn: &Connection,
    setting: &CareSetting,
    actor: &Actor,
    id: &Uuid,
    reason: &str,
) -> Result<Investigation, ServiceError> {
    if !actor.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only an admin may unconfirm an investigation".into(),
        ));
    }
    if reason.trim().is_empty() {
        return Err(ServiceError::precondition(
            "A reason is required to unconfirm an investigation",
            Vec::new(),
        ));
    }

    let mut inv = repository::get_investigation(conn, setting, id)?
        .ok_or_else(|| ServiceError::not_found("Investigation", id))?;
    match inv.status {
        InvestigationStatus::Confirmed => {}
        ref other => {
            return Err(ServiceError::invalid_state("unconfirm investigation", other.as_str()));
        }
    }

    let tx = conn.unchecked_transaction()?;

    if let Some(item_id) = inv.bill_item_id {
        if let Some(item) = repository::get_bill_item(conn, &item_id)? {
            billing::remove_charge(conn, &item)?;
        }
        inv.bill_item_id = None;
    }

    inv.status = InvestigationStatus::Requested;
    inv.confirmed_by = None;
    inv.confirmed_by_name = None;
    inv.confirmed_at = None;
    inv.service_date = None;
    repository::update_investigation(conn, setting, &inv)?;
    tx.commit()?;

    tracing::info!("Investigation {} unconfirmed by {}: {reason}", inv.id, actor.id);
    Ok(inv)
}

// ═══════════════════════════════════════════
// Sample identifiers
// ═══════════════════════════════════════════

/// Next lab sample id: 2-digit year, 2-digit month, then a 5-digit sequence
/// unique for that month across the outpatient and inpatient tables.
fn next_sample_id(conn: &Connection) -> Result<String, DatabaseError> {
    let prefix = Local::now().format("%y%m").to_string();
    let sequence = repository::max_sample_sequence(conn, &prefix)? + 1;
    Ok(format!("{prefix}{sequence:05}"))
}

fn display_name(inv: &Investigation) -> String {
    inv.procedure_name
        .clone()
        .or_else(|| inv.gdrg_code.clone())
        .unwrap_or_else(|| "Unnamed".into())
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
