use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::CareSetting;
use crate::models::{Prescription, PrescriptionState, StateStamp};

const COLUMNS: &str = "id, medicine_code, medicine_name, dose, frequency, duration, unparsed,
    quantity, is_external, prescribed_by, prescribed_by_name, state,
    confirmed_by, confirmed_by_name, confirmed_at,
    dispensed_by, dispensed_by_name, dispensed_at,
    service_date, bill_item_id, created_at";

pub fn insert_prescription(
    conn: &Connection,
    setting: &CareSetting,
    rx: &Prescription,
) -> Result<(), DatabaseError> {
    let confirmed = rx.state.confirmed_stamp();
    let dispensed = rx.state.dispensed_stamp();
    conn.execute(
        &format!(
            "INSERT INTO {} (id, {}, medicine_code, medicine_name, dose, frequency, duration,
             unparsed, quantity, is_external, prescribed_by, prescribed_by_name, state,
             confirmed_by, confirmed_by_name, confirmed_at,
             dispensed_by, dispensed_by_name, dispensed_at,
             service_date, bill_item_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?22)",
            setting.prescription_table(),
            setting.owner_column(),
        ),
        params![
            rx.id.to_string(),
            rx.owner_id.to_string(),
            rx.medicine_code,
            rx.medicine_name,
            rx.dose,
            rx.frequency,
            rx.duration,
            rx.unparsed,
            rx.quantity,
            rx.is_external as i32,
            rx.prescribed_by,
            rx.prescribed_by_name,
            rx.state.tag(),
            confirmed.map(|s| s.actor_id.clone()),
            confirmed.and_then(|s| s.actor_name.clone()),
            confirmed.map(|s| s.at.format("%Y-%m-%d %H:%M:%S").to_string()),
            dispensed.map(|s| s.actor_id.clone()),
            dispensed.and_then(|s| s.actor_name.clone()),
            dispensed.map(|s| s.at.format("%Y-%m-%d %H:%M:%S").to_string()),
            rx.service_date.map(|d| d.to_string()),
            rx.bill_item_id.map(|id| id.to_string()),
            rx.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_prescription(
    conn: &Connection,
    setting: &CareSetting,
    id: &Uuid,
) -> Result<Option<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, {COLUMNS} FROM {} WHERE id = ?1",
        setting.owner_column(),
        setting.prescription_table(),
    ))?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(prescription_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(prescription_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Rewrite the mutable columns: quantity, lifecycle state with its stamps,
/// service date and the charge link.
pub fn update_prescription(
    conn: &Connection,
    setting: &CareSetting,
    rx: &Prescription,
) -> Result<(), DatabaseError> {
    let confirmed = rx.state.confirmed_stamp();
    let dispensed = rx.state.dispensed_stamp();
    let rows = conn.execute(
        &format!(
            "UPDATE {} SET quantity = ?2, state = ?3,
             confirmed_by = ?4, confirmed_by_name = ?5, confirmed_at = ?6,
             dispensed_by = ?7, dispensed_by_name = ?8, dispensed_at = ?9,
             service_date = ?10, bill_item_id = ?11
             WHERE id = ?1",
            setting.prescription_table()
        ),
        params![
            rx.id.to_string(),
            rx.quantity,
            rx.state.tag(),
            confirmed.map(|s| s.actor_id.clone()),
            confirmed.and_then(|s| s.actor_name.clone()),
            confirmed.map(|s| s.at.format("%Y-%m-%d %H:%M:%S").to_string()),
            dispensed.map(|s| s.actor_id.clone()),
            dispensed.and_then(|s| s.actor_name.clone()),
            dispensed.map(|s| s.at.format("%Y-%m-%d %H:%M:%S").to_string()),
            rx.service_date.map(|d| d.to_string()),
            rx.bill_item_id.map(|id| id.to_string()),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Prescription", rx.id));
    }
    Ok(())
}

pub fn get_prescriptions_for_owner(
    conn: &Connection,
    setting: &CareSetting,
    owner_id: &Uuid,
) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {owner}, {COLUMNS} FROM {} WHERE {owner} = ?1 ORDER BY created_at ASC",
        setting.prescription_table(),
        owner = setting.owner_column(),
    ))?;

    let rows = stmt.query_map(params![owner_id.to_string()], |row| {
        Ok(prescription_row_from_rusqlite(row))
    })?;

    let mut prescriptions = Vec::new();
    for row in rows {
        prescriptions.push(prescription_from_row(row??)?);
    }
    Ok(prescriptions)
}

// Internal row type for Prescription mapping
struct PrescriptionRow {
    owner_id: String,
    id: String,
    medicine_code: Option<String>,
    medicine_name: String,
    dose: Option<String>,
    frequency: Option<String>,
    duration: Option<String>,
    unparsed: Option<String>,
    quantity: f64,
    is_external: i32,
    prescribed_by: String,
    prescribed_by_name: Option<String>,
    state: String,
    confirmed_by: Option<String>,
    confirmed_by_name: Option<String>,
    confirmed_at: Option<String>,
    dispensed_by: Option<String>,
    dispensed_by_name: Option<String>,
    dispensed_at: Option<String>,
    service_date: Option<String>,
    bill_item_id: Option<String>,
    created_at: String,
}

fn prescription_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<PrescriptionRow, rusqlite::Error> {
    Ok(PrescriptionRow {
        owner_id: row.get(0)?,
        id: row.get(1)?,
        medicine_code: row.get(2)?,
        medicine_name: row.get(3)?,
        dose: row.get(4)?,
        frequency: row.get(5)?,
        duration: row.get(6)?,
        unparsed: row.get(7)?,
        quantity: row.get(8)?,
        is_external: row.get(9)?,
        prescribed_by: row.get(10)?,
        prescribed_by_name: row.get(11)?,
        state: row.get(12)?,
        confirmed_by: row.get(13)?,
        confirmed_by_name: row.get(14)?,
        confirmed_at: row.get(15)?,
        dispensed_by: row.get(16)?,
        dispensed_by_name: row.get(17)?,
        dispensed_at: row.get(18)?,
        service_date: row.get(19)?,
        bill_item_id: row.get(20)?,
        created_at: row.get(21)?,
    })
}

fn stamp_from_columns(
    tag: &str,
    actor_id: Option<String>,
    actor_name: Option<String>,
    at: Option<String>,
) -> Result<StateStamp, DatabaseError> {
    let (actor_id, at) = match (actor_id, at) {
        (Some(actor_id), Some(at)) => (actor_id, at),
        _ => {
            return Err(DatabaseError::ConstraintViolation(format!(
                "prescription in state '{tag}' is missing its actor/timestamp payload"
            )))
        }
    };
    Ok(StateStamp {
        actor_id,
        actor_name,
        at: NaiveDateTime::parse_from_str(&at, "%Y-%m-%d %H:%M:%S").unwrap_or_default(),
    })
}

fn prescription_from_row(row: PrescriptionRow) -> Result<Prescription, DatabaseError> {
    let state = match row.state.as_str() {
        "pending" => PrescriptionState::Pending,
        "confirmed" => PrescriptionState::Confirmed {
            confirmed: stamp_from_columns(
                "confirmed",
                row.confirmed_by,
                row.confirmed_by_name,
                row.confirmed_at,
            )?,
        },
        "dispensed" => PrescriptionState::Dispensed {
            confirmed: stamp_from_columns(
                "dispensed",
                row.confirmed_by,
                row.confirmed_by_name,
                row.confirmed_at,
            )?,
            dispensed: stamp_from_columns(
                "dispensed",
                row.dispensed_by,
                row.dispensed_by_name,
                row.dispensed_at,
            )?,
        },
        other => {
            return Err(DatabaseError::InvalidEnum {
                field: "PrescriptionState".into(),
                value: other.into(),
            })
        }
    };

    Ok(Prescription {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        owner_id: Uuid::parse_str(&row.owner_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        medicine_code: row.medicine_code,
        medicine_name: row.medicine_name,
        dose: row.dose,
        frequency: row.frequency,
        duration: row.duration,
        unparsed: row.unparsed,
        quantity: row.quantity,
        is_external: row.is_external != 0,
        prescribed_by: row.prescribed_by,
        prescribed_by_name: row.prescribed_by_name,
        state,
        service_date: row
            .service_date
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        bill_item_id: row.bill_item_id.and_then(|s| Uuid::parse_str(&s).ok()),
        created_at: NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}
