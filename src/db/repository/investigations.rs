use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{CareSetting, InvestigationStatus, InvestigationType};
use crate::models::{Investigation, InvestigationResult};

const COLUMNS: &str = "id, gdrg_code, procedure_name, investigation_type, status, price,
    requested_by, requested_by_name,
    confirmed_by, confirmed_by_name, confirmed_at,
    completed_by, completed_by_name,
    cancelled_by, cancelled_by_name, cancelled_at, cancellation_reason,
    sample_id, service_date, bill_item_id, created_at";

pub fn insert_investigation(
    conn: &Connection,
    setting: &CareSetting,
    inv: &Investigation,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO {} (id, {}, gdrg_code, procedure_name, investigation_type, status, price,
             requested_by, requested_by_name,
             confirmed_by, confirmed_by_name, confirmed_at,
             completed_by, completed_by_name,
             cancelled_by, cancelled_by_name, cancelled_at, cancellation_reason,
             sample_id, service_date, bill_item_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?22)",
            setting.investigation_table(),
            setting.owner_column(),
        ),
        params![
            inv.id.to_string(),
            inv.owner_id.to_string(),
            inv.gdrg_code,
            inv.procedure_name,
            inv.investigation_type.as_str(),
            inv.status.as_str(),
            inv.price,
            inv.requested_by,
            inv.requested_by_name,
            inv.confirmed_by,
            inv.confirmed_by_name,
            inv.confirmed_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            inv.completed_by,
            inv.completed_by_name,
            inv.cancelled_by,
            inv.cancelled_by_name,
            inv.cancelled_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            inv.cancellation_reason,
            inv.sample_id,
            inv.service_date.map(|d| d.to_string()),
            inv.bill_item_id.map(|id| id.to_string()),
            inv.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_investigation(
    conn: &Connection,
    setting: &CareSetting,
    id: &Uuid,
) -> Result<Option<Investigation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, {COLUMNS} FROM {} WHERE id = ?1",
        setting.owner_column(),
        setting.investigation_table(),
    ))?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(investigation_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(investigation_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_investigation(
    conn: &Connection,
    setting: &CareSetting,
    inv: &Investigation,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        &format!(
            "UPDATE {} SET status = ?2, price = ?3,
             confirmed_by = ?4, confirmed_by_name = ?5, confirmed_at = ?6,
             completed_by = ?7, completed_by_name = ?8,
             cancelled_by = ?9, cancelled_by_name = ?10, cancelled_at = ?11,
             cancellation_reason = ?12, sample_id = ?13, service_date = ?14, bill_item_id = ?15
             WHERE id = ?1",
            setting.investigation_table()
        ),
        params![
            inv.id.to_string(),
            inv.status.as_str(),
            inv.price,
            inv.confirmed_by,
            inv.confirmed_by_name,
            inv.confirmed_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            inv.completed_by,
            inv.completed_by_name,
            inv.cancelled_by,
            inv.cancelled_by_name,
            inv.cancelled_at.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            inv.cancellation_reason,
            inv.sample_id,
            inv.service_date.map(|d| d.to_string()),
            inv.bill_item_id.map(|id| id.to_string()),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Investigation", inv.id));
    }
    Ok(())
}

pub fn get_investigations_for_owner(
    conn: &Connection,
    setting: &CareSetting,
    owner_id: &Uuid,
) -> Result<Vec<Investigation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {owner}, {COLUMNS} FROM {} WHERE {owner} = ?1 ORDER BY created_at ASC",
        setting.investigation_table(),
        owner = setting.owner_column(),
    ))?;

    let rows = stmt.query_map(params![owner_id.to_string()], |row| {
        Ok(investigation_row_from_rusqlite(row))
    })?;

    let mut investigations = Vec::new();
    for row in rows {
        investigations.push(investigation_from_row(row??)?);
    }
    Ok(investigations)
}

/// Highest sequence already used under a `YYMM` sample prefix, across both
/// the outpatient and inpatient tables. Zero when the month is untouched.
pub fn max_sample_sequence(conn: &Connection, prefix: &str) -> Result<i64, DatabaseError> {
    let pattern = format!("{prefix}%");
    let max: i64 = conn.query_row(
        "SELECT COALESCE(MAX(CAST(SUBSTR(sample_id, 5) AS INTEGER)), 0) FROM (
             SELECT sample_id FROM investigations
             WHERE sample_id LIKE ?1 AND LENGTH(sample_id) = 9
             UNION ALL
             SELECT sample_id FROM inpatient_investigations
             WHERE sample_id LIKE ?1 AND LENGTH(sample_id) = 9
         )",
        params![pattern],
        |row| row.get(0),
    )?;
    Ok(max)
}

pub fn insert_result(
    conn: &Connection,
    setting: &CareSetting,
    result: &InvestigationResult,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO {} (id, investigation_id, sample_id, result_text, entered_by,
             entered_by_name, entered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            setting.result_table()
        ),
        params![
            result.id.to_string(),
            result.investigation_id.to_string(),
            result.sample_id,
            result.result_text,
            result.entered_by,
            result.entered_by_name,
            result.entered_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

/// Overwrite an existing result row. Used when a result is re-entered after
/// a revert; the row keeps its id, everything else is replaced.
pub fn update_result(
    conn: &Connection,
    setting: &CareSetting,
    result: &InvestigationResult,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        &format!(
            "UPDATE {} SET sample_id = ?2, result_text = ?3, entered_by = ?4,
             entered_by_name = ?5, entered_at = ?6
             WHERE id = ?1",
            setting.result_table()
        ),
        params![
            result.id.to_string(),
            result.sample_id,
            result.result_text,
            result.entered_by,
            result.entered_by_name,
            result.entered_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("InvestigationResult", result.id));
    }
    Ok(())
}

pub fn get_result_for_investigation(
    conn: &Connection,
    setting: &CareSetting,
    investigation_id: &Uuid,
) -> Result<Option<InvestigationResult>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, investigation_id, sample_id, result_text, entered_by, entered_by_name, entered_at
         FROM {} WHERE investigation_id = ?1",
        setting.result_table()
    ))?;

    let result = stmt.query_row(params![investigation_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
        ))
    });

    match result {
        Ok((id, investigation_id, sample_id, result_text, entered_by, entered_by_name, entered_at)) => {
            Ok(Some(InvestigationResult {
                id: Uuid::parse_str(&id)
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
                investigation_id: Uuid::parse_str(&investigation_id)
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
                sample_id,
                result_text,
                entered_by,
                entered_by_name,
                entered_at: NaiveDateTime::parse_from_str(&entered_at, "%Y-%m-%d %H:%M:%S")
                    .unwrap_or_default(),
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// Internal row type for Investigation mapping
struct InvestigationRow {
    owner_id: String,
    id: String,
    gdrg_code: Option<String>,
    procedure_name: Option<String>,
    investigation_type: String,
    status: String,
    price: f64,
    requested_by: String,
    requested_by_name: Option<String>,
    confirmed_by: Option<String>,
    confirmed_by_name: Option<String>,
    confirmed_at: Option<String>,
    completed_by: Option<String>,
    completed_by_name: Option<String>,
    cancelled_by: Option<String>,
    cancelled_by_name: Option<String>,
    cancelled_at: Option<String>,
    cancellation_reason: Option<String>,
    sample_id: Option<String>,
    service_date: Option<String>,
    bill_item_id: Option<String>,
    created_at: String,
}

fn investigation_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<InvestigationRow, rusqlite::Error> {
    Ok(InvestigationRow {
        owner_id: row.get(0)?,
        id: row.get(1)?,
        gdrg_code: row.get(2)?,
        procedure_name: row.get(3)?,
        investigation_type: row.get(4)?,
        status: row.get(5)?,
        price: row.get(6)?,
        requested_by: row.get(7)?,
        requested_by_name: row.get(8)?,
        confirmed_by: row.get(9)?,
        confirmed_by_name: row.get(10)?,
        confirmed_at: row.get(11)?,
        completed_by: row.get(12)?,
        completed_by_name: row.get(13)?,
        cancelled_by: row.get(14)?,
        cancelled_by_name: row.get(15)?,
        cancelled_at: row.get(16)?,
        cancellation_reason: row.get(17)?,
        sample_id: row.get(18)?,
        service_date: row.get(19)?,
        bill_item_id: row.get(20)?,
        created_at: row.get(21)?,
    })
}

fn investigation_from_row(row: InvestigationRow) -> Result<Investigation, DatabaseError> {
    Ok(Investigation {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        owner_id: Uuid::parse_str(&row.owner_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        gdrg_code: row.gdrg_code,
        procedure_name: row.procedure_name,
        investigation_type: InvestigationType::from_str(&row.investigation_type)?,
        status: InvestigationStatus::from_str(&row.status)?,
        price: row.price,
        requested_by: row.requested_by,
        requested_by_name: row.requested_by_name,
        confirmed_by: row.confirmed_by,
        confirmed_by_name: row.confirmed_by_name,
        confirmed_at: row
            .confirmed_at
            .and_then(|dt| NaiveDateTime::parse_from_str(&dt, "%Y-%m-%d %H:%M:%S").ok()),
        completed_by: row.completed_by,
        completed_by_name: row.completed_by_name,
        cancelled_by: row.cancelled_by,
        cancelled_by_name: row.cancelled_by_name,
        cancelled_at: row
            .cancelled_at
            .and_then(|dt| NaiveDateTime::parse_from_str(&dt, "%Y-%m-%d %H:%M:%S").ok()),
        cancellation_reason: row.cancellation_reason,
        sample_id: row.sample_id,
        service_date: row
            .service_date
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        bill_item_id: row.bill_item_id.and_then(|s| Uuid::parse_str(&s).ok()),
        created_at: NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}
