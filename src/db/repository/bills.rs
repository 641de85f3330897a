use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::BillItemCategory;
use crate::models::{Bill, BillItem, Receipt, ReceiptItem};

pub fn insert_bill(conn: &Connection, bill: &Bill) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bills (id, encounter_id, bill_number, total_amount, paid_amount,
         is_paid, is_insured, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            bill.id.to_string(),
            bill.encounter_id.to_string(),
            bill.bill_number,
            bill.total_amount,
            bill.paid_amount,
            bill.is_paid as i32,
            bill.is_insured as i32,
            bill.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_bill(conn: &Connection, id: &Uuid) -> Result<Option<Bill>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, encounter_id, bill_number, total_amount, paid_amount, is_paid, is_insured, created_at
         FROM bills WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| Ok(bill_row_from_rusqlite(row)));

    match result {
        Ok(row) => Ok(Some(bill_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn bill_number_exists(conn: &Connection, bill_number: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bills WHERE bill_number = ?1",
        params![bill_number],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// The encounter's single open unpaid bill, if one exists. The ledger
/// guarantees at most one.
pub fn get_open_unpaid_bill(
    conn: &Connection,
    encounter_id: &Uuid,
) -> Result<Option<Bill>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, encounter_id, bill_number, total_amount, paid_amount, is_paid, is_insured, created_at
         FROM bills WHERE encounter_id = ?1 AND is_paid = 0
         ORDER BY created_at DESC LIMIT 1",
    )?;

    let result = stmt.query_row(params![encounter_id.to_string()], |row| {
        Ok(bill_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(bill_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bills_for_encounter(
    conn: &Connection,
    encounter_id: &Uuid,
) -> Result<Vec<Bill>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, encounter_id, bill_number, total_amount, paid_amount, is_paid, is_insured, created_at
         FROM bills WHERE encounter_id = ?1 ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![encounter_id.to_string()], |row| {
        Ok(bill_row_from_rusqlite(row))
    })?;

    let mut bills = Vec::new();
    for row in rows {
        bills.push(bill_from_row(row??)?);
    }
    Ok(bills)
}

pub fn update_bill_total(conn: &Connection, id: &Uuid, total: f64) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE bills SET total_amount = ?2 WHERE id = ?1",
        params![id.to_string(), total],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Bill", id));
    }
    Ok(())
}

pub fn update_bill_payment(
    conn: &Connection,
    id: &Uuid,
    paid_amount: f64,
    is_paid: bool,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE bills SET paid_amount = ?2, is_paid = ?3 WHERE id = ?1",
        params![id.to_string(), paid_amount, is_paid as i32],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Bill", id));
    }
    Ok(())
}

pub fn insert_bill_item(conn: &Connection, item: &BillItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO bill_items (id, bill_id, item_code, item_name, category, quantity,
         unit_price, total_price, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            item.id.to_string(),
            item.bill_id.to_string(),
            item.item_code,
            item.item_name,
            item.category.as_str(),
            item.quantity,
            item.unit_price,
            item.total_price,
            item.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_bill_item(conn: &Connection, id: &Uuid) -> Result<Option<BillItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, bill_id, item_code, item_name, category, quantity, unit_price, total_price, created_at
         FROM bill_items WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(bill_item_row_from_rusqlite(row))
    });

    match result {
        Ok(row) => Ok(Some(bill_item_from_row(row?)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bill_items(conn: &Connection, bill_id: &Uuid) -> Result<Vec<BillItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, bill_id, item_code, item_name, category, quantity, unit_price, total_price, created_at
         FROM bill_items WHERE bill_id = ?1 ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![bill_id.to_string()], |row| {
        Ok(bill_item_row_from_rusqlite(row))
    })?;

    let mut items = Vec::new();
    for row in rows {
        items.push(bill_item_from_row(row??)?);
    }
    Ok(items)
}

/// Every charge line across all of an encounter's bills. Used by the
/// finalize-time dedup check (item_code + category).
pub fn get_bill_items_for_encounter(
    conn: &Connection,
    encounter_id: &Uuid,
) -> Result<Vec<BillItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT bi.id, bi.bill_id, bi.item_code, bi.item_name, bi.category, bi.quantity,
         bi.unit_price, bi.total_price, bi.created_at
         FROM bill_items bi JOIN bills b ON b.id = bi.bill_id
         WHERE b.encounter_id = ?1 ORDER BY bi.created_at ASC",
    )?;

    let rows = stmt.query_map(params![encounter_id.to_string()], |row| {
        Ok(bill_item_row_from_rusqlite(row))
    })?;

    let mut items = Vec::new();
    for row in rows {
        items.push(bill_item_from_row(row??)?);
    }
    Ok(items)
}

pub fn delete_bill_item(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "DELETE FROM bill_items WHERE id = ?1",
        params![id.to_string()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("BillItem", id));
    }
    Ok(())
}

pub fn sum_bill_items(conn: &Connection, bill_id: &Uuid) -> Result<f64, DatabaseError> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(total_price), 0) FROM bill_items WHERE bill_id = ?1",
        params![bill_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(total)
}

pub fn insert_receipt(conn: &Connection, receipt: &Receipt) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO receipts (id, bill_id, receipt_number, refunded, received_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            receipt.id.to_string(),
            receipt.bill_id.to_string(),
            receipt.receipt_number,
            receipt.refunded as i32,
            receipt.received_by,
            receipt.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

pub fn insert_receipt_item(conn: &Connection, item: &ReceiptItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO receipt_items (id, receipt_id, bill_item_id, amount)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            item.id.to_string(),
            item.receipt_id.to_string(),
            item.bill_item_id.to_string(),
            item.amount,
        ],
    )?;
    Ok(())
}

pub fn get_receipts_for_bill(
    conn: &Connection,
    bill_id: &Uuid,
) -> Result<Vec<Receipt>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, bill_id, receipt_number, refunded, received_by, created_at
         FROM receipts WHERE bill_id = ?1 ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![bill_id.to_string()], |row| {
        Ok(Receipt {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap_or_default(),
            bill_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap_or_default(),
            receipt_number: row.get(2)?,
            refunded: row.get::<_, i32>(3)? != 0,
            received_by: row.get(4)?,
            created_at: NaiveDateTime::parse_from_str(
                &row.get::<_, String>(5)?,
                "%Y-%m-%d %H:%M:%S",
            )
            .unwrap_or_default(),
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Sum of receipt lines against the bill, skipping refunded receipts.
pub fn paid_net_of_refunds_for_bill(
    conn: &Connection,
    bill_id: &Uuid,
) -> Result<f64, DatabaseError> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(ri.amount), 0)
         FROM receipt_items ri JOIN receipts r ON r.id = ri.receipt_id
         WHERE r.bill_id = ?1 AND r.refunded = 0",
        params![bill_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Sum of receipt lines against one bill item, skipping refunded receipts.
pub fn paid_net_of_refunds_for_item(
    conn: &Connection,
    bill_item_id: &Uuid,
) -> Result<f64, DatabaseError> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(ri.amount), 0)
         FROM receipt_items ri JOIN receipts r ON r.id = ri.receipt_id
         WHERE ri.bill_item_id = ?1 AND r.refunded = 0",
        params![bill_item_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(total)
}

// Internal row type for Bill mapping
struct BillRow {
    id: String,
    encounter_id: String,
    bill_number: String,
    total_amount: f64,
    paid_amount: f64,
    is_paid: i32,
    is_insured: i32,
    created_at: String,
}

fn bill_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<BillRow, rusqlite::Error> {
    Ok(BillRow {
        id: row.get(0)?,
        encounter_id: row.get(1)?,
        bill_number: row.get(2)?,
        total_amount: row.get(3)?,
        paid_amount: row.get(4)?,
        is_paid: row.get(5)?,
        is_insured: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn bill_from_row(row: BillRow) -> Result<Bill, DatabaseError> {
    Ok(Bill {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        encounter_id: Uuid::parse_str(&row.encounter_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        bill_number: row.bill_number,
        total_amount: row.total_amount,
        paid_amount: row.paid_amount,
        is_paid: row.is_paid != 0,
        is_insured: row.is_insured != 0,
        created_at: NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}

// Internal row type for BillItem mapping
struct BillItemRow {
    id: String,
    bill_id: String,
    item_code: Option<String>,
    item_name: String,
    category: String,
    quantity: f64,
    unit_price: f64,
    total_price: f64,
    created_at: String,
}

fn bill_item_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<BillItemRow, rusqlite::Error> {
    Ok(BillItemRow {
        id: row.get(0)?,
        bill_id: row.get(1)?,
        item_code: row.get(2)?,
        item_name: row.get(3)?,
        category: row.get(4)?,
        quantity: row.get(5)?,
        unit_price: row.get(6)?,
        total_price: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn bill_item_from_row(row: BillItemRow) -> Result<BillItem, DatabaseError> {
    Ok(BillItem {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        bill_id: Uuid::parse_str(&row.bill_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        item_code: row.item_code,
        item_name: row.item_name,
        category: BillItemCategory::from_str(&row.category)?,
        quantity: row.quantity,
        unit_price: row.unit_price,
        total_price: row.total_price,
        created_at: NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default(),
    })
}
