use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{DrgCatalog, DrgPrice, ProductPrice};

pub fn insert_drg_price(
    conn: &Connection,
    catalog: &DrgCatalog,
    price: &DrgPrice,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO {} (id, gdrg_code, service_name, base_rate, nhia_app, co_payment, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            catalog.table()
        ),
        params![
            price.id.to_string(),
            price.gdrg_code,
            price.service_name,
            price.base_rate,
            price.nhia_app,
            price.co_payment,
            price.is_active as i32,
        ],
    )?;
    Ok(())
}

/// Active row for a G-DRG code in one catalog. Codes are matched
/// case-insensitively, as catalog uploads are inconsistent about casing.
pub fn get_drg_price(
    conn: &Connection,
    catalog: &DrgCatalog,
    gdrg_code: &str,
) -> Result<Option<DrgPrice>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, gdrg_code, service_name, base_rate, nhia_app, co_payment, is_active
         FROM {} WHERE LOWER(gdrg_code) = LOWER(?1) AND is_active = 1 LIMIT 1",
        catalog.table()
    ))?;

    let result = stmt.query_row(params![gdrg_code], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, Option<f64>>(4)?,
            row.get::<_, Option<f64>>(5)?,
            row.get::<_, i32>(6)?,
        ))
    });

    match result {
        Ok((id, gdrg_code, service_name, base_rate, nhia_app, co_payment, is_active)) => {
            Ok(Some(DrgPrice {
                id: Uuid::parse_str(&id)
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
                gdrg_code,
                service_name,
                base_rate,
                nhia_app,
                co_payment,
                is_active: is_active != 0,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn insert_product_price(conn: &Connection, price: &ProductPrice) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO product_prices (id, medication_code, product_name, base_rate, co_payment,
         claim_amount, insurance_covered, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            price.id.to_string(),
            price.medication_code,
            price.product_name,
            price.base_rate,
            price.co_payment,
            price.claim_amount,
            if price.insurance_covered { "yes" } else { "no" },
            price.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_product_price(
    conn: &Connection,
    medication_code: &str,
) -> Result<Option<ProductPrice>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, medication_code, product_name, base_rate, co_payment, claim_amount,
         insurance_covered, is_active
         FROM product_prices WHERE LOWER(medication_code) = LOWER(?1) AND is_active = 1 LIMIT 1",
    )?;

    let result = stmt.query_row(params![medication_code], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, Option<f64>>(4)?,
            row.get::<_, Option<f64>>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, i32>(7)?,
        ))
    });

    match result {
        Ok((id, code, name, base_rate, co_payment, claim_amount, covered, is_active)) => {
            Ok(Some(ProductPrice {
                id: Uuid::parse_str(&id)
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
                medication_code: code,
                product_name: name,
                base_rate,
                co_payment,
                claim_amount,
                insurance_covered: !covered.eq_ignore_ascii_case("no"),
                is_active: is_active != 0,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
