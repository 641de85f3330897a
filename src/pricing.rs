//! Price resolution against the rate catalogs.
//!
//! One lookup path for everything that carries a charge: G-DRG coded items
//! (procedures, surgeries, unmapped DRGs, in that order) then pharmacy
//! products by medication code. Insured and cash patients resolve to
//! different amounts, and the two catalog families treat a missing
//! co-payment differently. That asymmetry is a tariff rule, not an accident.

use rusqlite::Connection;

use crate::db::{repository, DatabaseError};
use crate::models::DrgCatalog;

/// Amount to charge the patient for an item code.
///
/// G-DRG catalogs: insured patients pay the co-payment when one is set,
/// otherwise the base rate. Products: a row flagged not-insurance-covered
/// always charges its base rate; an insured patient on a covered product
/// pays the co-payment or nothing at all (never the base rate); cash
/// patients pay the base rate. No active row anywhere resolves to zero.
pub fn resolve_price(
    conn: &Connection,
    item_code: &str,
    is_insured: bool,
) -> Result<f64, DatabaseError> {
    resolve_with_catalogs(conn, item_code, is_insured, DrgCatalog::lookup_order())
}

/// Same resolution, but the surgery catalog is consulted first. Used when
/// pricing a recorded surgical procedure on admission.
pub fn resolve_surgery_price(
    conn: &Connection,
    item_code: &str,
    is_insured: bool,
) -> Result<f64, DatabaseError> {
    resolve_with_catalogs(conn, item_code, is_insured, DrgCatalog::surgery_first_order())
}

fn resolve_with_catalogs(
    conn: &Connection,
    item_code: &str,
    is_insured: bool,
    catalogs: [DrgCatalog; 3],
) -> Result<f64, DatabaseError> {
    for catalog in catalogs {
        if let Some(price) = repository::get_drg_price(conn, &catalog, item_code)? {
            if is_insured {
                if let Some(co_payment) = price.co_payment {
                    return Ok(co_payment);
                }
            }
            return Ok(price.base_rate);
        }
    }

    if let Some(product) = repository::get_product_price(conn, item_code)? {
        if !product.insurance_covered {
            return Ok(product.base_rate);
        }
        if is_insured {
            return Ok(product.co_payment.unwrap_or(0.0));
        }
        return Ok(product.base_rate);
    }

    tracing::warn!("No active price for code {item_code}, treating as zero charge");
    Ok(0.0)
}

/// Amount the NHIA reimburses for an item on an insured claim.
///
/// Only meaningful for insured episodes: G-DRG catalogs return the approved
/// tariff (falling back to base rate), products return the claim amount
/// (falling back to base rate). Non-insured or unknown codes claim nothing.
pub fn resolve_claim_amount(
    conn: &Connection,
    item_code: &str,
    is_insured: bool,
) -> Result<f64, DatabaseError> {
    if !is_insured {
        return Ok(0.0);
    }

    for catalog in DrgCatalog::lookup_order() {
        if let Some(price) = repository::get_drg_price(conn, &catalog, item_code)? {
            return Ok(price.nhia_app.unwrap_or(price.base_rate));
        }
    }

    if let Some(product) = repository::get_product_price(conn, item_code)? {
        return Ok(product.claim_amount.unwrap_or(product.base_rate));
    }

    Ok(0.0)
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
