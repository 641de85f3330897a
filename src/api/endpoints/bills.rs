//! Billing read endpoint.
//!
//! - `GET /api/bills/:id`: bill detail with per-item paid/remaining amounts
//!
//! Receipt recording and refunds stay on the cashier system; this engine
//! only reads their effect on the ledger.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::billing::{self, BillDetailView};

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillDetailView>, ApiError> {
    let conn = ctx.conn()?;
    let view = billing::bill_detail(&conn, &id)?;
    Ok(Json(view))
}
