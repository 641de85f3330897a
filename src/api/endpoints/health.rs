//! Liveness endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub schema_tables: i64,
    pub version: &'static str,
}

/// `GET /api/health` confirms the service is up and the schema is reachable.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let conn = ctx.conn()?;
    let tables = db::count_tables(&conn)?;
    Ok(Json(HealthResponse {
        status: "ok",
        schema_tables: tables,
        version: crate::config::APP_VERSION,
    }))
}
