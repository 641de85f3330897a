//! Consultation endpoints.
//!
//! - `POST /api/encounters/:id/diagnoses`: record a diagnosis
//! - `PUT  /api/encounters/:id/procedure`: record the performed procedure
//! - `PUT  /api/encounters/:id/outcome`: save the consultation outcome
//! - `PUT  /api/encounters/:id/finalize`: close the encounter

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::consultation::{self, NewDiagnosis, OutcomeRequest};
use crate::models::{Actor, Diagnosis, Encounter};

pub async fn add_diagnosis(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(encounter_id): Path<Uuid>,
    Json(req): Json<NewDiagnosis>,
) -> Result<Json<Diagnosis>, ApiError> {
    let conn = ctx.conn()?;
    let diagnosis = consultation::add_diagnosis(&conn, &actor, &encounter_id, req)?;
    Ok(Json(diagnosis))
}

#[derive(Deserialize)]
pub struct ProcedureRequest {
    pub procedure_name: String,
    pub procedure_gdrg_code: Option<String>,
}

pub async fn record_procedure(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(encounter_id): Path<Uuid>,
    Json(req): Json<ProcedureRequest>,
) -> Result<Json<Encounter>, ApiError> {
    let conn = ctx.conn()?;
    let encounter = consultation::record_procedure(
        &conn,
        &actor,
        &encounter_id,
        &req.procedure_name,
        req.procedure_gdrg_code.as_deref(),
    )?;
    Ok(Json(encounter))
}

pub async fn save_outcome(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(encounter_id): Path<Uuid>,
    Json(req): Json<OutcomeRequest>,
) -> Result<Json<Encounter>, ApiError> {
    let conn = ctx.conn()?;
    let encounter = consultation::save_outcome(&conn, &actor, &encounter_id, req)?;
    Ok(Json(encounter))
}

pub async fn finalize(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(encounter_id): Path<Uuid>,
) -> Result<Json<Encounter>, ApiError> {
    let conn = ctx.conn()?;
    let encounter = consultation::finalize_encounter(&conn, &actor, &encounter_id)?;
    Ok(Json(encounter))
}
