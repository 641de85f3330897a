//! Prescription endpoints.
//!
//! All routes carry a `?setting=` query parameter selecting the outpatient
//! or inpatient table family.
//!
//! - `POST /api/prescriptions`: record a prescription
//! - `PUT  /api/prescriptions/:id/confirm`: price and bill it
//! - `PUT  /api/prescriptions/:id/unconfirm`: undo confirmation
//! - `PUT  /api/prescriptions/:id/dispense`: hand over the medicine
//! - `PUT  /api/prescriptions/:id/return`: take the medicine back

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SettingQuery};
use crate::models::{Actor, Prescription};
use crate::pharmacy::{self, NewPrescription};

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Query(scope): Query<SettingQuery>,
    Json(req): Json<NewPrescription>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.conn()?;
    let rx = pharmacy::create_prescription(&conn, &scope.setting, &actor, req)?;
    Ok(Json(rx))
}

pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(scope): Query<SettingQuery>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.conn()?;
    let rx = pharmacy::confirm_prescription(&conn, &scope.setting, &actor, &id)?;
    Ok(Json(rx))
}

pub async fn unconfirm(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(scope): Query<SettingQuery>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.conn()?;
    let rx = pharmacy::unconfirm_prescription(&conn, &scope.setting, &actor, &id)?;
    Ok(Json(rx))
}

pub async fn dispense(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(scope): Query<SettingQuery>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.conn()?;
    let rx = pharmacy::dispense_prescription(&conn, &scope.setting, &actor, &id)?;
    Ok(Json(rx))
}

pub async fn return_prescription(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(scope): Query<SettingQuery>,
) -> Result<Json<Prescription>, ApiError> {
    let conn = ctx.conn()?;
    let rx = pharmacy::return_prescription(&conn, &scope.setting, &actor, &id)?;
    Ok(Json(rx))
}
