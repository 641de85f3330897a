//! Investigation endpoints.
//!
//! All routes carry a `?setting=` query parameter selecting the outpatient
//! or inpatient table family.
//!
//! - `POST /api/investigations`: request an investigation
//! - `PUT  /api/investigations/:id/confirm`: accept the sample and bill
//! - `PUT  /api/investigations/:id/cancel`: cancel with a reason
//! - `PUT  /api/investigations/:id/revert`: reopen a completed one
//! - `PUT  /api/investigations/:id/unconfirm`: admin undo of a confirmation
//! - `POST /api/investigations/:id/result`: enter the result text

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SettingQuery};
use crate::laboratory::{self, NewInvestigation};
use crate::models::{Actor, Investigation, InvestigationResult};

#[derive(Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct ResultRequest {
    pub result_text: String,
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Query(scope): Query<SettingQuery>,
    Json(req): Json<NewInvestigation>,
) -> Result<Json<Investigation>, ApiError> {
    let conn = ctx.conn()?;
    let inv = laboratory::create_investigation(&conn, &scope.setting, &actor, req)?;
    Ok(Json(inv))
}

pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(scope): Query<SettingQuery>,
) -> Result<Json<Investigation>, ApiError> {
    let conn = ctx.conn()?;
    let inv = laboratory::confirm_investigation(&conn, &scope.setting, &actor, &id)?;
    Ok(Json(inv))
}

pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(scope): Query<SettingQuery>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Investigation>, ApiError> {
    let conn = ctx.conn()?;
    let inv = laboratory::cancel_investigation(&conn, &scope.setting, &actor, &id, &req.reason)?;
    Ok(Json(inv))
}

pub async fn revert(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(scope): Query<SettingQuery>,
) -> Result<Json<Investigation>, ApiError> {
    let conn = ctx.conn()?;
    let inv = laboratory::revert_investigation(&conn, &scope.setting, &actor, &id)?;
    Ok(Json(inv))
}

pub async fn unconfirm(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(scope): Query<SettingQuery>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Investigation>, ApiError> {
    let conn = ctx.conn()?;
    let inv = laboratory::unconfirm_investigation(&conn, &scope.setting, &actor, &id, &req.reason)?;
    Ok(Json(inv))
}

pub async fn enter_result(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Query(scope): Query<SettingQuery>,
    Json(req): Json<ResultRequest>,
) -> Result<Json<InvestigationResult>, ApiError> {
    let conn = ctx.conn()?;
    let result = laboratory::enter_result(&conn, &scope.setting, &actor, &id, &req.result_text)?;
    Ok(Json(result))
}
