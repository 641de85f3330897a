//! NHIA claim endpoints.
//!
//! - `POST /api/claims`: generate a claim from a finalized episode
//! - `POST /api/claims/:id/regenerate`: rebuild an open claim from source
//! - `GET  /api/claims/:id`: edit view (stored rows or live derivation)
//! - `PUT  /api/claims/:id`: persist hand edits
//! - `PUT  /api/claims/:id/finalize`: lock for submission
//! - `PUT  /api/claims/:id/reopen`: unlock for corrections
//! - `GET  /api/claims/eligible`: claimable episodes, filterable

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::claims::{self, ClaimEditView, ClaimUpdate, EligibleFilter, EligibleSource, GenerateClaim};
use crate::models::{Actor, Claim};

pub async fn generate(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<GenerateClaim>,
) -> Result<Json<Claim>, ApiError> {
    let conn = ctx.conn()?;
    let claim = claims::generate_claim(&conn, &actor, req)?;
    Ok(Json(claim))
}

pub async fn regenerate(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Claim>, ApiError> {
    let conn = ctx.conn()?;
    let claim = claims::regenerate_claim(&conn, &actor, &id)?;
    Ok(Json(claim))
}

pub async fn edit_view(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimEditView>, ApiError> {
    let conn = ctx.conn()?;
    let view = claims::claim_edit_view(&conn, &id)?;
    Ok(Json(view))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClaimUpdate>,
) -> Result<Json<Claim>, ApiError> {
    let conn = ctx.conn()?;
    let claim = claims::update_claim_details(&conn, &actor, &id, req)?;
    Ok(Json(claim))
}

pub async fn finalize(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Claim>, ApiError> {
    let conn = ctx.conn()?;
    let claim = claims::finalize_claim(&conn, &actor, &id)?;
    Ok(Json(claim))
}

pub async fn reopen(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Claim>, ApiError> {
    let conn = ctx.conn()?;
    let claim = claims::reopen_claim(&conn, &actor, &id)?;
    Ok(Json(claim))
}

pub async fn eligible(
    State(ctx): State<ApiContext>,
    Query(filter): Query<EligibleFilter>,
) -> Result<Json<Vec<EligibleSource>>, ApiError> {
    let conn = ctx.conn()?;
    let sources = claims::eligible_sources(&conn, &filter)?;
    Ok(Json(sources))
}
