//! Ward admission endpoints.
//!
//! - `POST /api/admissions`: confirm a recommendation into an admission
//! - `POST /api/admissions/:id/reviews`: record a ward-round review
//! - `POST /api/reviews/:id/diagnoses`: attach a diagnosis to a review
//! - `PUT  /api/admissions/:id/partial-discharge`: doctor signs off
//! - `PUT  /api/admissions/:id/revert-partial`: undo the sign-off
//! - `PUT  /api/admissions/:id/discharge`: final discharge
//! - `PUT  /api/admissions/:id/revert`: undo the admission entirely
//! - `PUT  /api/recommendations/:id/cancel`: cancel a pending recommendation

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::admissions::{self, ConfirmAdmission, PartialDischarge};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::consultation::NewDiagnosis;
use crate::models::{
    Actor, AdmissionRecommendation, InpatientDiagnosis, InpatientReview, WardAdmission,
};

pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<ConfirmAdmission>,
) -> Result<Json<WardAdmission>, ApiError> {
    let conn = ctx.conn()?;
    let admission = admissions::confirm_admission(&conn, &actor, req)?;
    Ok(Json(admission))
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub notes: Option<String>,
}

pub async fn add_review(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(admission_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<InpatientReview>, ApiError> {
    let conn = ctx.conn()?;
    let review = admissions::add_review(&conn, &actor, &admission_id, req.notes)?;
    Ok(Json(review))
}

pub async fn add_review_diagnosis(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(review_id): Path<Uuid>,
    Json(req): Json<NewDiagnosis>,
) -> Result<Json<InpatientDiagnosis>, ApiError> {
    let conn = ctx.conn()?;
    let diagnosis = admissions::add_review_diagnosis(&conn, &actor, &review_id, req)?;
    Ok(Json(diagnosis))
}

pub async fn partial_discharge(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(admission_id): Path<Uuid>,
    Json(req): Json<PartialDischarge>,
) -> Result<Json<WardAdmission>, ApiError> {
    let conn = ctx.conn()?;
    let admission = admissions::partial_discharge(&conn, &actor, &admission_id, req)?;
    Ok(Json(admission))
}

pub async fn revert_partial(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(admission_id): Path<Uuid>,
) -> Result<Json<WardAdmission>, ApiError> {
    let conn = ctx.conn()?;
    let admission = admissions::revert_partial_discharge(&conn, &actor, &admission_id)?;
    Ok(Json(admission))
}

pub async fn discharge(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(admission_id): Path<Uuid>,
) -> Result<Json<WardAdmission>, ApiError> {
    let conn = ctx.conn()?;
    let admission = admissions::discharge(&conn, &actor, &admission_id)?;
    Ok(Json(admission))
}

pub async fn revert(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(admission_id): Path<Uuid>,
) -> Result<Json<AdmissionRecommendation>, ApiError> {
    let conn = ctx.conn()?;
    let recommendation = admissions::revert_admission(&conn, &actor, &admission_id)?;
    Ok(Json(recommendation))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

pub async fn cancel_recommendation(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(recommendation_id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<AdmissionRecommendation>, ApiError> {
    let conn = ctx.conn()?;
    let recommendation =
        admissions::cancel_recommendation(&conn, &actor, &recommendation_id, &req.reason)?;
    Ok(Json(recommendation))
}
