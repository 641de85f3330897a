//! Staff identity middleware.
//!
//! The hospital gateway authenticates staff and forwards the identity as
//! `x-staff-id` / `x-staff-name` / `x-staff-role` headers. This middleware
//! rebuilds an [`Actor`] from those headers and injects it into request
//! extensions for downstream handlers. Role values use the staff-table
//! vocabulary (`doctor`, `lab_head`, ...).

use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::models::enums::StaffRole;
use crate::models::Actor;

/// Require the forwarded staff identity on every request.
///
/// Missing or blank headers reject with 401; an unrecognized role value is a
/// 400 since the gateway should never forward one.
pub async fn identify(req: Request<axum::body::Body>, next: Next) -> Response {
    match identify_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn identify_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let id = header_value(req.headers(), "x-staff-id").ok_or(ApiError::Unauthorized)?;
    let name = header_value(req.headers(), "x-staff-name").ok_or(ApiError::Unauthorized)?;
    let role = header_value(req.headers(), "x-staff-role").ok_or(ApiError::Unauthorized)?;
    let role = role
        .parse::<StaffRole>()
        .map_err(|_| ApiError::BadRequest(format!("Unknown staff role: {role}")))?;

    req.extensions_mut().insert(Actor { id, name, role });
    Ok(next.run(req).await)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
