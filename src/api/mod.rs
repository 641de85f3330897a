//! HTTP surface.
//!
//! Exposes the lifecycle and reconciliation services as JSON endpoints for
//! the hospital's staff-facing clients. Routes are nested under `/api/` and
//! protected by the staff-identity middleware; the upstream gateway handles
//! authentication and forwards the identity as headers.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use types::ApiContext;
