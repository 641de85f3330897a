//! HTTP router.
//!
//! Returns a composable `Router` with all routes nested under `/api/`.
//! Every route sits behind the staff-identity middleware; handlers receive
//! the database through `State<ApiContext>` and the caller through
//! `Extension<Actor>`.

use axum::http::Method;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the full API router.
///
/// Layers are applied from bottom (innermost) to top (outermost):
/// staff identity → request tracing → CORS.
pub fn api_router(ctx: ApiContext) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(Any)
        .allow_headers(Any);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        // Consultation
        .route(
            "/encounters/:id/diagnoses",
            post(endpoints::encounters::add_diagnosis),
        )
        .route(
            "/encounters/:id/procedure",
            put(endpoints::encounters::record_procedure),
        )
        .route(
            "/encounters/:id/outcome",
            put(endpoints::encounters::save_outcome),
        )
        .route(
            "/encounters/:id/finalize",
            put(endpoints::encounters::finalize),
        )
        // Pharmacy
        .route("/prescriptions", post(endpoints::pharmacy::create))
        .route(
            "/prescriptions/:id/confirm",
            put(endpoints::pharmacy::confirm),
        )
        .route(
            "/prescriptions/:id/unconfirm",
            put(endpoints::pharmacy::unconfirm),
        )
        .route(
            "/prescriptions/:id/dispense",
            put(endpoints::pharmacy::dispense),
        )
        .route(
            "/prescriptions/:id/return",
            put(endpoints::pharmacy::return_prescription),
        )
        // Laboratory
        .route("/investigations", post(endpoints::laboratory::create))
        .route(
            "/investigations/:id/confirm",
            put(endpoints::laboratory::confirm),
        )
        .route(
            "/investigations/:id/cancel",
            put(endpoints::laboratory::cancel),
        )
        .route(
            "/investigations/:id/revert",
            put(endpoints::laboratory::revert),
        )
        .route(
            "/investigations/:id/unconfirm",
            put(endpoints::laboratory::unconfirm),
        )
        .route(
            "/investigations/:id/result",
            post(endpoints::laboratory::enter_result),
        )
        // Billing
        .route("/bills/:id", get(endpoints::bills::detail))
        // Ward admissions
        .route("/admissions", post(endpoints::admissions::confirm))
        .route(
            "/admissions/:id/reviews",
            post(endpoints::admissions::add_review),
        )
        .route(
            "/admissions/:id/partial-discharge",
            put(endpoints::admissions::partial_discharge),
        )
        .route(
            "/admissions/:id/revert-partial",
            put(endpoints::admissions::revert_partial),
        )
        .route(
            "/admissions/:id/discharge",
            put(endpoints::admissions::discharge),
        )
        .route("/admissions/:id/revert", put(endpoints::admissions::revert))
        .route(
            "/reviews/:id/diagnoses",
            post(endpoints::admissions::add_review_diagnosis),
        )
        .route(
            "/recommendations/:id/cancel",
            put(endpoints::admissions::cancel_recommendation),
        )
        // Claims
        .route("/claims", post(endpoints::claims::generate))
        .route("/claims/eligible", get(endpoints::claims::eligible))
        .route(
            "/claims/:id",
            get(endpoints::claims::edit_view).put(endpoints::claims::update),
        )
        .route(
            "/claims/:id/regenerate",
            post(endpoints::claims::regenerate),
        )
        .route("/claims/:id/finalize", put(endpoints::claims::finalize))
        .route("/claims/:id/reopen", put(endpoints::claims::reopen))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::staff::identify))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Router::new().nest("/api", routes)
}
