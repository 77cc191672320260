//! Route table and middleware stack.

pub mod blocks;
pub mod calculate;
pub mod contracts;
pub mod deals;
pub mod health;
pub mod plans;
pub mod reservations;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let timeout = TimeoutLayer::new(Duration::from_secs(state.config.request_timeout_secs));
    let body_limit = DefaultBodyLimit::max(state.config.body_limit_bytes);

    let api = Router::new()
        .route("/calculate", post(calculate::calculate))
        .route("/generate-plan", post(calculate::generate_plan))
        // deals
        .route("/deals", post(deals::create))
        .route("/deals/:id/submit", patch(deals::submit))
        .route("/deals/:id/approve", patch(deals::approve))
        .route("/deals/:id/reject", patch(deals::reject))
        .route("/deals/:id/approve-override", patch(deals::approve_override))
        // payment plans
        .route("/payment-plans", post(plans::create))
        .route("/payment-plans/queue/:stage", get(plans::queue))
        .route("/payment-plans/:id/approve-sm", patch(plans::approve_sm))
        .route("/payment-plans/:id/approve", patch(plans::approve_fm))
        .route("/payment-plans/:id/approve-tm", patch(plans::approve_tm))
        .route("/payment-plans/:id/reject-sm", patch(plans::reject))
        .route("/payment-plans/:id/reject", patch(plans::reject))
        .route("/payment-plans/:id/reject-tm", patch(plans::reject))
        .route("/payment-plans/:id/mark-accepted", patch(plans::mark_accepted))
        // blocks
        .route("/blocks/request", post(blocks::request))
        .route("/blocks/:id/approve", patch(blocks::approve))
        .route("/blocks/:id/reject", patch(blocks::reject))
        .route("/blocks/:id/extend", patch(blocks::extend))
        .route("/blocks/:id/cancel", patch(blocks::cancel))
        .route("/blocks/:id/override-sm", patch(blocks::override_approve))
        .route("/blocks/:id/override-fm", patch(blocks::override_approve))
        .route("/blocks/:id/override-tm", patch(blocks::override_approve))
        .route("/blocks/:id/override-reject", patch(blocks::override_reject))
        // reservation forms
        .route("/reservation-forms", post(reservations::create))
        .route("/reservation-forms/:id/approve", patch(reservations::approve))
        .route("/reservation-forms/:id/reject", patch(reservations::reject))
        .route("/reservation-forms/:id/cancel", patch(reservations::cancel))
        .route(
            "/reservation-forms/:id/request-amendment",
            patch(reservations::request_amendment),
        )
        .route(
            "/reservation-forms/:id/approve-amendment",
            patch(reservations::approve_amendment),
        )
        .route(
            "/reservation-forms/:id/reject-amendment",
            patch(reservations::reject_amendment),
        )
        .route(
            "/reservation-forms/:id/document",
            get(reservations::document),
        )
        // contracts
        .route("/contracts", post(contracts::create))
        .route("/contracts/:id/settings", patch(contracts::update_settings))
        .route("/contracts/:id/lock-settings", patch(contracts::lock_settings))
        .route("/contracts/:id/submit", patch(contracts::submit))
        .route("/contracts/:id/approve-cm", patch(contracts::approve_cm))
        .route("/contracts/:id/approve-tm", patch(contracts::approve_tm))
        .route("/contracts/:id/reject", patch(contracts::reject))
        .route("/contracts/:id/execute", patch(contracts::execute))
        .route("/contracts/:id/document", get(contracts::document));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();
    if parsed.is_empty() {
        CorsLayer::new()
    } else {
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}
