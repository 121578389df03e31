//! Route registration.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::require_auth;
use crate::state::AppState;

pub mod billing;
pub mod email;

async fn health() -> &'static str {
    "ok"
}

pub fn create_router(state: AppState) -> Router {
    // Endpoints that act on "the caller's own account" resolve the
    // professional through the bearer token.
    let authenticated = Router::new()
        .route("/api/billing/cancel", post(billing::cancel_subscription))
        .route("/api/billing/downgrade", post(billing::downgrade_to_free))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/api/billing/checkout", post(billing::create_checkout))
        .route(
            "/api/billing/subscription-status",
            post(billing::subscription_status),
        )
        .route("/api/billing/sweep-expired", post(billing::sweep_expired))
        .route("/api/billing/validate-limit", post(billing::validate_limit))
        .route("/api/emails/send", post(email::send_email))
        .merge(authenticated)
        .with_state(state)
}
