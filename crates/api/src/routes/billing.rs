//! Billing routes: checkout, cancellation, downgrade, status, sweep, and
//! resource-limit validation.
//!
//! Wire shapes use camelCase field names; timestamps are RFC 3339 strings.

use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use beautyon_billing::CheckoutRequest;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

fn rfc3339(timestamp: OffsetDateTime) -> Option<String> {
    timestamp.format(&Rfc3339).ok()
}

// ============================================================================
// Checkout / change plan
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutBody {
    pub price_id: String,
    pub professional_id: Uuid,
    #[serde(default)]
    pub existing_subscription_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: Option<String>,
    pub url: String,
    pub subscription_updated: bool,
}

/// Create a new subscription, or swap an existing one to the requested
/// price without a new checkout.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(body): Json<CreateCheckoutBody>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let outcome = state
        .billing
        .checkout
        .create_or_change(&CheckoutRequest {
            price_id: body.price_id,
            professional_id: body.professional_id,
            existing_subscription_id: body.existing_subscription_id,
            success_url: body.success_url,
            cancel_url: body.cancel_url,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        session_id: outcome.session_id,
        url: outcome.url,
        subscription_updated: outcome.subscription_updated,
    }))
}

// ============================================================================
// Cancellation / downgrade
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<String>,
}

pub async fn cancel_subscription(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<CancelResponse>, ApiError> {
    let account = state
        .billing
        .store
        .professional_by_user(auth_user.user_id)
        .await?
        .ok_or(ApiError::ProfileNotFound)?;

    let outcome = state.billing.cancellation.cancel(account.id).await?;

    Ok(Json(CancelResponse {
        success: true,
        message: outcome.message,
        period_end: outcome.period_end.and_then(rfc3339),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DowngradeResponse {
    pub success: bool,
    pub message: String,
}

pub async fn downgrade_to_free(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<DowngradeResponse>, ApiError> {
    let account = state
        .billing
        .store
        .professional_by_user(auth_user.user_id)
        .await?
        .ok_or(ApiError::ProfileNotFound)?;

    state.billing.cancellation.downgrade_to_free(account.id).await?;

    Ok(Json(DowngradeResponse {
        success: true,
        message: "Account downgraded to the free plan".to_string(),
    }))
}

// ============================================================================
// Subscription status
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusBody {
    #[serde(default)]
    pub stripe_subscription_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub plan_mode: String,
    pub current_plan: String,
    pub subscription_status: String,
    pub subscription_end_date: Option<String>,
    pub subscription_will_renew: bool,
    pub days_remaining: i64,
}

/// Resolve the effective plan state. Always 200: lookups that fail fold to
/// the free-plan default inside the resolver.
pub async fn subscription_status(
    State(state): State<AppState>,
    Json(body): Json<SubscriptionStatusBody>,
) -> Json<SubscriptionStatusResponse> {
    let snapshot = state
        .billing
        .status
        .resolve(body.stripe_subscription_id.as_deref())
        .await;

    Json(SubscriptionStatusResponse {
        plan_mode: snapshot.plan_mode.as_str().to_string(),
        current_plan: snapshot.plan.as_str().to_string(),
        subscription_status: snapshot.subscription_status,
        subscription_end_date: snapshot.period_end.and_then(rfc3339),
        subscription_will_renew: snapshot.will_renew,
        days_remaining: snapshot.days_remaining,
    })
}

// ============================================================================
// Expiry sweep
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResultEntry {
    pub professional_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub total_processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<SweepResultEntry>,
}

/// Downgrade every account whose paid period has lapsed. Triggered by the
/// scheduler; guarded by a shared token when one is configured.
pub async fn sweep_expired(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, ApiError> {
    if let Some(expected) = &state.config.sweep_token {
        let provided = headers.get("x-sweep-token").and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized);
        }
    }

    let report = state.billing.sweep.run().await?;

    Ok(Json(SweepResponse {
        total_processed: report.total_processed,
        succeeded: report.succeeded,
        failed: report.failed,
        results: report
            .results
            .into_iter()
            .map(|r| SweepResultEntry {
                professional_id: r.professional_id,
                success: r.success,
                error: r.error,
            })
            .collect(),
    }))
}

// ============================================================================
// Resource-limit validation
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLimitBody {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub professional_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLimitResponse {
    pub can_add: bool,
    pub current_count: i64,
    pub max_count: i32,
    pub plan: String,
}

pub async fn validate_limit(
    State(state): State<AppState>,
    Json(body): Json<ValidateLimitBody>,
) -> Result<Json<ValidateLimitResponse>, ApiError> {
    let check = state
        .billing
        .limits
        .validate(body.professional_id, &body.resource_type)
        .await?;

    Ok(Json(ValidateLimitResponse {
        can_add: check.can_add,
        current_count: check.current_count,
        max_count: check.max_count,
        plan: check.plan.as_str().to_string(),
    }))
}
