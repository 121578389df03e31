//! API error type and HTTP status mapping.
//!
//! The taxonomy: authentication failures are 401, missing accounts 404,
//! precondition failures 400, exhausted credits 403, upstream and database
//! failures 500 with the upstream message passed through. No retries happen
//! anywhere; every failure is reported synchronously to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use beautyon_billing::BillingError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Professional profile not found")]
    ProfileNotFound,

    /// A stated precondition does not hold (nothing to cancel, wrong
    /// remote subscription status, unknown resource type).
    #[error("{0}")]
    Precondition(String),

    #[error("Insufficient email credits")]
    InsufficientCredits,

    /// Payment processor or email provider failure.
    #[error("{0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::ProfileNotFound => StatusCode::NOT_FOUND,
            ApiError::Precondition(_) => StatusCode::BAD_REQUEST,
            ApiError::InsufficientCredits => StatusCode::FORBIDDEN,
            ApiError::Upstream(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::ProfileNotFound => ApiError::ProfileNotFound,
            BillingError::NoSubscription => {
                ApiError::Precondition("No subscription to cancel".to_string())
            }
            BillingError::InvalidSubscriptionState(status) => ApiError::Precondition(format!(
                "Subscription status '{}' does not allow this operation",
                status
            )),
            BillingError::InvalidResourceType(kind) => {
                ApiError::Precondition(format!("Invalid resource type '{}'", kind))
            }
            BillingError::InsufficientCredits => ApiError::InsufficientCredits,
            BillingError::StripeApi(message) | BillingError::EmailProvider(message) => {
                ApiError::Upstream(message)
            }
            BillingError::Database(e) => ApiError::Database(e.to_string()),
            BillingError::Config(message) | BillingError::Internal(message) => {
                ApiError::Upstream(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_errors_map_to_the_documented_statuses() {
        let cases = [
            (ApiError::from(BillingError::ProfileNotFound), 404),
            (ApiError::from(BillingError::NoSubscription), 400),
            (
                ApiError::from(BillingError::InvalidSubscriptionState("past_due".into())),
                400,
            ),
            (ApiError::from(BillingError::InsufficientCredits), 403),
            (
                ApiError::from(BillingError::StripeApi("boom".into())),
                500,
            ),
            (
                ApiError::from(BillingError::InvalidResourceType("staff".into())),
                400,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status().as_u16(), expected, "{error}");
        }
    }

    #[test]
    fn precondition_messages_name_the_remote_status() {
        let error = ApiError::from(BillingError::InvalidSubscriptionState("unpaid".into()));
        assert!(error.to_string().contains("unpaid"));
    }
}
