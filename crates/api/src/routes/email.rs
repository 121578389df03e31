//! Credit-gated transactional email sending.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use beautyon_billing::EmailRequest;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailBody {
    pub professional_id: Uuid,
    pub to: String,
    pub subject: String,
    pub html_content: String,
    pub email_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    pub message_id: String,
    pub credits_remaining: i32,
}

/// Send one transactional email, spending one credit on confirmed delivery.
/// Refused with 403 when the balance is empty.
pub async fn send_email(
    State(state): State<AppState>,
    Json(body): Json<SendEmailBody>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let receipt = state
        .billing
        .email
        .send(&EmailRequest {
            professional_id: body.professional_id,
            to: body.to,
            subject: body.subject,
            html_content: body.html_content,
            email_type: body.email_type,
        })
        .await?;

    Ok(Json(SendEmailResponse {
        success: true,
        message_id: receipt.message_id,
        credits_remaining: receipt.credits_remaining,
    }))
}
