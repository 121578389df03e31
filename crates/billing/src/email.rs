//! Transactional email: provider client and the credit gate.
//!
//! Credits are checked before the provider is called and spent only after
//! the provider confirms the send, so a failed send never costs a credit
//! and a send never happens without one. Usage log rows record confirmed
//! sends only.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::store::{BillingStore, EmailLogEntry};

/// A message handed to the provider.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MailerError(pub String);

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Dispatch one message; returns the provider's message identifier.
    async fn send(&self, message: &OutboundEmail) -> Result<String, MailerError>;
}

const RESEND_BASE_URL: &str = "https://api.resend.com";

/// Resend HTTP API client.
#[derive(Clone)]
pub struct ResendMailer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct ResendSendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct ResendSendResponse {
    id: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: RESEND_BASE_URL.to_string(),
            api_key,
            from,
        }
    }

    pub fn from_env() -> BillingResult<Self> {
        let api_key = std::env::var("RESEND_API_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BillingError::Config("RESEND_API_KEY not set".to_string()))?;
        let from = std::env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "BeautyOn <no-reply@beautyon.lt>".to_string());

        Ok(Self::new(api_key, from))
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &OutboundEmail) -> Result<String, MailerError> {
        let body = ResendSendRequest {
            from: &self.from,
            to: [message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailerError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(MailerError(format!(
                "provider returned {}: {}",
                status, detail
            )));
        }

        let parsed: ResendSendResponse = response
            .json()
            .await
            .map_err(|e| MailerError(format!("invalid provider response: {}", e)))?;

        Ok(parsed.id)
    }
}

/// Input to the credit gate.
#[derive(Debug, Clone)]
pub struct EmailRequest {
    pub professional_id: Uuid,
    pub to: String,
    pub subject: String,
    pub html_content: String,
    pub email_type: String,
}

/// A confirmed send.
#[derive(Debug, Clone, Serialize)]
pub struct EmailReceipt {
    pub message_id: String,
    pub credits_remaining: i32,
}

pub struct EmailCreditGate {
    store: Arc<dyn BillingStore>,
    mailer: Arc<dyn Mailer>,
}

impl EmailCreditGate {
    pub fn new(store: Arc<dyn BillingStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    /// Send one transactional email if (and only if) a credit is available.
    pub async fn send(&self, request: &EmailRequest) -> BillingResult<EmailReceipt> {
        let balance = self.store.email_credits(request.professional_id).await?;
        if balance < 1 {
            tracing::warn!(
                professional_id = %request.professional_id,
                email_type = %request.email_type,
                "Email refused: no credits remaining"
            );
            return Err(BillingError::InsufficientCredits);
        }

        let message_id = self
            .mailer
            .send(&OutboundEmail {
                to: request.to.clone(),
                subject: request.subject.clone(),
                html: request.html_content.clone(),
            })
            .await
            .map_err(|e| BillingError::EmailProvider(e.to_string()))?;

        // Spend the credit and log only after the provider confirmed.
        let credits_remaining = self
            .store
            .consume_email_credit(request.professional_id)
            .await?;

        self.store
            .record_email(&EmailLogEntry {
                professional_id: request.professional_id,
                recipient: request.to.clone(),
                email_type: request.email_type.clone(),
                provider_message_id: Some(message_id.clone()),
            })
            .await?;

        tracing::info!(
            professional_id = %request.professional_id,
            email_type = %request.email_type,
            message_id = %message_id,
            credits_remaining = credits_remaining,
            "Transactional email sent"
        );

        Ok(EmailReceipt {
            message_id,
            credits_remaining,
        })
    }
}
