//! Billing error taxonomy.
//!
//! Every orchestrator returns `BillingResult<T>`; the API crate maps the
//! variants onto HTTP statuses (authentication errors never originate here,
//! they belong to the API layer).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    /// Missing or malformed environment configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Upstream payment-processor failure that could not be reinterpreted
    /// as a local precondition.
    #[error("stripe api error: {0}")]
    StripeApi(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No professional account matched the given reference.
    #[error("professional profile not found")]
    ProfileNotFound,

    /// Cancellation requested but the account holds no processor
    /// subscription identifier.
    #[error("no subscription to cancel")]
    NoSubscription,

    /// The remote subscription is in a status from which the requested
    /// transition is not defined.
    #[error("subscription status '{0}' does not allow this operation")]
    InvalidSubscriptionState(String),

    /// Email credit balance is below 1; no send was attempted.
    #[error("insufficient email credits")]
    InsufficientCredits,

    /// The transactional-email provider rejected or failed the send.
    #[error("email provider error: {0}")]
    EmailProvider(String),

    /// Resource-limit validation was asked about an unknown resource kind.
    #[error("invalid resource type: {0}")]
    InvalidResourceType(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type BillingResult<T> = Result<T, BillingError>;
