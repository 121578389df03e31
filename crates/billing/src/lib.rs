// Billing crate clippy configuration
// These are intentional patterns in this crate:
#![allow(clippy::too_many_arguments)] // Some Stripe operations require many parameters
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! BeautyOn Billing Module
//!
//! Handles Stripe integration for professional subscriptions and the email
//! credit economy.
//!
//! ## Features
//!
//! - **Subscription Status**: One decision table resolving a processor
//!   subscription into the effective plan, renewal mode, and days remaining
//! - **Checkout / Plan Change**: In-place prorated price swaps with a
//!   hosted-checkout fallback
//! - **Cancellation**: Cancel-at-period-end plus idempotent cleanup of
//!   stale local subscription state
//! - **Expiry Sweep**: Batch downgrade of lapsed accounts with per-account
//!   failure isolation
//! - **Email Credits**: Check-before-send, spend-after-confirm credit gate
//!   over the transactional-email provider
//! - **Resource Limits**: Plan-limit validation for services and gallery
//!   photos

pub mod cancellation;
pub mod checkout;
pub mod client;
pub mod email;
pub mod error;
pub mod limits;
pub mod processor;
pub mod status;
pub mod store;
pub mod sweep;

#[cfg(test)]
mod test_support;

// Cancellation
pub use cancellation::{CancellationOutcome, CancellationService};

// Checkout
pub use checkout::{CheckoutOutcome, CheckoutRequest, CheckoutService};

// Client
pub use client::{PriceIds, StripeClient, StripeConfig};

// Email
pub use email::{EmailCreditGate, EmailReceipt, EmailRequest, Mailer, OutboundEmail, ResendMailer};

// Error
pub use error::{BillingError, BillingResult};

// Limits
pub use limits::{LimitCheck, LimitService};

// Processor
pub use processor::{
    HostedCheckout, PaymentProcessor, ProcessorError, ProcessorSubscription, RemoteSubStatus,
    StripeProcessor,
};

// Status
pub use status::{classify, days_remaining, SubscriptionSnapshot, SubscriptionStatusService};

// Store
pub use store::{
    BillingStore, EmailLogEntry, PgBillingStore, PlanActivation, ProfessionalAccount, ResourceKind,
};

// Sweep
pub use sweep::{ExpirySweepService, SweepOutcome, SweepReport};

use std::sync::Arc;

use sqlx::PgPool;

/// Main billing service that combines all billing functionality
pub struct BillingService {
    pub status: SubscriptionStatusService,
    pub checkout: CheckoutService,
    pub cancellation: CancellationService,
    pub sweep: ExpirySweepService,
    pub email: EmailCreditGate,
    pub limits: LimitService,
    /// Shared store handle, for account lookups outside the orchestrators
    /// (e.g. resolving an authenticated user to a professional).
    pub store: Arc<dyn BillingStore>,
}

impl BillingService {
    /// Create a billing service from environment variables.
    pub fn from_env(pool: PgPool) -> BillingResult<Self> {
        let stripe = StripeClient::from_env()?;
        let prices = stripe.config().price_ids.clone();
        let processor: Arc<dyn PaymentProcessor> = Arc::new(StripeProcessor::new(stripe));
        let store: Arc<dyn BillingStore> = Arc::new(PgBillingStore::new(pool));
        let mailer: Arc<dyn Mailer> = Arc::new(ResendMailer::from_env()?);

        Ok(Self::with_components(processor, store, mailer, prices))
    }

    /// Create a billing service from explicit collaborators (tests and
    /// alternative deployments construct through this).
    pub fn with_components(
        processor: Arc<dyn PaymentProcessor>,
        store: Arc<dyn BillingStore>,
        mailer: Arc<dyn Mailer>,
        prices: PriceIds,
    ) -> Self {
        Self {
            status: SubscriptionStatusService::new(Arc::clone(&processor), prices.clone()),
            checkout: CheckoutService::new(Arc::clone(&processor), Arc::clone(&store), prices),
            cancellation: CancellationService::new(Arc::clone(&processor), Arc::clone(&store)),
            sweep: ExpirySweepService::new(Arc::clone(&store)),
            email: EmailCreditGate::new(Arc::clone(&store), mailer),
            limits: LimitService::new(Arc::clone(&store)),
            store,
        }
    }
}
