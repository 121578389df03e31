//! Checkout / change-plan orchestration.
//!
//! Two paths: an in-place prorated price swap when the account already holds
//! a subscription (no re-entry of payment details), falling back to a fresh
//! hosted checkout session whenever the swap is unavailable. The fallback is
//! an explicit branch on [`PlanSwap`], not a side effect of error handling.

use std::sync::Arc;

use beautyon_shared::{PlanLimits, PlanTier, SubscriptionStatus};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::client::PriceIds;
use crate::error::{BillingError, BillingResult};
use crate::processor::{PaymentProcessor, ProcessorSubscription};
use crate::store::{BillingStore, PlanActivation, ProfessionalAccount};

/// Input to the orchestrator.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub professional_id: Uuid,
    /// Caller-supplied subscription id; the account's stored id is used
    /// when absent.
    pub existing_subscription_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// What the client should do next.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    /// Hosted checkout session id; `None` when the in-place swap sufficed.
    pub session_id: Option<String>,
    /// Redirect target: the hosted session, or the success URL directly
    /// after a swap.
    pub url: String,
    pub subscription_updated: bool,
}

/// Result of attempting the in-place price swap.
enum PlanSwap {
    Applied(ProcessorSubscription),
    /// The swap could not be performed; the caller falls through to a
    /// checkout session. Carries the reason for the log line.
    Unavailable { reason: String },
}

pub struct CheckoutService {
    processor: Arc<dyn PaymentProcessor>,
    store: Arc<dyn BillingStore>,
    prices: PriceIds,
}

impl CheckoutService {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        store: Arc<dyn BillingStore>,
        prices: PriceIds,
    ) -> Self {
        Self {
            processor,
            store,
            prices,
        }
    }

    /// Create a new subscription or change an existing one to `price_id`.
    pub async fn create_or_change(&self, request: &CheckoutRequest) -> BillingResult<CheckoutOutcome> {
        let account = self
            .store
            .professional(request.professional_id)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        let customer_id = self.ensure_customer(&account).await?;

        let existing = request
            .existing_subscription_id
            .clone()
            .or_else(|| account.stripe_subscription_id.clone())
            .filter(|id| !id.is_empty());

        if let Some(subscription_id) = existing {
            match self.try_swap(&subscription_id, &request.price_id).await {
                PlanSwap::Applied(subscription) => {
                    self.apply_local_plan_change(&account, &subscription).await?;
                    return Ok(CheckoutOutcome {
                        session_id: None,
                        url: request.success_url.clone(),
                        subscription_updated: true,
                    });
                }
                PlanSwap::Unavailable { reason } => {
                    tracing::warn!(
                        professional_id = %account.id,
                        subscription_id = %subscription_id,
                        reason = %reason,
                        "In-place plan swap unavailable; falling back to checkout session"
                    );
                }
            }
        }

        let session = self
            .processor
            .create_checkout_session(
                &customer_id,
                &request.price_id,
                &request.success_url,
                &request.cancel_url,
            )
            .await
            .map_err(|e| BillingError::StripeApi(e.to_string()))?;

        Ok(CheckoutOutcome {
            session_id: Some(session.session_id),
            url: session.url,
            subscription_updated: false,
        })
    }

    /// Resolve the account's processor customer, creating and persisting it
    /// on first use.
    async fn ensure_customer(&self, account: &ProfessionalAccount) -> BillingResult<String> {
        if let Some(id) = account
            .stripe_customer_id
            .as_deref()
            .filter(|id| !id.is_empty())
        {
            return Ok(id.to_string());
        }

        let customer_id = self
            .processor
            .create_customer(&account.email, account.id)
            .await
            .map_err(|e| BillingError::StripeApi(e.to_string()))?;

        self.store
            .set_stripe_customer(account.id, &customer_id)
            .await?;

        Ok(customer_id)
    }

    async fn try_swap(&self, subscription_id: &str, price_id: &str) -> PlanSwap {
        match self
            .processor
            .change_subscription_price(subscription_id, price_id)
            .await
        {
            Ok(subscription) => PlanSwap::Applied(subscription),
            Err(e) => PlanSwap::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    /// Mirror a successful swap onto the account row: plan, period end,
    /// renewal flag, the new plan's email-credit allocation, and a fresh
    /// history entry.
    async fn apply_local_plan_change(
        &self,
        account: &ProfessionalAccount,
        subscription: &ProcessorSubscription,
    ) -> BillingResult<()> {
        let plan = subscription
            .price_id
            .as_deref()
            .map(|price| self.prices.plan_for_price(price))
            .unwrap_or(PlanTier::Free);

        let now = OffsetDateTime::now_utc();

        self.store.close_history_entries(account.id, now).await?;
        self.store
            .open_history_entry(account.id, plan, SubscriptionStatus::Active, now)
            .await?;

        self.store
            .activate_plan(
                account.id,
                &PlanActivation {
                    plan,
                    subscription_id: subscription.id.clone(),
                    status: SubscriptionStatus::Active,
                    period_end: Some(subscription.current_period_end),
                    will_renew: !subscription.cancel_at_period_end,
                    email_credits: PlanLimits::for_tier(plan).email_credits,
                },
            )
            .await?;

        tracing::info!(
            professional_id = %account.id,
            subscription_id = %subscription.id,
            plan = %plan,
            "Applied in-place plan change"
        );

        Ok(())
    }
}
