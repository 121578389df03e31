//! Cancellation orchestration and the forced free downgrade.
//!
//! Cancellation is only well-defined from an active or already-cancelled
//! remote subscription. Every path that strips paid access converges on
//! [`force_free_downgrade`], the single authoritative routine, so a
//! cancellation against a stale or vanished remote subscription and an
//! expiry-sweep downgrade all land on the same terminal state.

use std::sync::Arc;

use beautyon_shared::{PlanLimits, SubscriptionStatus};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::processor::{PaymentProcessor, ProcessorError, RemoteSubStatus};
use crate::store::BillingStore;

/// Outcome of a cancellation request.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub message: String,
    /// Set when paid access continues until this timestamp.
    pub period_end: Option<OffsetDateTime>,
}

/// Terminal free downgrade: account row cleared (plan=free,
/// status=inactive, subscription id and period end gone, credits zeroed),
/// open history entries closed, staff beyond the free allowance
/// deactivated. Idempotent: a second run changes nothing.
pub(crate) async fn force_free_downgrade(
    store: &dyn BillingStore,
    professional_id: Uuid,
    now: OffsetDateTime,
) -> BillingResult<()> {
    store
        .clear_subscription(professional_id, SubscriptionStatus::Inactive)
        .await?;
    store.close_history_entries(professional_id, now).await?;
    store
        .deactivate_excess_staff(professional_id, i64::from(PlanLimits::free().max_staff))
        .await?;

    tracing::info!(professional_id = %professional_id, "Downgraded account to free");
    Ok(())
}

pub struct CancellationService {
    processor: Arc<dyn PaymentProcessor>,
    store: Arc<dyn BillingStore>,
}

impl CancellationService {
    pub fn new(processor: Arc<dyn PaymentProcessor>, store: Arc<dyn BillingStore>) -> Self {
        Self { processor, store }
    }

    /// Cancel the professional's subscription.
    ///
    /// An active remote subscription is set to cancel at period end (paid
    /// access continues); a remote subscription that is already cancelled or
    /// no longer exists is cleaned up by downgrading the account
    /// immediately.
    pub async fn cancel(&self, professional_id: Uuid) -> BillingResult<CancellationOutcome> {
        let account = self
            .store
            .professional(professional_id)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        let subscription_id = account
            .stripe_subscription_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(BillingError::NoSubscription)?;

        let subscription = match self.processor.subscription(subscription_id).await {
            Ok(subscription) => subscription,
            Err(ProcessorError::Missing) => {
                // The local record referenced a subscription the processor
                // no longer knows; clean up as if it had been cancelled.
                tracing::warn!(
                    professional_id = %professional_id,
                    subscription_id = %subscription_id,
                    "Remote subscription missing; downgrading stale account"
                );
                force_free_downgrade(self.store.as_ref(), professional_id, OffsetDateTime::now_utc())
                    .await?;
                return Ok(CancellationOutcome {
                    message: "Subscription no longer exists; account downgraded to free"
                        .to_string(),
                    period_end: None,
                });
            }
            Err(ProcessorError::Api(message)) => return Err(BillingError::StripeApi(message)),
        };

        match subscription.status {
            RemoteSubStatus::Canceled => {
                force_free_downgrade(self.store.as_ref(), professional_id, OffsetDateTime::now_utc())
                    .await?;
                Ok(CancellationOutcome {
                    message: "Subscription was already canceled; account downgraded to free"
                        .to_string(),
                    period_end: None,
                })
            }
            RemoteSubStatus::Active => {
                match self.processor.cancel_at_period_end(subscription_id).await {
                    Ok(updated) => {
                        self.store.mark_cancel_at_period_end(professional_id).await?;
                        tracing::info!(
                            professional_id = %professional_id,
                            subscription_id = %subscription_id,
                            period_end = %updated.current_period_end,
                            "Scheduled cancellation at period end"
                        );
                        Ok(CancellationOutcome {
                            message: "Subscription will end at the current period's close"
                                .to_string(),
                            period_end: Some(updated.current_period_end),
                        })
                    }
                    Err(ProcessorError::Missing) => {
                        force_free_downgrade(
                            self.store.as_ref(),
                            professional_id,
                            OffsetDateTime::now_utc(),
                        )
                        .await?;
                        Ok(CancellationOutcome {
                            message:
                                "Subscription no longer exists; account downgraded to free"
                                    .to_string(),
                            period_end: None,
                        })
                    }
                    Err(ProcessorError::Api(message)) => Err(BillingError::StripeApi(message)),
                }
            }
            other => Err(BillingError::InvalidSubscriptionState(
                other.as_str().to_string(),
            )),
        }
    }

    /// Immediately downgrade the professional to the free tier regardless
    /// of remote state.
    pub async fn downgrade_to_free(&self, professional_id: Uuid) -> BillingResult<()> {
        let account = self
            .store
            .professional(professional_id)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        force_free_downgrade(self.store.as_ref(), account.id, OffsetDateTime::now_utc()).await
    }
}
