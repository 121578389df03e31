//! Subscription status resolution.
//!
//! One decision table, shared by every orchestrator that needs to branch on
//! a remote subscription's state: the resolver endpoint, checkout, and
//! cancellation all call [`classify`] instead of re-deriving the branches.

use std::sync::Arc;

use beautyon_shared::{PlanMode, PlanTier};
use serde::Serialize;
use time::OffsetDateTime;

use crate::client::PriceIds;
use crate::processor::{PaymentProcessor, ProcessorSubscription, RemoteSubStatus};

const SECONDS_PER_DAY: i64 = 86_400;

/// Effective subscription state as seen by the rest of the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionSnapshot {
    pub plan_mode: PlanMode,
    pub plan: PlanTier,
    /// Remote processor status word, `"none"` when no subscription exists.
    pub subscription_status: String,
    pub period_end: Option<OffsetDateTime>,
    pub will_renew: bool,
    pub days_remaining: i64,
}

impl SubscriptionSnapshot {
    /// The default for a missing subscription, and the fail-safe for a
    /// processor outage: deny paid features rather than crash callers.
    pub fn expired_default() -> Self {
        Self {
            plan_mode: PlanMode::Expired,
            plan: PlanTier::Free,
            subscription_status: "none".to_string(),
            period_end: None,
            will_renew: false,
            days_remaining: 0,
        }
    }
}

/// Whole days until `period_end`, rounded up, never negative.
pub fn days_remaining(period_end: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let seconds = (period_end - now).whole_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

/// The decision table:
///
/// | remote status | cancel flag | now < period end | plan mode                | plan   |
/// |---------------|-------------|------------------|--------------------------|--------|
/// | active        | false       | any              | renewing                 | mapped |
/// | active        | true        | any              | active_until_period_end  | mapped |
/// | canceled      | any         | yes              | active_until_period_end  | mapped |
/// | canceled      | any         | no               | expired                  | free   |
/// | anything else | any         | any              | expired                  | free   |
pub fn classify(
    subscription: &ProcessorSubscription,
    mapped_plan: PlanTier,
    now: OffsetDateTime,
) -> SubscriptionSnapshot {
    let (plan_mode, plan) = match subscription.status {
        RemoteSubStatus::Active => {
            if subscription.cancel_at_period_end {
                (PlanMode::ActiveUntilPeriodEnd, mapped_plan)
            } else {
                (PlanMode::Renewing, mapped_plan)
            }
        }
        RemoteSubStatus::Canceled => {
            if now < subscription.current_period_end {
                (PlanMode::ActiveUntilPeriodEnd, mapped_plan)
            } else {
                (PlanMode::Expired, PlanTier::Free)
            }
        }
        _ => (PlanMode::Expired, PlanTier::Free),
    };

    SubscriptionSnapshot {
        plan_mode,
        plan,
        subscription_status: subscription.status.as_str().to_string(),
        period_end: Some(subscription.current_period_end),
        will_renew: plan_mode == PlanMode::Renewing,
        days_remaining: days_remaining(subscription.current_period_end, now),
    }
}

/// Resolves a (nullable) processor subscription id into a snapshot.
///
/// Infallible by design: absence, unmapped prices, and processor failures
/// all fold to the free/expired default, because every caller treats the
/// snapshot as gating state that must not take down dependent UI.
pub struct SubscriptionStatusService {
    processor: Arc<dyn PaymentProcessor>,
    prices: PriceIds,
}

impl SubscriptionStatusService {
    pub fn new(processor: Arc<dyn PaymentProcessor>, prices: PriceIds) -> Self {
        Self { processor, prices }
    }

    pub async fn resolve(&self, subscription_id: Option<&str>) -> SubscriptionSnapshot {
        let Some(id) = subscription_id.filter(|s| !s.is_empty()) else {
            return SubscriptionSnapshot::expired_default();
        };

        match self.processor.subscription(id).await {
            Ok(subscription) => {
                let plan = subscription
                    .price_id
                    .as_deref()
                    .map(|price| self.prices.plan_for_price(price))
                    .unwrap_or(PlanTier::Free);

                classify(&subscription, plan, OffsetDateTime::now_utc())
            }
            Err(e) => {
                // Folding an outage into "expired" can mask the outage;
                // keep this log distinct from a genuine expiry.
                tracing::warn!(
                    subscription_id = %id,
                    error = %e,
                    "Subscription lookup failed; treating as expired"
                );
                SubscriptionSnapshot::expired_default()
            }
        }
    }
}
