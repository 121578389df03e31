//! Stripe client wrapper and price configuration.

use beautyon_shared::PlanTier;

use crate::error::{BillingError, BillingResult};

/// Stripe price identifiers for each paid tier.
///
/// The free tier has no price; unmapped prices resolve to free wherever a
/// price is translated back into a plan.
#[derive(Debug, Clone)]
pub struct PriceIds {
    pub starteris: String,
    pub pro: String,
    pub bizness: String,
}

impl PriceIds {
    pub fn price_id_for_plan(&self, plan: PlanTier) -> Option<&str> {
        match plan {
            PlanTier::Free => None,
            PlanTier::Starteris => Some(&self.starteris),
            PlanTier::Pro => Some(&self.pro),
            PlanTier::Bizness => Some(&self.bizness),
        }
    }

    /// Map a Stripe price identifier back to a plan. Unknown prices fold to
    /// the free tier.
    pub fn plan_for_price(&self, price_id: &str) -> PlanTier {
        if price_id == self.starteris {
            PlanTier::Starteris
        } else if price_id == self.pro {
            PlanTier::Pro
        } else if price_id == self.bizness {
            PlanTier::Bizness
        } else {
            PlanTier::Free
        }
    }
}

/// Stripe configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub price_ids: PriceIds,
}

impl StripeConfig {
    pub fn from_env() -> BillingResult<Self> {
        let secret_key = require_env("STRIPE_SECRET_KEY")?;
        let price_ids = PriceIds {
            starteris: require_env("STRIPE_PRICE_STARTERIS")?,
            pro: require_env("STRIPE_PRICE_PRO")?,
            bizness: require_env("STRIPE_PRICE_BIZNESS")?,
        };

        Ok(Self {
            secret_key,
            price_ids,
        })
    }
}

fn require_env(name: &str) -> BillingResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BillingError::Config(format!("{} not set", name)))
}

/// Thin wrapper tying the async-stripe client to its price configuration.
#[derive(Clone)]
pub struct StripeClient {
    inner: stripe::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let inner = stripe::Client::new(config.secret_key.clone());
        Self { inner, config }
    }

    pub fn from_env() -> BillingResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?))
    }

    pub fn inner(&self) -> &stripe::Client {
        &self.inner
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_ids() -> PriceIds {
        PriceIds {
            starteris: "price_starteris_m".to_string(),
            pro: "price_pro_m".to_string(),
            bizness: "price_bizness_m".to_string(),
        }
    }

    #[test]
    fn known_prices_map_to_their_plans() {
        let ids = price_ids();
        assert_eq!(ids.plan_for_price("price_pro_m"), PlanTier::Pro);
        assert_eq!(ids.plan_for_price("price_bizness_m"), PlanTier::Bizness);
        assert_eq!(ids.plan_for_price("price_starteris_m"), PlanTier::Starteris);
    }

    #[test]
    fn unmapped_prices_fold_to_free() {
        assert_eq!(price_ids().plan_for_price("price_legacy"), PlanTier::Free);
    }

    #[test]
    fn free_tier_has_no_price() {
        assert!(price_ids().price_id_for_plan(PlanTier::Free).is_none());
    }
}
