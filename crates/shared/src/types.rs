//! Plan and subscription vocabulary shared across the workspace.

use serde::{Deserialize, Serialize};

/// Service tier a professional account is on.
///
/// Stored as lowercase strings in the database and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Starteris,
    Pro,
    Bizness,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Starteris => "starteris",
            PlanTier::Pro => "pro",
            PlanTier::Bizness => "bizness",
        }
    }

    /// Lenient parse: anything unrecognised (including empty) resolves to
    /// the free tier, the most restrictive one.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "starteris" => PlanTier::Starteris,
            "pro" => PlanTier::Pro,
            "bizness" => PlanTier::Bizness,
            _ => PlanTier::Free,
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, PlanTier::Free)
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Locally stored subscription status of a professional account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    CanceledAtPeriodEnd,
    PastDue,
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::CanceledAtPeriodEnd => "canceled_at_period_end",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Inactive => "inactive",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "canceled_at_period_end" => SubscriptionStatus::CanceledAtPeriodEnd,
            "past_due" => SubscriptionStatus::PastDue,
            _ => SubscriptionStatus::Inactive,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Effective renewal state derived from the payment processor.
///
/// This is display/gating state, not a stored column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Subscription is active and will renew at period end.
    Renewing,
    /// Paid access continues until period end, then stops.
    ActiveUntilPeriodEnd,
    /// No paid access.
    Expired,
}

impl PlanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanMode::Renewing => "renewing",
            PlanMode::ActiveUntilPeriodEnd => "active_until_period_end",
            PlanMode::Expired => "expired",
        }
    }
}

impl std::fmt::Display for PlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_tier_round_trips_through_strings() {
        for tier in [
            PlanTier::Free,
            PlanTier::Starteris,
            PlanTier::Pro,
            PlanTier::Bizness,
        ] {
            assert_eq!(PlanTier::from_str_lossy(tier.as_str()), tier);
        }
    }

    #[test]
    fn unknown_plan_strings_fall_back_to_free() {
        assert_eq!(PlanTier::from_str_lossy(""), PlanTier::Free);
        assert_eq!(PlanTier::from_str_lossy("premium"), PlanTier::Free);
        assert_eq!(PlanTier::from_str_lossy("PRO"), PlanTier::Free);
    }

    #[test]
    fn unknown_status_strings_fall_back_to_inactive() {
        assert_eq!(
            SubscriptionStatus::from_str_lossy("trialing"),
            SubscriptionStatus::Inactive
        );
        assert_eq!(
            SubscriptionStatus::from_str_lossy("canceled_at_period_end"),
            SubscriptionStatus::CanceledAtPeriodEnd
        );
    }
}
