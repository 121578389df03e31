//! Static plan-limit catalog.
//!
//! Pure lookup table consumed by the billing services and the API. Unknown
//! or missing plan identifiers resolve to the free tier rather than erroring,
//! so a corrupt plan column can never grant paid features.

use serde::Serialize;

use crate::types::PlanTier;

/// Sentinel for "no limit" on a counted resource.
pub const UNLIMITED: i32 = -1;

/// Feature limits attached to a plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub tier: PlanTier,
    pub max_services: i32,
    pub max_staff: i32,
    pub max_gallery_photos: i32,
    pub calendar_days_visible: i32,
    pub email_credits: i32,
    pub online_booking: bool,
    pub sms_reminders: bool,
    pub featured_placement: bool,
    pub analytics: bool,
}

impl PlanLimits {
    /// Free tier: 3 services, 1 staff member, 5 gallery photos, 14-day
    /// calendar, no email credits.
    pub fn free() -> Self {
        Self {
            tier: PlanTier::Free,
            max_services: 3,
            max_staff: 1,
            max_gallery_photos: 5,
            calendar_days_visible: 14,
            email_credits: 0,
            online_booking: true,
            sms_reminders: false,
            featured_placement: false,
            analytics: false,
        }
    }

    /// Starteris tier: 10 services, 3 staff, 15 photos, 30-day calendar,
    /// 50 email credits per period.
    pub fn starteris() -> Self {
        Self {
            tier: PlanTier::Starteris,
            max_services: 10,
            max_staff: 3,
            max_gallery_photos: 15,
            calendar_days_visible: 30,
            email_credits: 50,
            online_booking: true,
            sms_reminders: true,
            featured_placement: false,
            analytics: false,
        }
    }

    /// Pro tier: 25 services, 10 staff, 50 photos, 60-day calendar,
    /// 200 email credits per period.
    pub fn pro() -> Self {
        Self {
            tier: PlanTier::Pro,
            max_services: 25,
            max_staff: 10,
            max_gallery_photos: 50,
            calendar_days_visible: 60,
            email_credits: 200,
            online_booking: true,
            sms_reminders: true,
            featured_placement: true,
            analytics: true,
        }
    }

    /// Bizness tier: unlimited services/staff/photos, full-year calendar,
    /// 1000 email credits per period.
    pub fn bizness() -> Self {
        Self {
            tier: PlanTier::Bizness,
            max_services: UNLIMITED,
            max_staff: UNLIMITED,
            max_gallery_photos: UNLIMITED,
            calendar_days_visible: 365,
            email_credits: 1000,
            online_booking: true,
            sms_reminders: true,
            featured_placement: true,
            analytics: true,
        }
    }

    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self::free(),
            PlanTier::Starteris => Self::starteris(),
            PlanTier::Pro => Self::pro(),
            PlanTier::Bizness => Self::bizness(),
        }
    }

    /// Lookup by raw plan identifier. `None` and unrecognised identifiers
    /// resolve to the free tier.
    pub fn for_plan(plan: Option<&str>) -> Self {
        let tier = plan.map(PlanTier::from_str_lossy).unwrap_or(PlanTier::Free);
        Self::for_tier(tier)
    }

    /// Whether `current` more of this resource may be added under `limit`.
    pub fn allows(limit: i32, current: i64) -> bool {
        limit == UNLIMITED || current < i64::from(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_and_null_plans_resolve_to_free_limits_exactly() {
        assert_eq!(PlanLimits::for_plan(None), PlanLimits::free());
        assert_eq!(PlanLimits::for_plan(Some("")), PlanLimits::free());
        assert_eq!(PlanLimits::for_plan(Some("gold")), PlanLimits::free());
    }

    #[test]
    fn known_plans_resolve_to_their_own_limits() {
        assert_eq!(
            PlanLimits::for_plan(Some("starteris")).tier,
            PlanTier::Starteris
        );
        assert_eq!(PlanLimits::for_plan(Some("pro")).tier, PlanTier::Pro);
        assert_eq!(
            PlanLimits::for_plan(Some("bizness")).tier,
            PlanTier::Bizness
        );
    }

    #[test]
    fn free_tier_allows_exactly_one_staff_member() {
        assert_eq!(PlanLimits::free().max_staff, 1);
    }

    #[test]
    fn unlimited_sentinel_always_allows() {
        assert!(PlanLimits::allows(UNLIMITED, 0));
        assert!(PlanLimits::allows(UNLIMITED, 1_000_000));
    }

    #[test]
    fn counted_limits_refuse_at_the_cap() {
        assert!(PlanLimits::allows(3, 2));
        assert!(!PlanLimits::allows(3, 3));
        assert!(!PlanLimits::allows(3, 4));
    }

    #[test]
    fn free_tier_has_no_email_credits() {
        assert_eq!(PlanLimits::free().email_credits, 0);
    }
}
