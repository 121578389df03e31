//! Plan-limit validation for countable owned resources.

use std::sync::Arc;

use beautyon_shared::{PlanLimits, PlanTier};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::store::{BillingStore, ResourceKind};

/// Answer to "may one more of this resource be added?".
#[derive(Debug, Clone, Serialize)]
pub struct LimitCheck {
    pub can_add: bool,
    pub current_count: i64,
    /// `-1` means unlimited.
    pub max_count: i32,
    pub plan: PlanTier,
}

pub struct LimitService {
    store: Arc<dyn BillingStore>,
}

impl LimitService {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    pub async fn validate(
        &self,
        professional_id: Uuid,
        resource_type: &str,
    ) -> BillingResult<LimitCheck> {
        let kind = ResourceKind::parse(resource_type)
            .ok_or_else(|| BillingError::InvalidResourceType(resource_type.to_string()))?;

        let account = self
            .store
            .professional(professional_id)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        let limits = PlanLimits::for_plan(Some(&account.plan));
        let current_count = self.store.count_active(account.id, kind).await?;
        let max_count = match kind {
            ResourceKind::Service => limits.max_services,
            ResourceKind::Gallery => limits.max_gallery_photos,
        };

        Ok(LimitCheck {
            can_add: PlanLimits::allows(max_count, current_count),
            current_count,
            max_count,
            plan: limits.tier,
        })
    }
}
