//! Data-store seam.
//!
//! All account, history, credit, and resource mutations go through the
//! [`BillingStore`] trait; [`PgBillingStore`] is the production
//! implementation. The professional account is the root entity; history
//! entries, the credit balance, and owned resources hang off it and are only
//! ever touched through these methods.

use async_trait::async_trait;
use beautyon_shared::{PlanTier, SubscriptionStatus};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};

/// A professional account's billing-relevant columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfessionalAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub business_name: String,
    pub plan: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: String,
    pub subscription_end_date: Option<OffsetDateTime>,
    pub subscription_will_renew: bool,
    pub email_credits: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ProfessionalAccount {
    pub fn plan_tier(&self) -> PlanTier {
        PlanTier::from_str_lossy(&self.plan)
    }

    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str_lossy(&self.subscription_status)
    }
}

/// Fields written when a paid plan activates or changes in place.
#[derive(Debug, Clone)]
pub struct PlanActivation {
    pub plan: PlanTier,
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub period_end: Option<OffsetDateTime>,
    pub will_renew: bool,
    /// The new plan's full credit allocation; the balance resets on plan
    /// change.
    pub email_credits: i32,
}

/// One attempted-and-confirmed transactional email send.
#[derive(Debug, Clone)]
pub struct EmailLogEntry {
    pub professional_id: Uuid,
    pub recipient: String,
    pub email_type: String,
    pub provider_message_id: Option<String>,
}

/// Countable owned resources subject to plan limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Service,
    Gallery,
}

impl ResourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "service" => Some(ResourceKind::Service),
            "gallery" => Some(ResourceKind::Gallery),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Service => "service",
            ResourceKind::Gallery => "gallery",
        }
    }
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn professional(&self, id: Uuid) -> BillingResult<Option<ProfessionalAccount>>;

    async fn professional_by_user(
        &self,
        user_id: Uuid,
    ) -> BillingResult<Option<ProfessionalAccount>>;

    /// Persist the processor customer identifier created for this account.
    async fn set_stripe_customer(&self, id: Uuid, customer_id: &str) -> BillingResult<()>;

    /// Apply a plan activation/change to the account row.
    async fn activate_plan(&self, id: Uuid, activation: &PlanActivation) -> BillingResult<()>;

    /// Record a scheduled cancellation: status flips, plan and period end
    /// stay so paid features last until the period completes.
    async fn mark_cancel_at_period_end(&self, id: Uuid) -> BillingResult<()>;

    /// Terminal downgrade of the account row: plan=free, the given status,
    /// subscription id and period end cleared, credits zeroed.
    async fn clear_subscription(&self, id: Uuid, status: SubscriptionStatus) -> BillingResult<()>;

    /// Accounts still holding paid access whose period end is strictly
    /// before `now`.
    async fn expired_professionals(
        &self,
        now: OffsetDateTime,
    ) -> BillingResult<Vec<ProfessionalAccount>>;

    async fn open_history_entry(
        &self,
        id: Uuid,
        plan: PlanTier,
        status: SubscriptionStatus,
        started_at: OffsetDateTime,
    ) -> BillingResult<()>;

    /// Close every open history entry for the account; returns how many
    /// were closed (0 when re-run).
    async fn close_history_entries(&self, id: Uuid, ended_at: OffsetDateTime)
        -> BillingResult<u64>;

    async fn email_credits(&self, id: Uuid) -> BillingResult<i32>;

    /// Guarded decrement: fails with `InsufficientCredits` instead of going
    /// negative. Returns the remaining balance.
    async fn consume_email_credit(&self, id: Uuid) -> BillingResult<i32>;

    async fn record_email(&self, entry: &EmailLogEntry) -> BillingResult<()>;

    /// Mark all but the `keep_active` earliest-created staff members
    /// inactive. Staff are never deleted. Returns how many were deactivated.
    async fn deactivate_excess_staff(&self, id: Uuid, keep_active: i64) -> BillingResult<u64>;

    async fn count_active(&self, id: Uuid, kind: ResourceKind) -> BillingResult<i64>;
}

/// Production store over PostgreSQL.
#[derive(Clone)]
pub struct PgBillingStore {
    pool: PgPool,
}

impl PgBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ACCOUNT_COLUMNS: &str = r#"
    id, user_id, email, business_name, plan,
    stripe_customer_id, stripe_subscription_id,
    subscription_status, subscription_end_date, subscription_will_renew,
    email_credits, created_at, updated_at
"#;

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn professional(&self, id: Uuid) -> BillingResult<Option<ProfessionalAccount>> {
        let account = sqlx::query_as::<_, ProfessionalAccount>(&format!(
            "SELECT {} FROM professionals WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn professional_by_user(
        &self,
        user_id: Uuid,
    ) -> BillingResult<Option<ProfessionalAccount>> {
        let account = sqlx::query_as::<_, ProfessionalAccount>(&format!(
            "SELECT {} FROM professionals WHERE user_id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn set_stripe_customer(&self, id: Uuid, customer_id: &str) -> BillingResult<()> {
        sqlx::query(
            r#"
            UPDATE professionals
            SET stripe_customer_id = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn activate_plan(&self, id: Uuid, activation: &PlanActivation) -> BillingResult<()> {
        sqlx::query(
            r#"
            UPDATE professionals
            SET plan = $2,
                stripe_subscription_id = $3,
                subscription_status = $4,
                subscription_end_date = $5,
                subscription_will_renew = $6,
                email_credits = $7,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(activation.plan.as_str())
        .bind(&activation.subscription_id)
        .bind(activation.status.as_str())
        .bind(activation.period_end)
        .bind(activation.will_renew)
        .bind(activation.email_credits)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_cancel_at_period_end(&self, id: Uuid) -> BillingResult<()> {
        sqlx::query(
            r#"
            UPDATE professionals
            SET subscription_status = 'canceled_at_period_end',
                subscription_will_renew = FALSE,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_subscription(&self, id: Uuid, status: SubscriptionStatus) -> BillingResult<()> {
        sqlx::query(
            r#"
            UPDATE professionals
            SET plan = 'free',
                subscription_status = $2,
                stripe_subscription_id = NULL,
                subscription_end_date = NULL,
                subscription_will_renew = FALSE,
                email_credits = 0,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn expired_professionals(
        &self,
        now: OffsetDateTime,
    ) -> BillingResult<Vec<ProfessionalAccount>> {
        let accounts = sqlx::query_as::<_, ProfessionalAccount>(&format!(
            r#"
            SELECT {}
            FROM professionals
            WHERE subscription_status IN ('active', 'canceled_at_period_end')
              AND plan <> 'free'
              AND subscription_end_date IS NOT NULL
              AND subscription_end_date < $1
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn open_history_entry(
        &self,
        id: Uuid,
        plan: PlanTier,
        status: SubscriptionStatus,
        started_at: OffsetDateTime,
    ) -> BillingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subscription_history (professional_id, plan, status, started_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(plan.as_str())
        .bind(status.as_str())
        .bind(started_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn close_history_entries(
        &self,
        id: Uuid,
        ended_at: OffsetDateTime,
    ) -> BillingResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_history
            SET ended_at = $2
            WHERE professional_id = $1
              AND ended_at IS NULL
            "#,
        )
        .bind(id)
        .bind(ended_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn email_credits(&self, id: Uuid) -> BillingResult<i32> {
        let credits: Option<i32> =
            sqlx::query_scalar("SELECT email_credits FROM professionals WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        credits.ok_or(BillingError::ProfileNotFound)
    }

    async fn consume_email_credit(&self, id: Uuid) -> BillingResult<i32> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE professionals
            SET email_credits = email_credits - 1,
                updated_at = NOW()
            WHERE id = $1
              AND email_credits > 0
            RETURNING email_credits
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        remaining.ok_or(BillingError::InsufficientCredits)
    }

    async fn record_email(&self, entry: &EmailLogEntry) -> BillingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO email_logs (professional_id, recipient, email_type, provider_message_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.professional_id)
        .bind(&entry.recipient)
        .bind(&entry.email_type)
        .bind(&entry.provider_message_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn deactivate_excess_staff(&self, id: Uuid, keep_active: i64) -> BillingResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE staff_members
            SET is_active = FALSE
            WHERE professional_id = $1
              AND is_active
              AND id NOT IN (
                  SELECT id FROM staff_members
                  WHERE professional_id = $1
                  ORDER BY created_at ASC
                  LIMIT $2
              )
            "#,
        )
        .bind(id)
        .bind(keep_active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_active(&self, id: Uuid, kind: ResourceKind) -> BillingResult<i64> {
        let query = match kind {
            ResourceKind::Service => {
                "SELECT COUNT(*) FROM services WHERE professional_id = $1 AND is_active"
            }
            ResourceKind::Gallery => {
                "SELECT COUNT(*) FROM gallery_photos WHERE professional_id = $1 AND is_active"
            }
        };

        let count: i64 = sqlx::query_scalar(query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
