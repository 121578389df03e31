//! In-memory fakes for the store, processor, and mailer seams.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use beautyon_shared::{PlanTier, SubscriptionStatus};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::client::PriceIds;
use crate::email::{Mailer, MailerError, OutboundEmail};
use crate::error::{BillingError, BillingResult};
use crate::processor::{
    HostedCheckout, PaymentProcessor, ProcessorError, ProcessorSubscription, RemoteSubStatus,
};
use crate::store::{
    BillingStore, EmailLogEntry, PlanActivation, ProfessionalAccount, ResourceKind,
};

pub fn test_prices() -> PriceIds {
    PriceIds {
        starteris: "price_starteris_m".to_string(),
        pro: "price_pro_m".to_string(),
        bizness: "price_bizness_m".to_string(),
    }
}

// ============================================================================
// InMemoryStore
// ============================================================================

#[derive(Debug, Clone)]
struct HistoryRow {
    professional_id: Uuid,
    #[allow(dead_code)]
    plan: String,
    #[allow(dead_code)]
    status: String,
    #[allow(dead_code)]
    started_at: OffsetDateTime,
    ended_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
struct StaffRow {
    professional_id: Uuid,
    created_at: OffsetDateTime,
    is_active: bool,
}

#[derive(Default)]
pub struct InMemoryStore {
    accounts: Mutex<HashMap<Uuid, ProfessionalAccount>>,
    history: Mutex<Vec<HistoryRow>>,
    staff: Mutex<Vec<StaffRow>>,
    email_log: Mutex<Vec<EmailLogEntry>>,
    resource_counts: Mutex<HashMap<(Uuid, &'static str), i64>>,
    fail_clear: Mutex<HashSet<Uuid>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a default free-tier account, customised by `configure`.
    pub fn insert_account(
        &self,
        email: &str,
        configure: impl FnOnce(&mut ProfessionalAccount),
    ) -> Uuid {
        let now = OffsetDateTime::now_utc();
        let mut account = ProfessionalAccount {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            business_name: String::new(),
            plan: "free".to_string(),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            subscription_status: "inactive".to_string(),
            subscription_end_date: None,
            subscription_will_renew: false,
            email_credits: 0,
            created_at: now,
            updated_at: now,
        };
        configure(&mut account);
        let id = account.id;
        self.accounts.lock().unwrap().insert(id, account);
        id
    }

    pub fn account(&self, id: Uuid) -> ProfessionalAccount {
        self.accounts.lock().unwrap().get(&id).cloned().unwrap()
    }

    /// `count` staff members with ascending creation times.
    pub fn insert_staff(&self, professional_id: Uuid, count: usize) {
        let base = OffsetDateTime::now_utc() - Duration::days(30);
        let mut staff = self.staff.lock().unwrap();
        for i in 0..count {
            staff.push(StaffRow {
                professional_id,
                created_at: base + Duration::minutes(i as i64),
                is_active: true,
            });
        }
    }

    pub fn staff_count(&self, professional_id: Uuid) -> usize {
        self.staff
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.professional_id == professional_id)
            .count()
    }

    pub fn active_staff_count(&self, professional_id: Uuid) -> usize {
        self.staff
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.professional_id == professional_id && s.is_active)
            .count()
    }

    pub fn earliest_staff_is_active(&self, professional_id: Uuid) -> bool {
        let staff = self.staff.lock().unwrap();
        staff
            .iter()
            .filter(|s| s.professional_id == professional_id)
            .min_by_key(|s| s.created_at)
            .map(|s| s.is_active)
            .unwrap_or(false)
    }

    pub fn open_history(&self, professional_id: Uuid, plan: &str) {
        self.history.lock().unwrap().push(HistoryRow {
            professional_id,
            plan: plan.to_string(),
            status: "active".to_string(),
            started_at: OffsetDateTime::now_utc() - Duration::days(30),
            ended_at: None,
        });
    }

    pub fn open_history_count(&self, professional_id: Uuid) -> usize {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.professional_id == professional_id && h.ended_at.is_none())
            .count()
    }

    pub fn email_log_count(&self, professional_id: Uuid) -> usize {
        self.email_log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.professional_id == professional_id)
            .count()
    }

    pub fn last_logged_message_id(&self, professional_id: Uuid) -> Option<String> {
        self.email_log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|e| e.professional_id == professional_id)
            .and_then(|e| e.provider_message_id.clone())
    }

    pub fn set_resource_count(&self, professional_id: Uuid, kind: ResourceKind, count: i64) {
        self.resource_counts
            .lock()
            .unwrap()
            .insert((professional_id, kind.as_str()), count);
    }

    /// Make `clear_subscription` fail for one account, to exercise
    /// partial-failure handling.
    pub fn fail_clear_subscription_for(&self, professional_id: Uuid) {
        self.fail_clear.lock().unwrap().insert(professional_id);
    }
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn professional(&self, id: Uuid) -> BillingResult<Option<ProfessionalAccount>> {
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }

    async fn professional_by_user(
        &self,
        user_id: Uuid,
    ) -> BillingResult<Option<ProfessionalAccount>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    async fn set_stripe_customer(&self, id: Uuid, customer_id: &str) -> BillingResult<()> {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&id) {
            account.stripe_customer_id = Some(customer_id.to_string());
            account.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn activate_plan(&self, id: Uuid, activation: &PlanActivation) -> BillingResult<()> {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&id) {
            account.plan = activation.plan.as_str().to_string();
            account.stripe_subscription_id = Some(activation.subscription_id.clone());
            account.subscription_status = activation.status.as_str().to_string();
            account.subscription_end_date = activation.period_end;
            account.subscription_will_renew = activation.will_renew;
            account.email_credits = activation.email_credits;
            account.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn mark_cancel_at_period_end(&self, id: Uuid) -> BillingResult<()> {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&id) {
            account.subscription_status = "canceled_at_period_end".to_string();
            account.subscription_will_renew = false;
            account.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn clear_subscription(&self, id: Uuid, status: SubscriptionStatus) -> BillingResult<()> {
        if self.fail_clear.lock().unwrap().contains(&id) {
            return Err(BillingError::Internal("simulated store failure".to_string()));
        }
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&id) {
            account.plan = "free".to_string();
            account.subscription_status = status.as_str().to_string();
            account.stripe_subscription_id = None;
            account.subscription_end_date = None;
            account.subscription_will_renew = false;
            account.email_credits = 0;
            account.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn expired_professionals(
        &self,
        now: OffsetDateTime,
    ) -> BillingResult<Vec<ProfessionalAccount>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                matches!(
                    a.subscription_status.as_str(),
                    "active" | "canceled_at_period_end"
                ) && a.plan != "free"
                    && a.subscription_end_date.map(|end| end < now).unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn open_history_entry(
        &self,
        id: Uuid,
        plan: PlanTier,
        status: SubscriptionStatus,
        started_at: OffsetDateTime,
    ) -> BillingResult<()> {
        self.history.lock().unwrap().push(HistoryRow {
            professional_id: id,
            plan: plan.as_str().to_string(),
            status: status.as_str().to_string(),
            started_at,
            ended_at: None,
        });
        Ok(())
    }

    async fn close_history_entries(
        &self,
        id: Uuid,
        ended_at: OffsetDateTime,
    ) -> BillingResult<u64> {
        let mut closed = 0;
        for row in self.history.lock().unwrap().iter_mut() {
            if row.professional_id == id && row.ended_at.is_none() {
                row.ended_at = Some(ended_at);
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn email_credits(&self, id: Uuid) -> BillingResult<i32> {
        self.accounts
            .lock()
            .unwrap()
            .get(&id)
            .map(|a| a.email_credits)
            .ok_or(BillingError::ProfileNotFound)
    }

    async fn consume_email_credit(&self, id: Uuid) -> BillingResult<i32> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(&id).ok_or(BillingError::ProfileNotFound)?;
        if account.email_credits < 1 {
            return Err(BillingError::InsufficientCredits);
        }
        account.email_credits -= 1;
        Ok(account.email_credits)
    }

    async fn record_email(&self, entry: &EmailLogEntry) -> BillingResult<()> {
        self.email_log.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn deactivate_excess_staff(&self, id: Uuid, keep_active: i64) -> BillingResult<u64> {
        let mut staff = self.staff.lock().unwrap();
        let mut ordered: Vec<usize> = staff
            .iter()
            .enumerate()
            .filter(|(_, s)| s.professional_id == id)
            .map(|(i, _)| i)
            .collect();
        ordered.sort_by_key(|&i| staff[i].created_at);

        let mut deactivated = 0;
        for &i in ordered.iter().skip(keep_active.max(0) as usize) {
            if staff[i].is_active {
                staff[i].is_active = false;
                deactivated += 1;
            }
        }
        Ok(deactivated)
    }

    async fn count_active(&self, id: Uuid, kind: ResourceKind) -> BillingResult<i64> {
        Ok(self
            .resource_counts
            .lock()
            .unwrap()
            .get(&(id, kind.as_str()))
            .copied()
            .unwrap_or(0))
    }
}

// ============================================================================
// FakeProcessor
// ============================================================================

#[derive(Default)]
pub struct FakeProcessor {
    subscriptions: Mutex<HashMap<String, ProcessorSubscription>>,
    price_change_failure: Mutex<Option<String>>,
    customers_created: AtomicUsize,
    sessions_created: AtomicUsize,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_subscription(
        &self,
        id: &str,
        status: RemoteSubStatus,
        price_id: &str,
        period_end: OffsetDateTime,
    ) {
        self.subscriptions.lock().unwrap().insert(
            id.to_string(),
            ProcessorSubscription {
                id: id.to_string(),
                status,
                cancel_at_period_end: false,
                current_period_end: period_end,
                price_id: Some(price_id.to_string()),
            },
        );
    }

    pub fn insert_active_subscription(
        &self,
        id: &str,
        price_id: &str,
        period_end: OffsetDateTime,
    ) {
        self.insert_subscription(id, RemoteSubStatus::Active, price_id, period_end);
    }

    pub fn insert_canceled_subscription(
        &self,
        id: &str,
        price_id: &str,
        period_end: OffsetDateTime,
    ) {
        self.insert_subscription(id, RemoteSubStatus::Canceled, price_id, period_end);
    }

    /// Make every price-change attempt fail with `reason`.
    pub fn fail_price_changes(&self, reason: &str) {
        *self.price_change_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn subscription_snapshot(&self, id: &str) -> ProcessorSubscription {
        self.subscriptions.lock().unwrap().get(id).cloned().unwrap()
    }

    pub fn customers_created(&self) -> usize {
        self.customers_created.load(Ordering::SeqCst)
    }

    pub fn checkout_sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_customer(
        &self,
        _email: &str,
        _professional_id: Uuid,
    ) -> Result<String, ProcessorError> {
        let n = self.customers_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("cus_fake_{}", n))
    }

    async fn subscription(&self, id: &str) -> Result<ProcessorSubscription, ProcessorError> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(ProcessorError::Missing)
    }

    async fn change_subscription_price(
        &self,
        id: &str,
        price_id: &str,
    ) -> Result<ProcessorSubscription, ProcessorError> {
        if let Some(reason) = self.price_change_failure.lock().unwrap().clone() {
            return Err(ProcessorError::Api(reason));
        }
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions.get_mut(id).ok_or(ProcessorError::Missing)?;
        subscription.price_id = Some(price_id.to_string());
        Ok(subscription.clone())
    }

    async fn cancel_at_period_end(
        &self,
        id: &str,
    ) -> Result<ProcessorSubscription, ProcessorError> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions.get_mut(id).ok_or(ProcessorError::Missing)?;
        subscription.cancel_at_period_end = true;
        Ok(subscription.clone())
    }

    async fn create_checkout_session(
        &self,
        _customer_id: &str,
        _price_id: &str,
        _success_url: &str,
        _cancel_url: &str,
    ) -> Result<HostedCheckout, ProcessorError> {
        let n = self.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(HostedCheckout {
            session_id: format!("cs_test_{}", n),
            url: format!("https://checkout.stripe.test/pay/cs_test_{}", n),
        })
    }
}

// ============================================================================
// FakeMailer
// ============================================================================

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    failure: Mutex<Option<String>>,
}

impl FakeMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &OutboundEmail) -> Result<String, MailerError> {
        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(MailerError(reason));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("msg_fake_{}", sent.len()))
    }
}
