//! Payment-processor seam.
//!
//! The orchestrators talk to Stripe through the [`PaymentProcessor`] trait so
//! tests can substitute an in-memory fake. [`StripeProcessor`] is the
//! production implementation over async-stripe.

use std::collections::HashMap;

use async_trait::async_trait;
use stripe::generated::billing::subscription::SubscriptionProrationBehavior;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionPaymentMethodTypes, CreateCustomer, Customer, CustomerId, Subscription,
    SubscriptionId, SubscriptionStatus as StripeSubStatus, UpdateSubscription,
    UpdateSubscriptionItems,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::client::StripeClient;

/// Processor-side failure, with the one distinction callers care about:
/// the remote resource no longer exists vs. anything else.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The referenced remote object does not exist (deleted or never
    /// created). Cancellation reinterprets this as "already cancelled".
    #[error("remote resource no longer exists")]
    Missing,

    #[error("{0}")]
    Api(String),
}

/// Remote subscription status vocabulary, reduced to what the decision
/// table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSubStatus {
    Active,
    Canceled,
    PastDue,
    Unpaid,
    Incomplete,
    Other,
}

impl RemoteSubStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteSubStatus::Active => "active",
            RemoteSubStatus::Canceled => "canceled",
            RemoteSubStatus::PastDue => "past_due",
            RemoteSubStatus::Unpaid => "unpaid",
            RemoteSubStatus::Incomplete => "incomplete",
            RemoteSubStatus::Other => "other",
        }
    }
}

impl std::fmt::Display for RemoteSubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a remote subscription, detached from the processor SDK types.
#[derive(Debug, Clone)]
pub struct ProcessorSubscription {
    pub id: String,
    pub status: RemoteSubStatus,
    pub cancel_at_period_end: bool,
    pub current_period_end: OffsetDateTime,
    pub price_id: Option<String>,
}

/// A hosted checkout session the client is redirected to.
#[derive(Debug, Clone)]
pub struct HostedCheckout {
    pub session_id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a customer record for a professional account and return its
    /// identifier.
    async fn create_customer(
        &self,
        email: &str,
        professional_id: Uuid,
    ) -> Result<String, ProcessorError>;

    /// Fetch a subscription by identifier.
    async fn subscription(&self, id: &str) -> Result<ProcessorSubscription, ProcessorError>;

    /// Swap the subscription's single item to a new price with prorated
    /// billing adjustment.
    async fn change_subscription_price(
        &self,
        id: &str,
        price_id: &str,
    ) -> Result<ProcessorSubscription, ProcessorError>;

    /// Request cancellation at period end (billing stops renewing; access
    /// continues until the current period completes).
    async fn cancel_at_period_end(&self, id: &str)
        -> Result<ProcessorSubscription, ProcessorError>;

    /// Create a hosted card-payment checkout session in subscription mode.
    async fn create_checkout_session(
        &self,
        customer_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<HostedCheckout, ProcessorError>;
}

/// Production processor over async-stripe.
#[derive(Clone)]
pub struct StripeProcessor {
    client: StripeClient,
}

impl StripeProcessor {
    pub fn new(client: StripeClient) -> Self {
        Self { client }
    }

    fn map_status(status: StripeSubStatus) -> RemoteSubStatus {
        match status {
            StripeSubStatus::Active => RemoteSubStatus::Active,
            StripeSubStatus::Canceled => RemoteSubStatus::Canceled,
            StripeSubStatus::PastDue => RemoteSubStatus::PastDue,
            StripeSubStatus::Unpaid => RemoteSubStatus::Unpaid,
            StripeSubStatus::Incomplete | StripeSubStatus::IncompleteExpired => {
                RemoteSubStatus::Incomplete
            }
            _ => RemoteSubStatus::Other,
        }
    }

    fn snapshot(subscription: &Subscription) -> ProcessorSubscription {
        let price_id = subscription
            .items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.to_string());

        let current_period_end =
            OffsetDateTime::from_unix_timestamp(subscription.current_period_end)
                .unwrap_or_else(|_| OffsetDateTime::now_utc());

        ProcessorSubscription {
            id: subscription.id.to_string(),
            status: Self::map_status(subscription.status),
            cancel_at_period_end: subscription.cancel_at_period_end,
            current_period_end,
            price_id,
        }
    }

    fn map_err(e: stripe::StripeError) -> ProcessorError {
        let message = e.to_string();
        // Stripe reports deleted/unknown objects with the resource_missing
        // error code; reinterpret those rather than surfacing a hard failure.
        if message.contains("resource_missing") || message.contains("No such") {
            ProcessorError::Missing
        } else {
            ProcessorError::Api(message)
        }
    }

    fn parse_subscription_id(id: &str) -> Result<SubscriptionId, ProcessorError> {
        id.parse::<SubscriptionId>()
            .map_err(|e| ProcessorError::Api(format!("invalid subscription id: {}", e)))
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn create_customer(
        &self,
        email: &str,
        professional_id: Uuid,
    ) -> Result<String, ProcessorError> {
        let mut metadata = HashMap::new();
        metadata.insert("professional_id".to_string(), professional_id.to_string());

        let mut params = CreateCustomer::new();
        params.email = Some(email);
        params.metadata = Some(metadata);

        let customer = Customer::create(self.client.inner(), params)
            .await
            .map_err(Self::map_err)?;

        tracing::info!(
            customer_id = %customer.id,
            professional_id = %professional_id,
            "Created Stripe customer"
        );

        Ok(customer.id.to_string())
    }

    async fn subscription(&self, id: &str) -> Result<ProcessorSubscription, ProcessorError> {
        let sub_id = Self::parse_subscription_id(id)?;
        let subscription = Subscription::retrieve(self.client.inner(), &sub_id, &[])
            .await
            .map_err(Self::map_err)?;

        Ok(Self::snapshot(&subscription))
    }

    async fn change_subscription_price(
        &self,
        id: &str,
        price_id: &str,
    ) -> Result<ProcessorSubscription, ProcessorError> {
        let sub_id = Self::parse_subscription_id(id)?;

        // The item id is required for an in-place swap.
        let current = Subscription::retrieve(self.client.inner(), &sub_id, &[])
            .await
            .map_err(Self::map_err)?;

        let item_id = current
            .items
            .data
            .first()
            .map(|item| item.id.to_string())
            .ok_or_else(|| ProcessorError::Api("subscription has no items".to_string()))?;

        let params = UpdateSubscription {
            items: Some(vec![UpdateSubscriptionItems {
                id: Some(item_id),
                price: Some(price_id.to_string()),
                ..Default::default()
            }]),
            // Charge the prorated difference immediately on upgrade.
            proration_behavior: Some(SubscriptionProrationBehavior::CreateProrations),
            ..Default::default()
        };

        let subscription = Subscription::update(self.client.inner(), &sub_id, params)
            .await
            .map_err(Self::map_err)?;

        tracing::info!(
            subscription_id = %subscription.id,
            price_id = %price_id,
            "Swapped subscription price in place"
        );

        Ok(Self::snapshot(&subscription))
    }

    async fn cancel_at_period_end(
        &self,
        id: &str,
    ) -> Result<ProcessorSubscription, ProcessorError> {
        let sub_id = Self::parse_subscription_id(id)?;

        let params = UpdateSubscription {
            cancel_at_period_end: Some(true),
            ..Default::default()
        };

        let subscription = Subscription::update(self.client.inner(), &sub_id, params)
            .await
            .map_err(Self::map_err)?;

        tracing::info!(
            subscription_id = %subscription.id,
            "Scheduled subscription cancellation at period end"
        );

        Ok(Self::snapshot(&subscription))
    }

    async fn create_checkout_session(
        &self,
        customer_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<HostedCheckout, ProcessorError> {
        let customer_id = customer_id
            .parse::<CustomerId>()
            .map_err(|e| ProcessorError::Api(format!("invalid customer id: {}", e)))?;

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Subscription);
        params.customer = Some(customer_id);
        params.payment_method_types = Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);
        params.success_url = Some(success_url);
        params.cancel_url = Some(cancel_url);
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(price_id.to_string()),
            quantity: Some(1),
            ..Default::default()
        }]);

        let session = CheckoutSession::create(self.client.inner(), params)
            .await
            .map_err(Self::map_err)?;

        let url = session
            .url
            .ok_or_else(|| ProcessorError::Api("checkout session has no url".to_string()))?;

        tracing::info!(
            session_id = %session.id,
            price_id = %price_id,
            "Created checkout session"
        );

        Ok(HostedCheckout {
            session_id: session.id.to_string(),
            url,
        })
    }
}
