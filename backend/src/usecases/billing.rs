use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use crates::{
    domain::{
        clock::Clock,
        entities::subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
        repositories::{qr_codes::QrCodeRepository, subscriptions::SubscriptionRepository},
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus,
            subscriptions::{CreateCheckoutResponse, CurrentSubscriptionDto},
        },
    },
    payments::stripe_client::{CheckoutSession, StripeClient, StripeEvent, StripeSubscription},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::usecases::entitlement::EntitlementResolver;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        user_id: Uuid,
        customer_email: &str,
    ) -> AnyResult<CheckoutSession>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription>;

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> AnyResult<()>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        user_id: Uuid,
        customer_email: &str,
    ) -> AnyResult<CheckoutSession> {
        StripeClient::create_checkout_session(self, user_id, customer_email).await
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription> {
        StripeClient::retrieve_subscription(self, subscription_id).await
    }

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> AnyResult<()> {
        StripeClient::verify_webhook_signature(self, payload, signature_header, now)
    }
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error("user email is required for checkout")]
    MissingEmail,
    #[error("user already holds an active subscription")]
    AlreadySubscribed,
    #[error("billing provider request failed")]
    Billing(#[source] anyhow::Error),
    #[error("persistence failure")]
    Persistence(#[source] anyhow::Error),
}

impl BillingError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            BillingError::InvalidSignature
            | BillingError::InvalidWebhook(_)
            | BillingError::MissingEmail => StatusCode::BAD_REQUEST,
            BillingError::AlreadySubscribed => StatusCode::CONFLICT,
            BillingError::Billing(_) => StatusCode::BAD_GATEWAY,
            BillingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, BillingError>;

pub struct BillingUseCase<S, Q, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Q: QrCodeRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    qr_code_repo: Arc<Q>,
    entitlement: Arc<EntitlementResolver<S>>,
    stripe_client: Arc<Stripe>,
    clock: Arc<dyn Clock>,
}

impl<S, Q, Stripe> BillingUseCase<S, Q, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Q: QrCodeRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        qr_code_repo: Arc<Q>,
        stripe_client: Arc<Stripe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entitlement: Arc::new(EntitlementResolver::new(Arc::clone(&subscription_repo))),
            subscription_repo,
            qr_code_repo,
            stripe_client,
            clock,
        }
    }

    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        email: Option<String>,
    ) -> UseCaseResult<CreateCheckoutResponse> {
        info!(%user_id, "billing: checkout session requested");

        let email = email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                warn!(%user_id, "billing: checkout requested without an email");
                BillingError::MissingEmail
            })?;

        if let Some(existing) = self.load_active(user_id).await? {
            warn!(
                %user_id,
                stripe_subscription_id = %existing.stripe_subscription_id,
                "billing: checkout refused, subscription already active"
            );
            return Err(BillingError::AlreadySubscribed);
        }

        let session = self
            .stripe_client
            .create_checkout_session(user_id, &email)
            .await
            .map_err(|err| {
                error!(%user_id, error = ?err, "billing: failed to create checkout session");
                BillingError::Billing(err)
            })?;

        info!(%user_id, session_id = %session.id, "billing: checkout session created");

        Ok(CreateCheckoutResponse {
            session_id: session.id,
            checkout_url: session.url,
        })
    }

    pub async fn current_subscription(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Option<CurrentSubscriptionDto>> {
        Ok(self
            .load_active(user_id)
            .await?
            .map(CurrentSubscriptionDto::from))
    }

    /// Verifies a provider event and applies the transition it describes.
    ///
    /// Nothing is read or written before the signature checks out.
    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> UseCaseResult<()> {
        debug!(payload_len = payload.len(), "billing: stripe webhook received");

        let signature = signature.ok_or_else(|| {
            warn!("billing: stripe webhook without signature header");
            BillingError::InvalidSignature
        })?;

        self.stripe_client
            .verify_webhook_signature(payload, signature, self.clock.now().timestamp())
            .map_err(|err| {
                warn!(
                    error = %err,
                    status = BillingError::InvalidSignature.status_code().as_u16(),
                    "billing: stripe webhook verification failed"
                );
                BillingError::InvalidSignature
            })?;

        let event: StripeEvent = serde_json::from_slice(payload).map_err(|err| {
            warn!(error = %err, "billing: stripe webhook body is not an event");
            BillingError::InvalidWebhook("malformed event payload".into())
        })?;

        info!(
            event_id = ?event.id,
            event_type = %event.type_,
            event_created = ?event.created,
            "billing: stripe webhook verified"
        );

        match event.type_.as_str() {
            "checkout.session.completed" => self.handle_checkout_completed(&event).await,
            "customer.subscription.updated" => self.handle_subscription_updated(&event).await,
            "customer.subscription.deleted" => self.handle_subscription_deleted(&event).await,
            "invoice.payment_failed" => {
                self.handle_payment_failed(&event);
                Ok(())
            }
            _ => {
                debug!(event_type = %event.type_, "billing: unhandled stripe event type");
                Ok(())
            }
        }
    }

    async fn handle_checkout_completed(&self, event: &StripeEvent) -> UseCaseResult<()> {
        let session = event.checkout_session().ok_or_else(|| {
            warn!("billing: checkout session missing in webhook");
            BillingError::InvalidWebhook("checkout session object expected".into())
        })?;

        if session.mode.as_deref() != Some("subscription") {
            info!(
                session_id = ?session.id,
                mode = ?session.mode,
                "billing: ignoring non-subscription checkout"
            );
            return Ok(());
        }

        let user_id = session
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("user_id"))
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| {
                warn!(session_id = ?session.id, "billing: checkout session missing user_id metadata");
                BillingError::InvalidWebhook("metadata.user_id missing or invalid".into())
            })?;

        let subscription_id = session.subscription.as_deref().ok_or_else(|| {
            warn!(%user_id, session_id = ?session.id, "billing: checkout session without subscription");
            BillingError::InvalidWebhook("subscription id missing".into())
        })?;

        let subscription = self
            .stripe_client
            .retrieve_subscription(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    stripe_subscription_id = %subscription_id,
                    error = ?err,
                    "billing: failed to retrieve subscription"
                );
                BillingError::Billing(err)
            })?;

        let customer_id = session
            .customer
            .clone()
            .or_else(|| subscription.customer.clone())
            .ok_or_else(|| {
                warn!(%user_id, stripe_subscription_id = %subscription_id, "billing: customer id missing");
                BillingError::InvalidWebhook("customer id missing".into())
            })?;

        let current_period_end = subscription
            .period_end()
            .and_then(Self::ts_to_datetime)
            .ok_or_else(|| {
                warn!(%user_id, stripe_subscription_id = %subscription_id, "billing: period end missing");
                BillingError::InvalidWebhook("current_period_end missing".into())
            })?;

        let status = SubscriptionStatus::from_str(&subscription.status);
        let stored = self
            .subscription_repo
            .upsert_from_checkout(UpsertSubscriptionEntity {
                user_id,
                stripe_customer_id: customer_id,
                stripe_subscription_id: subscription.id.clone(),
                status: status.to_string(),
                current_period_end,
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    stripe_subscription_id = %subscription.id,
                    db_error = ?err,
                    "billing: failed to upsert subscription"
                );
                BillingError::Persistence(err)
            })?;

        info!(
            %user_id,
            stripe_subscription_id = %stored.stripe_subscription_id,
            status = %stored.status,
            current_period_end = %stored.current_period_end,
            "billing: subscription recorded from checkout"
        );
        Ok(())
    }

    async fn handle_subscription_updated(&self, event: &StripeEvent) -> UseCaseResult<()> {
        let subscription = Self::subscription_from(event)?;
        let status = SubscriptionStatus::from_str(&subscription.status);
        let period_end = subscription.period_end().and_then(Self::ts_to_datetime);

        let updated = self
            .subscription_repo
            .update_status(&subscription.id, status.clone(), period_end)
            .await
            .map_err(|err| {
                error!(
                    stripe_subscription_id = %subscription.id,
                    db_error = ?err,
                    "billing: failed to update subscription status"
                );
                BillingError::Persistence(err)
            })?;

        if updated == 0 {
            warn!(
                stripe_subscription_id = %subscription.id,
                %status,
                "billing: status update for unknown subscription"
            );
        } else {
            info!(
                stripe_subscription_id = %subscription.id,
                %status,
                "billing: subscription status updated"
            );
        }
        Ok(())
    }

    async fn handle_subscription_deleted(&self, event: &StripeEvent) -> UseCaseResult<()> {
        let subscription = Self::subscription_from(event)?;

        let Some(canceled) = self
            .subscription_repo
            .cancel(&subscription.id)
            .await
            .map_err(|err| {
                error!(
                    stripe_subscription_id = %subscription.id,
                    db_error = ?err,
                    "billing: failed to cancel subscription"
                );
                BillingError::Persistence(err)
            })?
        else {
            warn!(
                stripe_subscription_id = %subscription.id,
                "billing: deletion for unknown subscription"
            );
            return Ok(());
        };

        let user_id = canceled.user_id;
        let deactivated = self
            .qr_code_repo
            .deactivate_all_premium_for(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "billing: failed to deactivate premium codes");
                BillingError::Persistence(err)
            })?;

        info!(
            %user_id,
            stripe_subscription_id = %canceled.stripe_subscription_id,
            deactivated,
            "billing: subscription canceled, premium codes deactivated"
        );
        Ok(())
    }

    fn handle_payment_failed(&self, event: &StripeEvent) {
        match event.invoice() {
            Some(invoice) => warn!(
                invoice_id = ?invoice.id,
                customer = ?invoice.customer,
                stripe_subscription_id = ?invoice.subscription,
                "billing: invoice payment failed"
            ),
            None => warn!(event_id = ?event.id, "billing: invoice payment failed without invoice body"),
        }
    }

    async fn load_active(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Option<SubscriptionEntity>> {
        self.entitlement
            .active_subscription(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "billing: failed to load active subscription");
                BillingError::Persistence(err)
            })
    }

    fn subscription_from(event: &StripeEvent) -> UseCaseResult<StripeSubscription> {
        event.subscription().ok_or_else(|| {
            warn!(event_type = %event.type_, "billing: invalid subscription payload in webhook");
            BillingError::InvalidWebhook("subscription object expected".into())
        })
    }

    fn ts_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(ts, 0).single()
    }
}
