//! In-memory stand-ins shared by use-case scenario tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use crates::{
    domain::{
        clock::Clock,
        entities::{
            qr_codes::{InsertQrCodeEntity, QrCodeEntity},
            subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
        },
        repositories::{qr_codes::QrCodeRepository, subscriptions::SubscriptionRepository},
        value_objects::enums::{
            qr_types::QrType, sort_order::SortOrder, subscription_statuses::SubscriptionStatus,
        },
    },
    payments::{
        stripe_client::{CheckoutSession, StripeSubscription, StripeSubscriptionItems},
        webhook_signature,
    },
};
use uuid::Uuid;

use crate::usecases::billing::StripeGateway;

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap()
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Backs both repositories so cascades can be observed end to end.
#[derive(Default)]
pub struct InMemoryStore {
    qr_codes: Mutex<Vec<QrCodeEntity>>,
    subscriptions: Mutex<Vec<SubscriptionEntity>>,
}

impl InMemoryStore {
    pub fn qr_code(&self, id: Uuid) -> Option<QrCodeEntity> {
        self.qr_codes
            .lock()
            .unwrap()
            .iter()
            .find(|code| code.id == id)
            .cloned()
    }

    pub fn subscription(&self, stripe_subscription_id: &str) -> Option<SubscriptionEntity> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|sub| sub.stripe_subscription_id == stripe_subscription_id)
            .cloned()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    pub fn seed_subscription(
        &self,
        user_id: Uuid,
        stripe_subscription_id: &str,
        status: &str,
        current_period_end: DateTime<Utc>,
    ) {
        self.subscriptions.lock().unwrap().push(SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            stripe_customer_id: format!("cus_{user_id}"),
            stripe_subscription_id: stripe_subscription_id.to_string(),
            status: status.to_string(),
            current_period_end,
            created_at: current_period_end - Duration::days(365),
        });
    }
}

#[async_trait]
impl QrCodeRepository for InMemoryStore {
    async fn insert(&self, insert_qr_code_entity: InsertQrCodeEntity) -> Result<QrCodeEntity> {
        let entity = QrCodeEntity {
            id: Uuid::new_v4(),
            user_id: insert_qr_code_entity.user_id,
            url: insert_qr_code_entity.url,
            qr_type: insert_qr_code_entity.qr_type,
            size: insert_qr_code_entity.size,
            shape: insert_qr_code_entity.shape,
            color: insert_qr_code_entity.color,
            logo_url: insert_qr_code_entity.logo_url,
            is_active: insert_qr_code_entity.is_active,
            expires_at: insert_qr_code_entity.expires_at,
            created_at: insert_qr_code_entity.created_at,
            last_confirmed_at: insert_qr_code_entity.last_confirmed_at,
        };
        self.qr_codes.lock().unwrap().push(entity.clone());
        Ok(entity)
    }

    async fn find_by_id_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<QrCodeEntity>> {
        Ok(self
            .qr_codes
            .lock()
            .unwrap()
            .iter()
            .find(|code| code.id == id && code.user_id == user_id)
            .cloned())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        sort_order: SortOrder,
    ) -> Result<Vec<QrCodeEntity>> {
        let mut codes: Vec<_> = self
            .qr_codes
            .lock()
            .unwrap()
            .iter()
            .filter(|code| code.user_id == user_id)
            .cloned()
            .collect();
        codes.sort_by_key(|code| code.created_at);
        if sort_order == SortOrder::Desc {
            codes.reverse();
        }
        Ok(codes)
    }

    async fn confirm_free(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<QrCodeEntity>> {
        let mut codes = self.qr_codes.lock().unwrap();
        let Some(code) = codes.iter_mut().find(|code| {
            code.id == id
                && code.user_id == user_id
                && code.qr_type == QrType::Free.as_str()
                && code.is_active
                && code.expires_at > now
        }) else {
            return Ok(None);
        };

        code.expires_at = new_expires_at;
        code.last_confirmed_at = Some(now);
        Ok(Some(code.clone()))
    }

    async fn deactivate_all_premium_for(&self, user_id: Uuid) -> Result<usize> {
        let mut codes = self.qr_codes.lock().unwrap();
        let mut switched = 0;
        for code in codes.iter_mut().filter(|code| {
            code.user_id == user_id && code.qr_type == QrType::Premium.as_str() && code.is_active
        }) {
            code.is_active = false;
            switched += 1;
        }
        Ok(switched)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn upsert_from_checkout(
        &self,
        upsert_subscription_entity: UpsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if let Some(existing) = subscriptions.iter_mut().find(|sub| {
            sub.stripe_subscription_id == upsert_subscription_entity.stripe_subscription_id
        }) {
            existing.user_id = upsert_subscription_entity.user_id;
            existing.stripe_customer_id = upsert_subscription_entity.stripe_customer_id;
            existing.status = upsert_subscription_entity.status;
            existing.current_period_end = upsert_subscription_entity.current_period_end;
            return Ok(existing.clone());
        }

        let entity = SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: upsert_subscription_entity.user_id,
            stripe_customer_id: upsert_subscription_entity.stripe_customer_id,
            stripe_subscription_id: upsert_subscription_entity.stripe_subscription_id,
            status: upsert_subscription_entity.status,
            current_period_end: upsert_subscription_entity.current_period_end,
            created_at: Utc::now(),
        };
        subscriptions.push(entity.clone());
        Ok(entity)
    }

    async fn update_status(
        &self,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
        current_period_end: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let Some(existing) = subscriptions
            .iter_mut()
            .find(|sub| sub.stripe_subscription_id == stripe_subscription_id)
        else {
            return Ok(0);
        };

        existing.status = status.to_string();
        if let Some(period_end) = current_period_end {
            existing.current_period_end = period_end;
        }
        Ok(1)
    }

    async fn cancel(&self, stripe_subscription_id: &str) -> Result<Option<SubscriptionEntity>> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        Ok(subscriptions
            .iter_mut()
            .find(|sub| sub.stripe_subscription_id == stripe_subscription_id)
            .map(|existing| {
                existing.status = SubscriptionStatus::Canceled.to_string();
                existing.clone()
            }))
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let subscriptions = self.subscriptions.lock().unwrap();
        Ok(subscriptions
            .iter()
            .filter(|sub| sub.user_id == user_id && sub.status().is_entitling())
            .max_by_key(|sub| sub.current_period_end)
            .cloned())
    }
}

pub const WEBHOOK_SECRET: &str = "whsec_scenario";

/// Provider double that checks signatures with the real verifier.
#[derive(Default)]
pub struct FakeStripe {
    subscriptions: Mutex<HashMap<String, StripeSubscription>>,
    checkout_calls: Mutex<Vec<(Uuid, String)>>,
}

impl FakeStripe {
    pub fn with_subscription(
        self,
        id: &str,
        customer: &str,
        status: &str,
        current_period_end: i64,
    ) -> Self {
        self.subscriptions.lock().unwrap().insert(
            id.to_string(),
            StripeSubscription {
                id: id.to_string(),
                status: status.to_string(),
                customer: Some(customer.to_string()),
                current_period_end: Some(current_period_end),
                items: StripeSubscriptionItems::default(),
            },
        );
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Checkout sessions requested so far, as `(user_id, email)`.
    pub fn checkout_calls(&self) -> Vec<(Uuid, String)> {
        self.checkout_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StripeGateway for FakeStripe {
    async fn create_checkout_session(
        &self,
        user_id: Uuid,
        customer_email: &str,
    ) -> Result<CheckoutSession> {
        self.checkout_calls
            .lock()
            .unwrap()
            .push((user_id, customer_email.to_string()));
        Ok(CheckoutSession {
            id: format!("cs_{user_id}"),
            url: Some("https://checkout.stripe.com/c/pay/cs_test".to_string()),
        })
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| anyhow!("no such subscription: {subscription_id}"))
    }

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<()> {
        webhook_signature::verify(
            payload,
            signature_header,
            WEBHOOK_SECRET,
            now,
            webhook_signature::DEFAULT_TOLERANCE_SECS,
        )
    }
}

pub fn signed(payload: &[u8], now: DateTime<Utc>) -> String {
    webhook_signature::sign(payload, WEBHOOK_SECRET, now.timestamp()).unwrap()
}
