use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    /// Keyed on `stripe_subscription_id`.
    async fn upsert_from_checkout(
        &self,
        upsert_subscription_entity: UpsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    /// Returns the number of rows updated (0 when the subscription is unknown).
    async fn update_status(
        &self,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
        current_period_end: Option<DateTime<Utc>>,
    ) -> Result<usize>;

    async fn cancel(&self, stripe_subscription_id: &str) -> Result<Option<SubscriptionEntity>>;

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;
}
