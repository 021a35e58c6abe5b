use anyhow::Result;
use crates::domain::{
    entities::subscriptions::SubscriptionEntity,
    repositories::subscriptions::SubscriptionRepository,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Answers "may this user hold premium codes right now", from the billing mirror.
pub struct EntitlementResolver<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
}

impl<S> EntitlementResolver<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>) -> Self {
        Self { subscription_repo }
    }

    pub async fn active_subscription(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let subscription = self.subscription_repo.find_active_for_user(user_id).await?;

        match subscription.as_ref() {
            Some(subscription) => debug!(
                %user_id,
                stripe_subscription_id = %subscription.stripe_subscription_id,
                status = %subscription.status,
                "entitlement: active subscription found"
            ),
            None => debug!(%user_id, "entitlement: no active subscription"),
        }

        Ok(subscription)
    }

    pub async fn has_active_billing(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.active_subscription(user_id).await?.is_some())
    }
}
