use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentSubscriptionDto {
    pub stripe_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: DateTime<Utc>,
}

impl From<SubscriptionEntity> for CurrentSubscriptionDto {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            status: value.status(),
            stripe_subscription_id: value.stripe_subscription_id,
            current_period_end: value.current_period_end,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateCheckoutResponse {
    pub session_id: String,
    pub checkout_url: Option<String>,
}
