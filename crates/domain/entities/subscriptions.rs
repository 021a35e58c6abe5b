use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::subscription_statuses::SubscriptionStatus,
    infra::db::postgres::schema::subscriptions,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub status: String,
    pub current_period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct UpsertSubscriptionEntity {
    pub user_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub status: String,
    pub current_period_end: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status)
    }
}
