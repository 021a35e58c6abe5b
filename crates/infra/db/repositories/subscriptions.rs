use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};
use domain::{
    entities::subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn upsert_from_checkout(
        &self,
        upsert_subscription_entity: UpsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(subscriptions::table)
            .values(&upsert_subscription_entity)
            .on_conflict(subscriptions::stripe_subscription_id)
            .do_update()
            .set(&upsert_subscription_entity)
            .returning(SubscriptionEntity::as_returning())
            .get_result::<SubscriptionEntity>(&mut conn)?;

        Ok(result)
    }

    async fn update_status(
        &self,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
        current_period_end: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let target = subscriptions::table
            .filter(subscriptions::stripe_subscription_id.eq(stripe_subscription_id));

        let affected = match current_period_end {
            Some(period_end) => update(target)
                .set((
                    subscriptions::status.eq(status.to_string()),
                    subscriptions::current_period_end.eq(period_end),
                ))
                .execute(&mut conn)?,
            None => update(target)
                .set(subscriptions::status.eq(status.to_string()))
                .execute(&mut conn)?,
        };

        Ok(affected)
    }

    async fn cancel(&self, stripe_subscription_id: &str) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(subscriptions::table)
            .filter(subscriptions::stripe_subscription_id.eq(stripe_subscription_id))
            .set(subscriptions::status.eq(SubscriptionStatus::Canceled.to_string()))
            .returning(SubscriptionEntity::as_returning())
            .get_result::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let entitling: Vec<String> = SubscriptionStatus::entitling()
            .iter()
            .map(ToString::to_string)
            .collect();

        let result = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::status.eq_any(entitling))
            .order(subscriptions::current_period_end.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
