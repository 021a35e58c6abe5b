use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::qrcodes},
};
use domain::{
    entities::qr_codes::{InsertQrCodeEntity, QrCodeEntity},
    repositories::qr_codes::QrCodeRepository,
    value_objects::enums::{qr_types::QrType, sort_order::SortOrder},
};

pub struct QrCodePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl QrCodePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl QrCodeRepository for QrCodePostgres {
    async fn insert(&self, insert_qr_code_entity: InsertQrCodeEntity) -> Result<QrCodeEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(qrcodes::table)
            .values(&insert_qr_code_entity)
            .returning(QrCodeEntity::as_returning())
            .get_result::<QrCodeEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<QrCodeEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = qrcodes::table
            .filter(qrcodes::id.eq(id))
            .filter(qrcodes::user_id.eq(user_id))
            .select(QrCodeEntity::as_select())
            .first::<QrCodeEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        sort_order: SortOrder,
    ) -> Result<Vec<QrCodeEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let mut query = qrcodes::table
            .filter(qrcodes::user_id.eq(user_id))
            .select(QrCodeEntity::as_select())
            .into_boxed();

        query = match sort_order {
            SortOrder::Asc => query.order(qrcodes::created_at.asc()),
            SortOrder::Desc => query.order(qrcodes::created_at.desc()),
        };

        let results = query.load::<QrCodeEntity>(&mut conn)?;

        Ok(results)
    }

    async fn confirm_free(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<QrCodeEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(qrcodes::table)
            .filter(qrcodes::id.eq(id))
            .filter(qrcodes::user_id.eq(user_id))
            .filter(qrcodes::qr_type.eq(QrType::Free.to_string()))
            .filter(qrcodes::is_active.eq(true))
            .filter(qrcodes::expires_at.gt(now))
            .set((
                qrcodes::expires_at.eq(new_expires_at),
                qrcodes::last_confirmed_at.eq(Some(now)),
            ))
            .returning(QrCodeEntity::as_returning())
            .get_result::<QrCodeEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn deactivate_all_premium_for(&self, user_id: Uuid) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(qrcodes::table)
            .filter(qrcodes::user_id.eq(user_id))
            .filter(qrcodes::qr_type.eq(QrType::Premium.to_string()))
            .filter(qrcodes::is_active.eq(true))
            .set(qrcodes::is_active.eq(false))
            .execute(&mut conn)?;

        Ok(affected)
    }
}
