use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::qr_codes::{InsertQrCodeEntity, QrCodeEntity},
    value_objects::enums::sort_order::SortOrder,
};

#[automock]
#[async_trait]
pub trait QrCodeRepository {
    async fn insert(&self, insert_qr_code_entity: InsertQrCodeEntity) -> Result<QrCodeEntity>;

    async fn find_by_id_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<QrCodeEntity>>;

    async fn list_by_user(&self, user_id: Uuid, sort_order: SortOrder)
    -> Result<Vec<QrCodeEntity>>;

    /// Moves the deadline of an owned, active, unexpired free code in one
    /// statement. Returns `None` when any of those conditions does not hold.
    async fn confirm_free(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
        new_expires_at: DateTime<Utc>,
    ) -> Result<Option<QrCodeEntity>>;

    /// Returns how many rows were switched off.
    async fn deactivate_all_premium_for(&self, user_id: Uuid) -> Result<usize>;
}
