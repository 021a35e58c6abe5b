use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::{qr_code_states::QrCodeState, qr_types::QrType},
    infra::db::postgres::schema::qrcodes,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = qrcodes)]
pub struct QrCodeEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub qr_type: String,
    pub size: i32,
    pub shape: String,
    pub color: String,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = qrcodes)]
pub struct InsertQrCodeEntity {
    pub user_id: Uuid,
    pub url: String,
    pub qr_type: String,
    pub size: i32,
    pub shape: String,
    pub color: String,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_confirmed_at: Option<DateTime<Utc>>,
}

impl QrCodeEntity {
    /// Rows with an unrecognised tier are treated as free: they get the
    /// stricter validity rule and are never touched by billing cascades.
    pub fn tier(&self) -> QrType {
        QrType::from_str(&self.qr_type).unwrap_or(QrType::Free)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// `billing_active` is only consulted for premium rows.
    pub fn state_at(&self, now: DateTime<Utc>, billing_active: bool) -> QrCodeState {
        if !self.is_active {
            return QrCodeState::Inactive;
        }
        if self.is_expired_at(now) {
            return QrCodeState::Expired;
        }
        match self.tier() {
            QrType::Free => QrCodeState::Active,
            QrType::Premium if billing_active => QrCodeState::Active,
            QrType::Premium => QrCodeState::Inactive,
        }
    }

    pub fn is_effectively_valid(&self, now: DateTime<Utc>, billing_active: bool) -> bool {
        self.state_at(now, billing_active) == QrCodeState::Active
    }
}
