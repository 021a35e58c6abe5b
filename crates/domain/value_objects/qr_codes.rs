use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::domain::{
    entities::qr_codes::{InsertQrCodeEntity, QrCodeEntity},
    value_objects::{
        enums::{
            qr_code_states::QrCodeState, qr_shapes::QrShape, qr_types::QrType,
            sort_order::SortOrder,
        },
        qr_styles::QrStyle,
    },
};

pub const MAX_TARGET_URL_LEN: usize = 2048;
/// A free code lives for one month, counted as a fixed 30 days.
pub const FREE_VALIDITY_DAYS: i64 = 30;
pub const PREMIUM_VALIDITY_MONTHS: u32 = 12;

pub fn free_deadline(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(FREE_VALIDITY_DAYS)
}

pub fn premium_deadline(now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    now.checked_add_months(Months::new(PREMIUM_VALIDITY_MONTHS))
        .ok_or_else(|| anyhow!("failed to compute premium expiry"))
}

/// Parses the encoded target and returns it in canonical form.
pub fn normalize_target_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Invalid URL: empty");
    }
    if trimmed.len() > MAX_TARGET_URL_LEN {
        bail!("Invalid URL: longer than {MAX_TARGET_URL_LEN} bytes");
    }

    let url = Url::parse(trimmed).map_err(|err| anyhow!("Invalid URL: {err}"))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => bail!("Invalid URL: unsupported scheme {scheme}"),
    }
    if url.host_str().is_none() {
        bail!("Invalid URL: missing host");
    }

    // Percent-encoding can grow the input.
    let normalized = url.to_string();
    if normalized.len() > MAX_TARGET_URL_LEN {
        bail!("Invalid URL: longer than {MAX_TARGET_URL_LEN} bytes once encoded");
    }

    Ok(normalized)
}

pub fn new_free_qr_code(user_id: Uuid, url: String, now: DateTime<Utc>) -> InsertQrCodeEntity {
    let style = QrStyle::free();
    InsertQrCodeEntity {
        user_id,
        url,
        qr_type: QrType::Free.to_string(),
        size: style.size,
        shape: style.shape.to_string(),
        color: style.color,
        logo_url: None,
        is_active: true,
        expires_at: free_deadline(now),
        created_at: now,
        last_confirmed_at: Some(now),
    }
}

pub fn new_premium_qr_code(
    user_id: Uuid,
    url: String,
    style: QrStyle,
    now: DateTime<Utc>,
) -> Result<InsertQrCodeEntity> {
    Ok(InsertQrCodeEntity {
        user_id,
        url,
        qr_type: QrType::Premium.to_string(),
        size: style.size,
        shape: style.shape.to_string(),
        color: style.color,
        logo_url: style.logo_url,
        is_active: true,
        expires_at: premium_deadline(now)?,
        created_at: now,
        last_confirmed_at: None,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFreeQrCodeModel {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePremiumQrCodeModel {
    pub url: String,
    pub size: Option<i32>,
    pub shape: Option<QrShape>,
    pub color: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQrCodesFilter {
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrCodeDto {
    pub id: Uuid,
    pub url: String,
    pub qr_type: QrType,
    pub size: i32,
    pub shape: QrShape,
    pub color: String,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_confirmed_at: Option<DateTime<Utc>>,
    pub state: QrCodeState,
    pub is_valid: bool,
    /// Free code that can still be confirmed.
    pub renewable: bool,
}

impl QrCodeDto {
    pub fn from_entity(entity: QrCodeEntity, now: DateTime<Utc>, billing_active: bool) -> Self {
        let state = entity.state_at(now, billing_active);
        let qr_type = entity.tier();
        Self {
            id: entity.id,
            shape: QrShape::from_str(&entity.shape).unwrap_or_default(),
            url: entity.url,
            qr_type,
            size: entity.size,
            color: entity.color,
            logo_url: entity.logo_url,
            is_active: entity.is_active,
            expires_at: entity.expires_at,
            created_at: entity.created_at,
            last_confirmed_at: entity.last_confirmed_at,
            state,
            is_valid: state == QrCodeState::Active,
            renewable: qr_type == QrType::Free && state == QrCodeState::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQrCodeDto {
    pub qr_code: QrCodeDto,
    pub image: String,
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn target_url_is_normalized() {
        assert_eq!(
            normalize_target_url("  https://Example.com ").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn invalid_target_urls_are_rejected() {
        for raw in ["", "example.com", "ftp://example.com/file", "mailto:a@b.c"] {
            assert!(normalize_target_url(raw).is_err(), "{raw} should be rejected");
        }
        let long = format!("https://example.com/{}", "a".repeat(MAX_TARGET_URL_LEN));
        assert!(normalize_target_url(&long).is_err());
    }

    #[test]
    fn length_limit_applies_to_the_encoded_form() {
        // 700 spaces encode to 2100 bytes.
        let raw = format!("https://example.com/?q=a{}b", " ".repeat(700));
        assert!(raw.len() < MAX_TARGET_URL_LEN);
        assert!(normalize_target_url(&raw).is_err());
    }

    #[test]
    fn free_record_gets_thirty_days_and_a_confirmation_stamp() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let record = new_free_qr_code(Uuid::new_v4(), "https://example.com/".into(), now);

        assert_eq!(record.qr_type, "free");
        assert_eq!(record.expires_at, now + Duration::days(30));
        assert_eq!(record.last_confirmed_at, Some(now));
        assert!(record.is_active);
    }

    #[test]
    fn premium_record_gets_one_calendar_year() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let record =
            new_premium_qr_code(Uuid::new_v4(), "https://example.com/".into(), QrStyle::free(), now)
                .unwrap();

        assert_eq!(
            record.expires_at,
            Utc.with_ymd_and_hms(2027, 3, 1, 0, 0, 0).unwrap()
        );
        assert!(record.last_confirmed_at.is_none());
    }
}
