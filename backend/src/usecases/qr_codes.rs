use std::sync::Arc;

use crates::{
    domain::{
        clock::Clock,
        entities::qr_codes::QrCodeEntity,
        repositories::{qr_codes::QrCodeRepository, subscriptions::SubscriptionRepository},
        value_objects::{
            enums::{qr_code_states::QrCodeState, qr_shapes::QrShape, qr_types::QrType},
            qr_codes::{
                CreateFreeQrCodeModel, CreatePremiumQrCodeModel, GeneratedQrCodeDto,
                ListQrCodesFilter, QrCodeDto, free_deadline, new_free_qr_code,
                new_premium_qr_code, normalize_target_url,
            },
            qr_styles::QrStyle,
        },
    },
    rendering::{QrImage, QrRenderer, is_capacity_error},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::entitlement::EntitlementResolver;

#[derive(Debug, Error)]
pub enum QrCodeError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("{0}")]
    InvalidStyle(String),
    #[error("premium QR codes require an active subscription")]
    Entitlement,
    #[error("QR code not found")]
    NotFound,
    #[error("QR code has expired")]
    CodeExpired,
    #[error("QR code is inactive")]
    CodeInactive,
    #[error("only free QR codes can be confirmed")]
    NotRenewable,
    #[error("failed to render QR code")]
    Rendering(#[source] anyhow::Error),
    #[error("persistence failure")]
    Persistence(#[source] anyhow::Error),
}

impl QrCodeError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            QrCodeError::InvalidUrl(_) | QrCodeError::InvalidStyle(_) => StatusCode::BAD_REQUEST,
            QrCodeError::Entitlement => StatusCode::FORBIDDEN,
            QrCodeError::NotFound => StatusCode::NOT_FOUND,
            QrCodeError::CodeExpired | QrCodeError::CodeInactive | QrCodeError::NotRenewable => {
                StatusCode::CONFLICT
            }
            QrCodeError::Rendering(_) | QrCodeError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, QrCodeError>;

pub struct QrCodeUseCase<Q, S, R>
where
    Q: QrCodeRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    R: QrRenderer + 'static,
{
    qr_code_repo: Arc<Q>,
    entitlement: Arc<EntitlementResolver<S>>,
    renderer: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<Q, S, R> QrCodeUseCase<Q, S, R>
where
    Q: QrCodeRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    R: QrRenderer + 'static,
{
    pub fn new(
        qr_code_repo: Arc<Q>,
        entitlement: Arc<EntitlementResolver<S>>,
        renderer: Arc<R>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            qr_code_repo,
            entitlement,
            renderer,
            clock,
        }
    }

    pub async fn generate_free(
        &self,
        user_id: Uuid,
        model: CreateFreeQrCodeModel,
    ) -> UseCaseResult<GeneratedQrCodeDto> {
        info!(%user_id, url_len = model.url.len(), "qr_codes: free generation requested");

        let url = Self::validate_url(user_id, &model.url)?;
        let image = self.render_new(user_id, &url, &QrStyle::free())?;
        let now = self.clock.now();

        let created = self
            .qr_code_repo
            .insert(new_free_qr_code(user_id, url, now))
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "qr_codes: failed to insert free code");
                QrCodeError::Persistence(err)
            })?;

        info!(
            %user_id,
            qr_code_id = %created.id,
            expires_at = %created.expires_at,
            "qr_codes: free code created"
        );

        Ok(GeneratedQrCodeDto {
            qr_code: QrCodeDto::from_entity(created, now, false),
            image: image.data,
            content_type: image.content_type,
        })
    }

    pub async fn generate_premium(
        &self,
        user_id: Uuid,
        model: CreatePremiumQrCodeModel,
    ) -> UseCaseResult<GeneratedQrCodeDto> {
        info!(
            %user_id,
            url_len = model.url.len(),
            size = ?model.size,
            shape = ?model.shape,
            has_logo = model.logo_url.is_some(),
            "qr_codes: premium generation requested"
        );

        let url = Self::validate_url(user_id, &model.url)?;
        let style = QrStyle::premium(
            model.size,
            model.shape,
            model.color.as_deref(),
            model.logo_url.as_deref(),
        )
        .map_err(|err| {
            warn!(%user_id, error = %err, "qr_codes: invalid premium style");
            QrCodeError::InvalidStyle(err.to_string())
        })?;

        let entitled = self
            .entitlement
            .has_active_billing(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "qr_codes: failed to check entitlement");
                QrCodeError::Persistence(err)
            })?;
        if !entitled {
            let err = QrCodeError::Entitlement;
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "qr_codes: premium generation without active subscription"
            );
            return Err(err);
        }

        let image = self.render_new(user_id, &url, &style)?;
        let now = self.clock.now();
        let insert = new_premium_qr_code(user_id, url, style, now).map_err(|err| {
            error!(%user_id, error = ?err, "qr_codes: failed to build premium code");
            QrCodeError::Persistence(err)
        })?;

        let created = self.qr_code_repo.insert(insert).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "qr_codes: failed to insert premium code");
            QrCodeError::Persistence(err)
        })?;

        info!(
            %user_id,
            qr_code_id = %created.id,
            expires_at = %created.expires_at,
            "qr_codes: premium code created"
        );

        Ok(GeneratedQrCodeDto {
            qr_code: QrCodeDto::from_entity(created, now, true),
            image: image.data,
            content_type: image.content_type,
        })
    }

    /// Renews a free code for another month counted from now.
    pub async fn confirm(&self, user_id: Uuid, qr_code_id: Uuid) -> UseCaseResult<QrCodeDto> {
        let now = self.clock.now();
        info!(%user_id, %qr_code_id, "qr_codes: confirmation requested");

        let confirmed = self
            .qr_code_repo
            .confirm_free(qr_code_id, user_id, now, free_deadline(now))
            .await
            .map_err(|err| {
                error!(%user_id, %qr_code_id, db_error = ?err, "qr_codes: confirm update failed");
                QrCodeError::Persistence(err)
            })?;

        if let Some(entity) = confirmed {
            info!(
                %user_id,
                %qr_code_id,
                expires_at = %entity.expires_at,
                "qr_codes: free code confirmed"
            );
            return Ok(QrCodeDto::from_entity(entity, now, false));
        }

        // Nothing matched; work out why for the caller.
        let existing = self.find_owned(user_id, qr_code_id).await?;
        let err = if existing.tier() == QrType::Premium {
            QrCodeError::NotRenewable
        } else if !existing.is_active {
            QrCodeError::CodeInactive
        } else if existing.is_expired_at(now) {
            QrCodeError::CodeExpired
        } else {
            error!(%user_id, %qr_code_id, "qr_codes: confirm matched no row for a renewable code");
            QrCodeError::Persistence(anyhow::anyhow!("confirmation was not applied"))
        };

        warn!(
            %user_id,
            %qr_code_id,
            status = err.status_code().as_u16(),
            reason = %err,
            "qr_codes: confirmation refused"
        );
        Err(err)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        filter: ListQrCodesFilter,
    ) -> UseCaseResult<Vec<QrCodeDto>> {
        let now = self.clock.now();

        let codes = self
            .qr_code_repo
            .list_by_user(user_id, filter.sort)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "qr_codes: failed to list codes");
                QrCodeError::Persistence(err)
            })?;

        let billing_active = if codes.iter().any(|code| code.tier() == QrType::Premium) {
            self.billing_active(user_id).await?
        } else {
            false
        };

        info!(%user_id, count = codes.len(), "qr_codes: codes listed");

        Ok(codes
            .into_iter()
            .map(|code| QrCodeDto::from_entity(code, now, billing_active))
            .collect())
    }

    pub async fn get(&self, user_id: Uuid, qr_code_id: Uuid) -> UseCaseResult<QrCodeDto> {
        let now = self.clock.now();
        let code = self.find_owned(user_id, qr_code_id).await?;
        let billing_active = self.billing_active_for(&code).await?;

        Ok(QrCodeDto::from_entity(code, now, billing_active))
    }

    /// Renders a stored code for download. Only effectively valid codes render.
    pub async fn render(&self, user_id: Uuid, qr_code_id: Uuid) -> UseCaseResult<QrImage> {
        let now = self.clock.now();
        let code = self.find_owned(user_id, qr_code_id).await?;
        let billing_active = self.billing_active_for(&code).await?;

        match code.state_at(now, billing_active) {
            QrCodeState::Active => {}
            QrCodeState::Expired => return Err(QrCodeError::CodeExpired),
            QrCodeState::Inactive => return Err(QrCodeError::CodeInactive),
        }

        self.renderer
            .render(&code.url, &Self::style_of(&code))
            .map_err(|err| {
                error!(%user_id, %qr_code_id, error = ?err, "qr_codes: rendering failed");
                QrCodeError::Rendering(err)
            })
    }

    fn validate_url(user_id: Uuid, raw: &str) -> UseCaseResult<String> {
        normalize_target_url(raw).map_err(|err| {
            warn!(%user_id, error = %err, "qr_codes: invalid target URL");
            QrCodeError::InvalidUrl(err.to_string())
        })
    }

    async fn find_owned(&self, user_id: Uuid, qr_code_id: Uuid) -> UseCaseResult<QrCodeEntity> {
        self.qr_code_repo
            .find_by_id_for_user(qr_code_id, user_id)
            .await
            .map_err(|err| {
                error!(%user_id, %qr_code_id, db_error = ?err, "qr_codes: failed to load code");
                QrCodeError::Persistence(err)
            })?
            .ok_or(QrCodeError::NotFound)
    }

    async fn billing_active(&self, user_id: Uuid) -> UseCaseResult<bool> {
        self.entitlement
            .has_active_billing(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "qr_codes: failed to check entitlement");
                QrCodeError::Persistence(err)
            })
    }

    async fn billing_active_for(&self, code: &QrCodeEntity) -> UseCaseResult<bool> {
        match code.tier() {
            QrType::Premium => self.billing_active(code.user_id).await,
            QrType::Free => Ok(false),
        }
    }

    fn style_of(code: &QrCodeEntity) -> QrStyle {
        QrStyle {
            size: code.size,
            shape: QrShape::from_str(&code.shape).unwrap_or_default(),
            color: code.color.clone(),
            logo_url: code.logo_url.clone(),
        }
    }

    /// Renders a code that is about to be stored. A payload the symbol cannot
    /// hold is the caller's input error, and nothing gets stored.
    fn render_new(&self, user_id: Uuid, url: &str, style: &QrStyle) -> UseCaseResult<QrImage> {
        self.renderer.render(url, style).map_err(|err| {
            if is_capacity_error(&err) {
                warn!(%user_id, error = %err, "qr_codes: target URL does not fit the symbol");
                QrCodeError::InvalidUrl(err.to_string())
            } else {
                error!(%user_id, error = ?err, "qr_codes: rendering failed");
                QrCodeError::Rendering(err)
            }
        })
    }
}
