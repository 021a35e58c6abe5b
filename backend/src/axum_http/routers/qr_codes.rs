use crate::{
    auth::AuthUser,
    usecases::{entitlement::EntitlementResolver, qr_codes::QrCodeUseCase},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        clock::Clock,
        repositories::{qr_codes::QrCodeRepository, subscriptions::SubscriptionRepository},
        value_objects::qr_codes::{
            CreateFreeQrCodeModel, CreatePremiumQrCodeModel, ListQrCodesFilter,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{qr_codes::QrCodePostgres, subscriptions::SubscriptionPostgres},
    },
    rendering::{QrRenderer, QrSvgRenderer},
};
use std::sync::Arc;
use uuid::Uuid;

pub fn routes(db_pool: Arc<PgPoolSquad>, clock: Arc<dyn Clock>) -> Router {
    let qr_code_repository = QrCodePostgres::new(Arc::clone(&db_pool));
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));

    let usecase = QrCodeUseCase::new(
        Arc::new(qr_code_repository),
        Arc::new(EntitlementResolver::new(Arc::new(subscription_repository))),
        Arc::new(QrSvgRenderer),
        clock,
    );

    router(Arc::new(usecase))
}

pub fn router<Q, S, R>(usecase: Arc<QrCodeUseCase<Q, S, R>>) -> Router
where
    Q: QrCodeRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    R: QrRenderer + 'static,
{
    Router::new()
        .route("/", get(list_qr_codes::<Q, S, R>))
        .route("/free", post(generate_free::<Q, S, R>))
        .route("/premium", post(generate_premium::<Q, S, R>))
        .route("/:id", get(get_qr_code::<Q, S, R>))
        .route("/:id/confirm", post(confirm_qr_code::<Q, S, R>))
        .route("/:id/image", get(render_qr_code::<Q, S, R>))
        .with_state(usecase)
}

pub async fn generate_free<Q, S, R>(
    State(usecase): State<Arc<QrCodeUseCase<Q, S, R>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(model): Json<CreateFreeQrCodeModel>,
) -> impl IntoResponse
where
    Q: QrCodeRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    R: QrRenderer,
{
    match usecase.generate_free(user_id, model).await {
        Ok(generated) => (StatusCode::CREATED, Json(generated)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn generate_premium<Q, S, R>(
    State(usecase): State<Arc<QrCodeUseCase<Q, S, R>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(model): Json<CreatePremiumQrCodeModel>,
) -> impl IntoResponse
where
    Q: QrCodeRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    R: QrRenderer,
{
    match usecase.generate_premium(user_id, model).await {
        Ok(generated) => (StatusCode::CREATED, Json(generated)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_qr_codes<Q, S, R>(
    State(usecase): State<Arc<QrCodeUseCase<Q, S, R>>>,
    AuthUser { user_id, .. }: AuthUser,
    Query(filter): Query<ListQrCodesFilter>,
) -> impl IntoResponse
where
    Q: QrCodeRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    R: QrRenderer,
{
    match usecase.list(user_id, filter).await {
        Ok(codes) => (StatusCode::OK, Json(codes)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_qr_code<Q, S, R>(
    State(usecase): State<Arc<QrCodeUseCase<Q, S, R>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(qr_code_id): Path<Uuid>,
) -> impl IntoResponse
where
    Q: QrCodeRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    R: QrRenderer,
{
    match usecase.get(user_id, qr_code_id).await {
        Ok(code) => (StatusCode::OK, Json(code)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn confirm_qr_code<Q, S, R>(
    State(usecase): State<Arc<QrCodeUseCase<Q, S, R>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(qr_code_id): Path<Uuid>,
) -> impl IntoResponse
where
    Q: QrCodeRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    R: QrRenderer,
{
    match usecase.confirm(user_id, qr_code_id).await {
        Ok(code) => (StatusCode::OK, Json(code)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn render_qr_code<Q, S, R>(
    State(usecase): State<Arc<QrCodeUseCase<Q, S, R>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(qr_code_id): Path<Uuid>,
) -> impl IntoResponse
where
    Q: QrCodeRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    R: QrRenderer,
{
    match usecase.render(user_id, qr_code_id).await {
        Ok(image) => {
            (StatusCode::OK, [(CONTENT_TYPE, image.content_type)], image.data).into_response()
        }
        Err(err) => err.into_response(),
    }
}
