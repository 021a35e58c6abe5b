use crate::{
    auth::AuthUser,
    usecases::billing::{BillingUseCase, StripeGateway},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        clock::Clock,
        repositories::{qr_codes::QrCodeRepository, subscriptions::SubscriptionRepository},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{qr_codes::QrCodePostgres, subscriptions::SubscriptionPostgres},
    },
    payments::stripe_client::StripeClient,
};
use serde_json::json;
use std::sync::Arc;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    stripe_client: Arc<StripeClient>,
    clock: Arc<dyn Clock>,
) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let qr_code_repository = QrCodePostgres::new(Arc::clone(&db_pool));

    let usecase = BillingUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(qr_code_repository),
        stripe_client,
        clock,
    );

    router(Arc::new(usecase))
}

pub fn router<S, Q, G>(usecase: Arc<BillingUseCase<S, Q, G>>) -> Router
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Q: QrCodeRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/checkout", post(create_checkout_session::<S, Q, G>))
        .route("/subscription", get(current_subscription::<S, Q, G>))
        .route("/webhook", post(stripe_webhook::<S, Q, G>))
        .with_state(usecase)
}

pub async fn create_checkout_session<S, Q, G>(
    State(usecase): State<Arc<BillingUseCase<S, Q, G>>>,
    AuthUser { user_id, email, .. }: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync,
    Q: QrCodeRepository + Send + Sync,
    G: StripeGateway + Send + Sync,
{
    match usecase.create_checkout_session(user_id, email).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn current_subscription<S, Q, G>(
    State(usecase): State<Arc<BillingUseCase<S, Q, G>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync,
    Q: QrCodeRepository + Send + Sync,
    G: StripeGateway + Send + Sync,
{
    match usecase.current_subscription(user_id).await {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Provider callback. Authenticated by its signature, not by a user token.
pub async fn stripe_webhook<S, Q, G>(
    State(usecase): State<Arc<BillingUseCase<S, Q, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync,
    Q: QrCodeRepository + Send + Sync,
    G: StripeGateway + Send + Sync,
{
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match usecase.handle_stripe_webhook(&body, signature).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{FakeStripe, FixedClock, InMemoryStore, at, signed};
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app(store: &Arc<InMemoryStore>) -> Router {
        let usecase = BillingUseCase::new(
            Arc::clone(store),
            Arc::clone(store),
            Arc::new(FakeStripe::default()),
            Arc::new(FixedClock::new(at(2026, 1, 1))) as Arc<dyn Clock>,
        );
        router(Arc::new(usecase))
    }

    fn deleted_event() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "customer.subscription.deleted",
            "data": { "object": { "id": "sub_1", "status": "canceled" } }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_rejected() {
        let store = Arc::new(InMemoryStore::default());
        store.seed_subscription(uuid::Uuid::new_v4(), "sub_1", "active", at(2027, 1, 1));

        let response = app(&store)
            .oneshot(
                Request::post("/webhook")
                    .header(STRIPE_SIGNATURE_HEADER, "t=1767225600,v1=00")
                    .body(Body::from(deleted_event()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.subscription("sub_1").unwrap().status, "active");
    }

    #[tokio::test]
    async fn webhook_with_valid_signature_is_applied_without_a_user_token() {
        let store = Arc::new(InMemoryStore::default());
        store.seed_subscription(uuid::Uuid::new_v4(), "sub_1", "active", at(2027, 1, 1));
        let payload = deleted_event();

        let response = app(&store)
            .oneshot(
                Request::post("/webhook")
                    .header(STRIPE_SIGNATURE_HEADER, signed(&payload, at(2026, 1, 1)))
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.subscription("sub_1").unwrap().status, "canceled");
    }
}
