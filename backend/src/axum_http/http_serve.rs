use crate::{
    auth::SupabaseJwt,
    axum_http::{default_routers, routers},
    config::{config_model::DotEnvyConfig, stage::Stage},
};
use anyhow::Result;
use axum::{
    Extension, Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    domain::clock::{Clock, SystemClock},
    infra::db::postgres::postgres_connection::PgPoolSquad,
    payments::stripe_client::StripeClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let stripe_client = Arc::new(StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
        config.stripe.premium_price_id.clone(),
        config.stripe.success_url.clone(),
        config.stripe.cancel_url.clone(),
        config.stripe.signature_tolerance_secs,
    ));
    let jwt = Arc::new(SupabaseJwt::new(&config.supabase.jwt_secret));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/qrcodes",
            routers::qr_codes::routes(Arc::clone(&db_pool), Arc::clone(&clock)),
        )
        .nest(
            "/api/v1/billing",
            routers::billing::routes(Arc::clone(&db_pool), stripe_client, Arc::clone(&clock)),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(Extension(jwt))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(allowed_origin(&config)?),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(
        stage = %config.stage,
        port = config.backend_server.port,
        "Server is running"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn allowed_origin(config: &DotEnvyConfig) -> Result<AllowOrigin> {
    match config.stage {
        Stage::Production => {
            let origin = config
                .backend_server
                .site_url
                .trim_end_matches('/')
                .parse::<HeaderValue>()?;
            Ok(AllowOrigin::exact(origin))
        }
        Stage::Local | Stage::Development => Ok(AllowOrigin::from(Any)),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
