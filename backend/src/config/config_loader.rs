use anyhow::{Context, Result};
use crates::payments::webhook_signature::DEFAULT_TOLERANCE_SECS;

use super::{
    config_model::{BackendServer, Database, DotEnvyConfig, Stripe, Supabase},
    stage::Stage,
};

/// Reads and validates the whole configuration. Any missing or malformed
/// required variable aborts startup.
pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let site_url = required("SITE_URL")?.trim_end_matches('/').to_string();

    let backend_server = BackendServer {
        port: parsed("SERVER_PORT_BACKEND")?,
        body_limit: parsed("SERVER_BODY_LIMIT")?,
        timeout: parsed("SERVER_TIMEOUT")?,
        site_url: site_url.clone(),
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let supabase = Supabase {
        jwt_secret: required("SUPABASE_JWT_SECRET")?,
    };

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        premium_price_id: required("STRIPE_PREMIUM_PRICE_ID")?,
        success_url: optional("STRIPE_SUCCESS_URL")
            .unwrap_or_else(|| format!("{site_url}/dashboard?success=true")),
        cancel_url: optional("STRIPE_CANCEL_URL")
            .unwrap_or_else(|| format!("{site_url}/checkout?canceled=true")),
        signature_tolerance_secs: parsed_or(
            "STRIPE_SIGNATURE_TOLERANCE_SECS",
            DEFAULT_TOLERANCE_SECS,
        )?,
    };

    Ok(DotEnvyConfig {
        stage: get_stage(),
        backend_server,
        database,
        supabase,
        stripe,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or_default();
    Stage::try_from(&stage_str).unwrap_or_default()
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} is missing"))
}

fn parsed<T>(key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(key)?
        .trim()
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}
