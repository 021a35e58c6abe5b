use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub backend_server: BackendServer,
    pub database: Database,
    pub supabase: Supabase,
    pub stripe: Stripe,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// Megabytes.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
    /// Public site origin, used for CORS and Checkout redirects.
    pub site_url: String,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
    pub premium_price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub signature_tolerance_secs: i64,
}
