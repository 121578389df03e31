//! API server configuration.

use anyhow::Context;

/// Environment-backed configuration for the API binary.
///
/// Stripe and Resend settings are read by the billing crate's own
/// `from_env` constructors.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// HS256 secret the auth provider signs bearer tokens with.
    pub jwt_secret: String,
    /// Shared token required by the sweep endpoint; when unset the
    /// endpoint is open (trusted-network deployments).
    pub sweep_token: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let jwt_secret =
            std::env::var("SUPABASE_JWT_SECRET").context("SUPABASE_JWT_SECRET must be set")?;
        let sweep_token = std::env::var("SWEEP_TOKEN").ok().filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            bind_address,
            jwt_secret,
            sweep_token,
        })
    }
}
