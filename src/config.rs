use std::env;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    /// Unset means the in-memory store (local development only).
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub access_token_secret: String,
    pub token_ttl_hours: i64,
    pub request_timeout_secs: u64,
    pub stripe_secret_key: Option<String>,
    pub payment_currency: String,
    pub email_sender_key: Option<String>,
    pub email_from: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = non_empty_var("DATABASE_URL");
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string());
        let access_token_secret = non_empty_var("ACCESS_TOKEN_SECRET")
            .context("ACCESS_TOKEN_SECRET must be set")?;
        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(24);
        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(30);
        let payment_currency = env::var("PAYMENT_CURRENCY")
            .map(|c| c.trim().to_lowercase())
            .ok()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "usd".to_string());
        let email_from = non_empty_var("EMAIL_FROM")
            .unwrap_or_else(|| "no-reply@doctors-portal.local".to_string());

        Ok(Self {
            database_url,
            bind_addr,
            access_token_secret,
            token_ttl_hours,
            request_timeout_secs,
            stripe_secret_key: non_empty_var("STRIPE_SECRET_KEY"),
            payment_currency,
            email_sender_key: non_empty_var("EMAIL_SENDER_KEY"),
            email_from,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
