mod auth;
mod availability;
mod config;
mod middleware;

mod db;
mod error;
mod models;
mod notify;
mod payments;
mod routes;
mod store;

#[cfg(test)]
mod test_util;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    auth::TokenService,
    config::Config,
    models::AppState,
    notify::{LogMailer, Mailer, SendGridMailer},
    payments::{DisabledGateway, PaymentGateway, StripeGateway},
    store::{MemoryStore, PgStore},
};

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;

    let tokens = TokenService::new(&cfg.access_token_secret, cfg.token_ttl_hours);

    let payments: Arc<dyn PaymentGateway> = match &cfg.stripe_secret_key {
        Some(key) => Arc::new(StripeGateway::new(key.clone(), cfg.payment_currency.clone())?),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set; payment intents are disabled");
            Arc::new(DisabledGateway)
        }
    };

    let mailer: Arc<dyn Mailer> = match &cfg.email_sender_key {
        Some(key) => Arc::new(SendGridMailer::new(key.clone(), cfg.email_from.clone())?),
        None => {
            tracing::warn!("EMAIL_SENDER_KEY not set; emails are only logged");
            Arc::new(LogMailer)
        }
    };

    let state = match &cfg.database_url {
        Some(url) => {
            let pool = db::connect_pg(url).await?;
            AppState::new(Arc::new(PgStore::new(pool)), tokens, payments, mailer)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is not persisted)");
            let store = MemoryStore::with_services(store::memory::default_catalog());
            AppState::new(Arc::new(store), tokens, payments, mailer)
        }
    };

    let app = routes::with_layers(
        routes::router(state),
        Duration::from_secs(cfg.request_timeout_secs),
    );

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
