//! Payment-intent creation against an external gateway.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

const STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway not configured")]
    NotConfigured,
    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("payment gateway response had no client secret")]
    MissingClientSecret,
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `amount` is in the currency's smallest unit (cents for usd).
    async fn create_intent(&self, amount: i64) -> Result<PaymentIntent, GatewayError>;
}

/// Price in major units to the gateway's minor units. Rejects non-positive,
/// non-finite and sub-cent amounts.
pub fn amount_in_minor_units(price: f64) -> Option<i64> {
    if !price.is_finite() || price <= 0.0 {
        return None;
    }
    let minor = (price * 100.0).round();
    if minor < 1.0 || minor > i64::MAX as f64 {
        return None;
    }
    Some(minor as i64)
}

pub struct StripeGateway {
    http: reqwest::Client,
    secret_key: String,
    currency: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: String, currency: String) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http,
            secret_key,
            currency,
            base_url: STRIPE_API_BASE.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, amount: i64) -> Result<PaymentIntent, GatewayError> {
        let amount = amount.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", self.currency.as_str()),
            ("payment_method_types[]", "card"),
        ];

        let resp = self
            .http
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<StripeErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: StripeIntentResponse = resp.json().await?;
        let client_secret = body
            .client_secret
            .ok_or(GatewayError::MissingClientSecret)?;

        tracing::info!("payment intent created");
        Ok(PaymentIntent { client_secret })
    }
}

/// Used when no gateway key is configured.
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_intent(&self, _amount: i64) -> Result<PaymentIntent, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}
