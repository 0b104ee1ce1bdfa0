use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tower::ServiceExt;

use crate::auth::TokenService;
use crate::models::AppState;
use crate::notify::{Email, LogMailer, MailError, Mailer};
use crate::payments::{DisabledGateway, PaymentGateway};
use crate::store::MemoryStore;

pub const TEST_SECRET: &str = "test-secret";

pub fn state_with(store: Arc<MemoryStore>) -> AppState {
    state_with_gateway(store, Arc::new(DisabledGateway))
}

pub fn state_with_gateway(store: Arc<MemoryStore>, gateway: Arc<dyn PaymentGateway>) -> AppState {
    AppState::new(
        store,
        TokenService::new(TEST_SECRET, 24),
        gateway,
        Arc::new(LogMailer),
    )
}

pub fn state_with_mailer(store: Arc<MemoryStore>, mailer: Arc<dyn Mailer>) -> AppState {
    AppState::new(
        store,
        TokenService::new(TEST_SECRET, 24),
        Arc::new(DisabledGateway),
        mailer,
    )
}

/// Hands every sent email to a channel instead of a provider.
pub struct ChannelMailer(mpsc::UnboundedSender<Email>);

impl ChannelMailer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Email>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

#[async_trait]
impl Mailer for ChannelMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let _ = self.0.send(email);
        Ok(())
    }
}

/// Next email within `wait`, or `None` if nothing was sent.
pub async fn next_email(
    rx: &mut mpsc::UnboundedReceiver<Email>,
    wait: std::time::Duration,
) -> Option<Email> {
    tokio::time::timeout(wait, rx.recv()).await.ok().flatten()
}

pub fn bearer_get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token, None)
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    request(method, uri, token, Some(body))
}

fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Body parsed as JSON; `Null` when it is not JSON.
pub async fn send_json(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(app, req).await;
    let json = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
