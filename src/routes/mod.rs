use std::time::Duration;

use crate::error::ApiError;
use crate::models::AppState;
use axum::Router;
use axum::http::header;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod booking_routes;
pub mod doctor_routes;
pub mod home_routes;
pub mod payment_routes;
pub mod service_routes;
pub mod user_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(home_routes::router())
        .merge(doctor_routes::router())
        .merge(user_routes::router())
        .merge(service_routes::router())
        .merge(booking_routes::router())
        .merge(payment_routes::router())
        .with_state(state)
}

/// Request-level middleware: timeout (408), CORS and HTTP tracing.
pub fn with_layers(router: Router, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Trimmed, non-empty text field.
fn require_text(field: &str, value: &str) -> Result<String, ApiError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let looks_valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
        && !email.chars().any(char::is_whitespace);

    if looks_valid {
        Ok(())
    } else {
        Err(ApiError::validation("a valid email is required"))
    }
}
