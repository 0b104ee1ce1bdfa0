use axum::{Router, routing::get};

use crate::models::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

pub async fn home() -> &'static str {
    "Doctors portal server is running"
}
