// src/routes/payment_routes.rs

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    models::AppState,
    payments::amount_in_minor_units,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/create-payment-intent", post(create_payment_intent))
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<PaymentIntentRequest>, ApiError>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let amount = amount_in_minor_units(req.price)
        .ok_or_else(|| ApiError::validation("price must be a positive amount"))?;

    // Awaited: the client cannot pay without the secret.
    let intent = state.payments.create_intent(amount).await?;

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}
