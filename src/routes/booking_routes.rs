// src/routes/booking_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require_text, validate_email};
use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{
        AppState, Booking, BookingOutcome, InsertResult, NewBooking, PaymentDetails, UpdateResult,
    },
    notify,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/booking", post(create_booking))
        .route("/booking/{booking_id}", get(get_booking).patch(confirm_payment))
        .route("/bookings", get(list_patient_bookings))
}

/* ============================================================
   DTOs
   ============================================================ */

/// `success: false` is a normal outcome: the triple was already booked.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CreateBookingResponse {
    Created { success: bool, result: InsertResult },
    Existing { success: bool, booking: Booking },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentResponse {
    pub result: UpdateResult,
    pub payment_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PatientQuery {
    pub patient: Option<String>,
}

fn validate_new_booking(req: NewBooking) -> Result<NewBooking, ApiError> {
    let patient_email = require_text("patientEmail", &req.patient_email)?;
    validate_email(&patient_email)?;

    if let Some(price) = req.price {
        if !price.is_finite() || price < 0.0 {
            return Err(ApiError::validation("price must be a non-negative number"));
        }
    }

    let optional = |v: Option<String>| {
        v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    };

    Ok(NewBooking {
        treatment: require_text("treatment", &req.treatment)?,
        patient_email,
        patient_name: optional(req.patient_name),
        phone: optional(req.phone),
        date: require_text("date", &req.date)?,
        slot: require_text("slot", &req.slot)?,
        price: req.price,
    })
}

fn validate_payment_details(req: PaymentDetails) -> Result<PaymentDetails, ApiError> {
    if let Some(amount) = req.amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ApiError::validation("amount must be a non-negative number"));
        }
    }

    Ok(PaymentDetails {
        transaction_id: require_text("transactionId", &req.transaction_id)?,
        amount: req.amount,
        meta: req.meta,
    })
}

/* ============================================================
   POST /booking
   ============================================================ */

pub async fn create_booking(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<NewBooking>, ApiError>,
) -> Result<Json<CreateBookingResponse>, ApiError> {
    let booking = validate_new_booking(req)?;

    match state.bookings.create_booking(booking).await? {
        BookingOutcome::Created(created) => {
            tracing::info!(booking_id = %created.id, treatment = %created.treatment, "booking created");
            notify::dispatch(state.mailer.clone(), notify::booking_confirmation(&created));

            Ok(Json(CreateBookingResponse::Created {
                success: true,
                result: InsertResult::new(created.id),
            }))
        }
        BookingOutcome::Existing(existing) => {
            tracing::debug!(booking_id = %existing.id, "booking already exists for triple");
            Ok(Json(CreateBookingResponse::Existing {
                success: false,
                booking: existing,
            }))
        }
    }
}

/* ============================================================
   GET /booking/{id}
   ============================================================ */

pub async fn get_booking(
    State(state): State<AppState>,
    _auth: AuthContext,
    WithRejection(Path(booking_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .bookings
        .find_booking(booking_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "booking not found".into()))?;

    Ok(Json(booking))
}

/* ============================================================
   PATCH /booking/{id}
   ============================================================ */

pub async fn confirm_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Path(booking_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<PaymentDetails>, ApiError>,
) -> Result<Json<ConfirmPaymentResponse>, ApiError> {
    let details = validate_payment_details(req)?;

    let confirmed = state
        .bookings
        .confirm_payment(booking_id, details)
        .await?
        .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "booking not found".into()))?;

    tracing::info!(
        %booking_id,
        payment_id = %confirmed.payment.id,
        modified = confirmed.modified,
        by = %auth.email,
        "booking paid"
    );
    notify::dispatch(
        state.mailer.clone(),
        notify::payment_received(&confirmed.booking, &confirmed.payment),
    );

    Ok(Json(ConfirmPaymentResponse {
        result: UpdateResult::matched(1, confirmed.modified_count()),
        payment_id: confirmed.payment.id,
    }))
}

/* ============================================================
   GET /bookings?patient=
   ============================================================ */

pub async fn list_patient_bookings(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Query(q), _): WithRejection<Query<PatientQuery>, ApiError>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    // Patients may only list their own bookings.
    if q.patient.as_deref().map(str::trim) != Some(auth.email.as_str()) {
        tracing::warn!(caller = %auth.email, "booking list denied: identity mismatch");
        return Err(ApiError::forbidden());
    }

    Ok(Json(state.bookings.bookings_for_patient(&auth.email).await?))
}
