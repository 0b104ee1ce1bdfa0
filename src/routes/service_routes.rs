// src/routes/service_routes.rs

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    availability::available_slots,
    error::ApiError,
    models::{AppState, Service, ServiceName},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/docservices", get(list_service_names))
        .route("/available", get(list_available))
}

#[derive(Debug, Deserialize)]
pub struct AvailableQuery {
    pub date: Option<String>,
}

pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<Service>>, ApiError> {
    Ok(Json(state.catalog.list_services().await?))
}

pub async fn list_service_names(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceName>>, ApiError> {
    Ok(Json(state.catalog.list_service_names().await?))
}

pub async fn list_available(
    State(state): State<AppState>,
    WithRejection(Query(q), _): WithRejection<Query<AvailableQuery>, ApiError>,
) -> Result<Json<Vec<Service>>, ApiError> {
    let date = q
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::validation("date is required"))?;

    let catalog = state.catalog.list_services().await?;
    let bookings = state.bookings.bookings_on(date).await?;

    Ok(Json(available_slots(date, catalog, &bookings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;

    use crate::models::NewBooking;
    use crate::routes;
    use crate::store::{BookingStore, MemoryStore};
    use crate::test_util::{bearer_get, send_json, state_with};

    fn catalog() -> Vec<Service> {
        vec![
            Service {
                id: Uuid::new_v4(),
                name: "Teeth Cleaning".into(),
                slots: vec!["A".into(), "B".into(), "C".into()],
                price: Some(80.0),
            },
            Service {
                id: Uuid::new_v4(),
                name: "Oral Surgery".into(),
                slots: vec!["A".into(), "B".into()],
                price: None,
            },
        ]
    }

    fn booking(date: &str, slot: &str) -> NewBooking {
        NewBooking {
            treatment: "Teeth Cleaning".into(),
            patient_email: format!("{slot}@x.com"),
            patient_name: None,
            phone: None,
            date: date.into(),
            slot: slot.into(),
            price: None,
        }
    }

    #[tokio::test]
    async fn available_subtracts_booked_slots_for_that_date_only() {
        let store = Arc::new(MemoryStore::with_services(catalog()));
        store.create_booking(booking("May 20, 2022", "B")).await.unwrap();
        store.create_booking(booking("May 21, 2022", "A")).await.unwrap();
        let app = routes::router(state_with(store));

        let (status, body) = send_json(
            app,
            bearer_get("/available?date=May%2020%2C%202022", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Teeth Cleaning");
        assert_eq!(body[0]["slots"], json!(["A", "C"]));
        assert_eq!(body[1]["slots"], json!(["A", "B"]));
    }

    #[tokio::test]
    async fn available_requires_date() {
        let app = routes::router(state_with(Arc::new(MemoryStore::with_services(catalog()))));
        let (status, body) = send_json(app, bearer_get("/available", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn docservices_lists_names_only() {
        let app = routes::router(state_with(Arc::new(MemoryStore::with_services(catalog()))));
        let (status, body) = send_json(app, bearer_get("/docservices", None)).await;
        assert_eq!(status, StatusCode::OK);

        let first = body[0].as_object().unwrap();
        assert_eq!(first["name"], "Teeth Cleaning");
        assert!(first.contains_key("id"));
        assert!(!first.contains_key("slots"));
    }

    #[tokio::test]
    async fn services_lists_full_catalog() {
        let app = routes::router(state_with(Arc::new(MemoryStore::with_services(catalog()))));
        let (status, body) = send_json(app, bearer_get("/services", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["slots"], json!(["A", "B", "C"]));
    }
}
