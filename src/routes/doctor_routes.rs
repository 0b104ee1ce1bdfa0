// src/routes/doctor_routes.rs

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::{require_text, validate_email};
use crate::{
    error::ApiError,
    middleware::auth_context::AdminContext,
    models::{AppState, DeleteResult, Doctor, InsertResult, NewDoctor},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/doctors", get(list_doctors).post(create_doctor))
        .route("/doctor/{doctor_id}", delete(delete_doctor))
}

fn validate_new_doctor(req: NewDoctor) -> Result<NewDoctor, ApiError> {
    let email = match req.email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(e) => {
            validate_email(e)?;
            Some(e.to_string())
        }
    };

    Ok(NewDoctor {
        name: require_text("name", &req.name)?,
        specialty: require_text("specialty", &req.specialty)?,
        email,
        img: req
            .img
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    })
}

pub async fn list_doctors(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<Vec<Doctor>>, ApiError> {
    Ok(Json(state.doctors.list_doctors().await?))
}

pub async fn create_doctor(
    State(state): State<AppState>,
    admin: AdminContext,
    WithRejection(Json(req), _): WithRejection<Json<NewDoctor>, ApiError>,
) -> Result<Json<InsertResult>, ApiError> {
    let doctor = validate_new_doctor(req)?;
    let created = state.doctors.insert_doctor(doctor).await?;

    tracing::info!(doctor_id = %created.id, by = %admin.email, "doctor added");
    Ok(Json(InsertResult::new(created.id)))
}

pub async fn delete_doctor(
    State(state): State<AppState>,
    admin: AdminContext,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<DeleteResult>, ApiError> {
    let deleted = state.doctors.delete_doctor(doctor_id).await?;

    tracing::info!(%doctor_id, deleted, by = %admin.email, "doctor delete");
    Ok(Json(DeleteResult::new(deleted)))
}
