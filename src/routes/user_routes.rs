// src/routes/user_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;

use super::validate_email;
use crate::{
    error::ApiError,
    middleware::auth_context::{AdminContext, AuthContext},
    models::{AppState, Role, UpdateResult, User, UserProfile},
};

#[derive(Debug, Serialize)]
pub struct AdminStatusResponse {
    pub admin: bool,
}

#[derive(Debug, Serialize)]
pub struct SaveProfileResponse {
    pub result: UpdateResult,
    pub token: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/admin/{email}", get(admin_status))
        .route("/user/admin/{email}", put(grant_admin))
        .route("/user/{email}", put(save_profile))
}

pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list_users().await?))
}

pub async fn admin_status(
    State(state): State<AppState>,
    _auth: AuthContext,
    WithRejection(Path(email), _): WithRejection<Path<String>, ApiError>,
) -> Result<Json<AdminStatusResponse>, ApiError> {
    // Unknown users are simply not admins.
    let admin = state
        .users
        .find_user(email.trim())
        .await?
        .is_some_and(|u| u.is_admin());

    Ok(Json(AdminStatusResponse { admin }))
}

pub async fn grant_admin(
    State(state): State<AppState>,
    admin: AdminContext,
    WithRejection(Path(email), _): WithRejection<Path<String>, ApiError>,
) -> Result<Json<UpdateResult>, ApiError> {
    let email = email.trim();
    validate_email(email)?;

    let result = state.users.set_role(email, Role::Admin).await?;
    if result.matched_count == 0 {
        tracing::warn!(target_email = %email, by = %admin.email, "grant admin: no such user");
    } else {
        tracing::info!(target_email = %email, by = %admin.email, "admin role granted");
    }
    Ok(Json(result))
}

/// Open route. Clients call it right after sign-in to get a fresh token.
pub async fn save_profile(
    State(state): State<AppState>,
    WithRejection(Path(email), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Json(profile), _): WithRejection<Json<UserProfile>, ApiError>,
) -> Result<Json<SaveProfileResponse>, ApiError> {
    let email = email.trim();
    validate_email(email)?;

    let result = state.users.upsert_profile(email, &profile).await?;
    let token = state.tokens.issue(email)?;

    Ok(Json(SaveProfileResponse { result, token }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes;
    use crate::store::{MemoryStore, UserStore};
    use crate::test_util::{bearer_get, json_request, send_json, state_with};

    #[tokio::test]
    async fn save_profile_then_check_admin_end_to_end() {
        let store = Arc::new(MemoryStore::new());
        let app = routes::router(state_with(store.clone()));

        let (status, body) = send_json(
            app.clone(),
            json_request("PUT", "/user/new@x.com", None, json!({ "name": "Jo" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["upsertedId"], "new@x.com");
        let token = body["token"].as_str().unwrap().to_string();

        let user = store.find_user("new@x.com").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Jo"));

        let (status, body) =
            send_json(app, bearer_get("/admin/new@x.com", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "admin": false }));
    }

    #[tokio::test]
    async fn profile_body_cannot_grant_admin() {
        let store = Arc::new(MemoryStore::new());
        let app = routes::router(state_with(store.clone()));

        let (status, _) = send_json(
            app,
            json_request(
                "PUT",
                "/user/sneaky@x.com",
                None,
                json!({ "name": "Sneaky", "role": "admin" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let user = store.find_user("sneaky@x.com").await.unwrap().unwrap();
        assert!(!user.is_admin());
    }

    #[tokio::test]
    async fn admin_status_for_unknown_user_is_false() {
        let state = state_with(Arc::new(MemoryStore::new()));
        let token = state.tokens.issue("jo@x.com").unwrap();
        let app = routes::router(state);

        let (status, body) = send_json(app, bearer_get("/admin/ghost@x.com", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "admin": false }));
    }

    #[tokio::test]
    async fn only_admins_grant_admin() {
        let store = Arc::new(MemoryStore::new());
        for email in ["boss@x.com", "pat@x.com"] {
            store
                .upsert_profile(email, &UserProfile::default())
                .await
                .unwrap();
        }
        store.set_role("boss@x.com", Role::Admin).await.unwrap();
        let state = state_with(store.clone());
        let boss = state.tokens.issue("boss@x.com").unwrap();
        let pat = state.tokens.issue("pat@x.com").unwrap();
        let app = routes::router(state);

        let (status, _) = send_json(
            app.clone(),
            json_request("PUT", "/user/admin/pat@x.com", Some(&pat), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!store.find_user("pat@x.com").await.unwrap().unwrap().is_admin());

        let (status, body) = send_json(
            app.clone(),
            json_request("PUT", "/user/admin/pat@x.com", Some(&boss), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matchedCount"], 1);
        assert!(store.find_user("pat@x.com").await.unwrap().unwrap().is_admin());

        let (_, body) = send_json(app, bearer_get("/admin/pat@x.com", Some(&pat))).await;
        assert_eq!(body, json!({ "admin": true }));
    }

    #[tokio::test]
    async fn list_users_requires_token() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_profile("jo@x.com", &UserProfile::default())
            .await
            .unwrap();
        let state = state_with(store);
        let token = state.tokens.issue("jo@x.com").unwrap();
        let app = routes::router(state);

        let (status, _) = send_json(app.clone(), bearer_get("/users", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send_json(app, bearer_get("/users", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_email_in_path_is_rejected() {
        let app = routes::router(state_with(Arc::new(MemoryStore::new())));
        let (status, _) = send_json(
            app,
            json_request("PUT", "/user/not-an-email", None, json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
