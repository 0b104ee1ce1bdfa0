use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};

use crate::auth::TokenError;
use crate::error::ApiError;
use crate::models::AppState;

/// Authenticated caller. Taking this as a handler argument gates the route
/// on a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub email: String,
}

/// Authenticated caller whose stored role is admin.
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub email: String,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            // Missing header -> 401, anything unparsable -> 403
            let token = match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
            {
                Ok(TypedHeader(authz)) => authz.token().to_string(),
                Err(rejection) if rejection.is_missing() => {
                    return Err(TokenError::Missing.into());
                }
                Err(rejection) => {
                    tracing::debug!("malformed authorization header: {rejection}");
                    return Err(ApiError::forbidden());
                }
            };

            let email = state.tokens.verify(Some(&token))?;
            Ok(AuthContext { email })
        }
    }
}

impl FromRequestParts<AppState> for AdminContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let AuthContext { email } = AuthContext::from_request_parts(parts, state).await?;

            // No user record fails closed.
            match state.users.find_user(&email).await? {
                Some(user) if user.is_admin() => Ok(AdminContext { email }),
                Some(_) => {
                    tracing::warn!(%email, "admin route denied: not an admin");
                    Err(ApiError::forbidden())
                }
                None => {
                    tracing::warn!(%email, "admin route denied: no user record");
                    Err(ApiError::forbidden())
                }
            }
        }
    }
}
