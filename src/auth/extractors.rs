use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::{error, warn};

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Request gate for protected routes: extracts the bearer token, verifies it,
/// loads the user, and rejects blocked or vanished accounts. On success the
/// handler receives the authenticated user id.
pub struct AuthUser(pub i64);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::unauthorized("Invalid token provided")
        })?;

        // Fail closed: any lookup failure denies the request.
        let user = User::find_by_id(&state.db, claims.sub)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = claims.sub, "user lookup failed in auth gate");
                ApiError::unauthorized("Authentication failed")
            })?
            .ok_or_else(|| ApiError::unauthorized("User not found"))?;

        if user.blocked {
            // Distinct signal: clients clear their session on seeing it.
            return Err(ApiError::forbidden("User is blocked"));
        }

        Ok(AuthUser(user.id))
    }
}
