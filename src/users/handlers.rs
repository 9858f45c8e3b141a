use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    auth::{extractors::AuthUser, repo::User},
    error::ApiError,
    state::AppState,
};

use super::dto::{BulkActionResponse, BulkIdsRequest};
use super::repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/block", post(block_users))
        .route("/unblock", post(unblock_users))
        .route("/delete", delete(delete_users))
}

fn require_ids(payload: &BulkIdsRequest) -> Result<&[i64], ApiError> {
    if payload.user_ids.is_empty() {
        return Err(ApiError::validation("User IDs are required"));
    }
    Ok(&payload.user_ids)
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = repo::list_all(&state.db).await.map_err(|e| {
        error!(error = %e, "list users failed");
        ApiError::internal("Failed to fetch users")
    })?;
    Ok(Json(users))
}

#[instrument(skip(state, payload))]
pub async fn block_users(
    State(state): State<AppState>,
    AuthUser(actor_id): AuthUser,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<Json<BulkActionResponse>, ApiError> {
    let ids = require_ids(&payload)?;
    let affected = repo::set_blocked(&state.db, ids, true).await.map_err(|e| {
        error!(error = %e, "block users failed");
        ApiError::internal("Failed to block users")
    })?;
    info!(actor_id, affected, "users blocked");
    Ok(Json(BulkActionResponse {
        message: format!("{affected} user(s) blocked successfully"),
    }))
}

#[instrument(skip(state, payload))]
pub async fn unblock_users(
    State(state): State<AppState>,
    AuthUser(actor_id): AuthUser,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<Json<BulkActionResponse>, ApiError> {
    let ids = require_ids(&payload)?;
    let affected = repo::set_blocked(&state.db, ids, false)
        .await
        .map_err(|e| {
            error!(error = %e, "unblock users failed");
            ApiError::internal("Failed to unblock users")
        })?;
    info!(actor_id, affected, "users unblocked");
    Ok(Json(BulkActionResponse {
        message: format!("{affected} user(s) unblocked successfully"),
    }))
}

#[instrument(skip(state, payload))]
pub async fn delete_users(
    State(state): State<AppState>,
    AuthUser(actor_id): AuthUser,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<Json<BulkActionResponse>, ApiError> {
    let ids = require_ids(&payload)?;
    let affected = repo::delete_many(&state.db, ids).await.map_err(|e| {
        error!(error = %e, "delete users failed");
        ApiError::internal("Failed to delete users")
    })?;
    info!(actor_id, affected, "users deleted");
    Ok(Json(BulkActionResponse {
        message: format!("{affected} user(s) deleted successfully"),
    }))
}
