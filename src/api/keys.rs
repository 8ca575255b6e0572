//! Key endpoints for the calling user

use axum::extract::{Path, State};
use tracing::debug;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{
    ApiError, CreateKeyBody, CreatedKeyResponse, DeletedResponse, HistoryKey, Json,
};
use crate::infrastructure::services::VisibleKey;

/// GET /keys/active
pub async fn list_active_keys(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Vec<VisibleKey>>, ApiError> {
    debug!(user_id = %user_id, "Listing active keys");

    let keys = state.key_service.active_keys(&user_id).await?;
    Ok(Json(keys))
}

/// GET /keys/history
pub async fn list_key_history(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Vec<HistoryKey>>, ApiError> {
    debug!(user_id = %user_id, "Listing key history");

    let history = state.key_service.history(&user_id).await?;
    Ok(Json(history.into_iter().map(HistoryKey::from).collect()))
}

/// POST /keys
pub async fn create_key(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Json(body): Json<CreateKeyBody>,
) -> Result<Json<CreatedKeyResponse>, ApiError> {
    debug!(user_id = %user_id, name = %body.name, "Creating key");

    let issued = state.key_service.create_key(&user_id, body.into()).await?;
    Ok(Json(CreatedKeyResponse::from(issued)))
}

/// DELETE /keys/{key_id}
pub async fn delete_key(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Path(key_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    debug!(user_id = %user_id, key_id = %key_id, "Deleting key");

    state
        .key_service
        .delete_key(&user_id, &key_id)
        .await
        .map_err(|e| ApiError::from(e).with_param("key_id"))?;

    Ok(Json(DeletedResponse::deleted()))
}
