//! Caller profile endpoint

use axum::extract::State;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, MeResponse};

/// GET /me
pub async fn get_me(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state.provisioning_service.current_user(&user_id).await?;
    Ok(Json(MeResponse::from(user)))
}
