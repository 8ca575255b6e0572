use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::health;
use super::keys;
use super::me;
use super::state::AppState;

/// Routes for the calling user, relative to the configured prefix
fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me::get_me))
        .route("/keys", post(keys::create_key))
        .route("/keys/active", get(keys::list_active_keys))
        .route("/keys/history", get(keys::list_key_history))
        .route("/keys/{key_id}", delete(keys::delete_key))
}

/// Build the application router; `prefix` may be empty to serve at the root
pub fn create_router_with_state(state: AppState, prefix: &str) -> Router {
    let prefix = prefix.trim_end_matches('/');

    let router = Router::new().route("/health", get(health::health_check));
    let router = if prefix.is_empty() {
        router.merge(create_user_router())
    } else {
        router.nest(prefix, create_user_router())
    };

    router.with_state(state).layer(TraceLayer::new_for_http())
}
