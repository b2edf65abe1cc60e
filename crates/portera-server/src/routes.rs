use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::error::RoleError;
use crate::handlers;
use crate::state::AppState;
use crate::util;

async fn handle_health() -> Response {
    Json(json!({
        "ok": true,
        "service": "portera",
    }))
    .into_response()
}

/// Liveness probe that also validates store connectivity.
async fn handle_alive(State(state): State<AppState>) -> Response {
    if let Err(e) = state.db.ping().await {
        return RoleError::from(e).into_response();
    }

    Json(json!(util::ts_to_rfc3339(util::now_ts()))).into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/alive", get(handle_alive))
        .route("/api/profiles", post(handlers::profiles::handle_create_profile))
        .route("/api/roles", get(handlers::roles::handle_list_roles))
        .route("/api/roles/request", post(handlers::roles::handle_request_role))
        .route("/api/roles/activate", post(handlers::roles::handle_activate_role))
        .route(
            "/api/roles/resend-verification",
            post(handlers::roles::handle_resend_verification),
        )
        .route("/auth/verify-role", get(handlers::roles::handle_verify_role))
        .route(
            "/api/registration/watch",
            post(handlers::registration::handle_watch_registration),
        )
        .route(
            "/api/recovery/recover",
            post(handlers::recovery::handle_recover_registration),
        )
        .with_state(state)
}
