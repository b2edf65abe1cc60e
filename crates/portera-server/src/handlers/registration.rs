use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::error_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRegistrationData {
    user_id: String,
    expected_roles: u64,
}

/// Start the post-registration monitor for a fresh signup.
///
/// The watch runs in the background; its outcome is logged and, for the
/// recovery paths, recorded as a notification by the recovery service.
pub async fn handle_watch_registration(
    State(state): State<AppState>,
    payload: Result<Json<WatchRegistrationData>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "invalid JSON body");
            return error_response(StatusCode::BAD_REQUEST, "invalid_json", "Invalid JSON body");
        }
    };

    let user_id = payload.user_id.trim().to_string();
    if user_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_user_id",
            "userId cannot be blank",
        );
    }

    let monitor = state.monitor.clone();
    let shutdown = state.shutdown.subscribe();
    let expected = payload.expected_roles;

    tokio::spawn(async move {
        let outcome = monitor.watch(&user_id, expected, shutdown).await;
        info!(user_id = %user_id, ?outcome, "post-registration monitor finished");
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "message": "Registration monitoring started",
        })),
    )
        .into_response()
}
