use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use entity::role::RoleType;

use crate::error::{error_response, RoleError};
use crate::recovery::RecoveryUserData;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverRegistrationData {
    user_id: String,
    email: String,
    expected_roles: Vec<String>,
    #[serde(default)]
    user_data: RecoveryUserData,
}

/// Standalone maintenance entry to registration recovery.
///
/// Always answers 200 with the report; a non-empty `errors` list does not
/// imply overall failure, only the `success` boolean is authoritative.
pub async fn handle_recover_registration(
    State(state): State<AppState>,
    payload: Result<Json<RecoverRegistrationData>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "invalid JSON body");
            return error_response(StatusCode::BAD_REQUEST, "invalid_json", "Invalid JSON body");
        }
    };

    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_user_id",
            "userId cannot be blank",
        );
    }

    let email = payload.email.trim();
    if email.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_email",
            "Email cannot be blank",
        );
    }

    let mut expected = Vec::with_capacity(payload.expected_roles.len());
    for raw in &payload.expected_roles {
        match RoleType::parse(raw.trim()) {
            Some(t) => expected.push(t),
            None => return RoleError::UnknownRoleType(raw.trim().to_string()).into_response(),
        }
    }

    let report = state
        .recovery
        .recover_registration(user_id, email, &expected, &payload.user_data)
        .await;

    Json(json!({
        "success": report.success,
        "report": report,
    }))
    .into_response()
}
