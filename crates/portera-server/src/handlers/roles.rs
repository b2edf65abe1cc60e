use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use entity::role::{self, RoleType};

use crate::error::{error_response, RoleError};
use crate::state::AppState;

pub fn role_json(role: &role::Model) -> serde_json::Value {
    json!({
        "id": role.id,
        "userId": role.user_id,
        "roleType": role.role_type,
        "isVerified": role.is_verified,
        "isActive": role.is_active,
        "verificationConfirmedAt": role.verification_confirmed_at,
        "roleSpecificData": role.role_specific_data,
        "createdAt": role.created_at,
        "updatedAt": role.updated_at,
    })
}

fn parse_role_type(raw: &str) -> Result<RoleType, RoleError> {
    let raw = raw.trim();
    RoleType::parse(raw).ok_or_else(|| RoleError::UnknownRoleType(raw.to_string()))
}

fn invalid_json(err: &JsonRejection) -> Response {
    debug!(error = %err, "invalid JSON body");
    error_response(StatusCode::BAD_REQUEST, "invalid_json", "Invalid JSON body")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRoleData {
    user_id: String,
    role_type: String,
    role_specific_data: Option<serde_json::Value>,
}

pub async fn handle_request_role(
    State(state): State<AppState>,
    payload: Result<Json<RequestRoleData>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(e) => return invalid_json(&e),
    };

    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_user_id",
            "userId cannot be blank",
        );
    }

    let role_type = match parse_role_type(&payload.role_type) {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };

    match state
        .lifecycle
        .request_role(user_id, role_type, payload.role_specific_data)
        .await
    {
        Ok(outcome) => {
            let message = if outcome.email_sent {
                "Role created; check your email to verify it"
            } else {
                "Role created, but the verification email could not be sent; request a resend or recovery"
            };

            Json(json!({
                "success": true,
                "message": message,
                "emailSent": outcome.email_sent,
                "role": role_json(&outcome.role),
            }))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRoleParams {
    token: Option<String>,
}

pub async fn handle_verify_role(
    State(state): State<AppState>,
    Query(params): Query<VerifyRoleParams>,
) -> Response {
    let token = params.token.unwrap_or_default();
    if token.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_token",
            "token query parameter is required",
        );
    }

    match state.lifecycle.verify_role(&token).await {
        Ok(outcome) => Json(json!({
            "success": true,
            "activated": outcome.activated,
            "role": role_json(&outcome.role),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSelector {
    user_id: String,
    role_type: String,
}

pub async fn handle_activate_role(
    State(state): State<AppState>,
    payload: Result<Json<RoleSelector>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(e) => return invalid_json(&e),
    };

    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_user_id",
            "userId cannot be blank",
        );
    }

    let role_type = match parse_role_type(&payload.role_type) {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };

    match state.lifecycle.activate_role(user_id, role_type).await {
        Ok(role) => Json(json!({
            "success": true,
            "role": role_json(&role),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn handle_resend_verification(
    State(state): State<AppState>,
    payload: Result<Json<RoleSelector>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(e) => return invalid_json(&e),
    };

    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_user_id",
            "userId cannot be blank",
        );
    }

    let role_type = match parse_role_type(&payload.role_type) {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };

    match state
        .lifecycle
        .resend_verification(user_id, role_type)
        .await
    {
        Ok(outcome) => {
            let message = if outcome.email_sent {
                "Verification email sent"
            } else {
                "Token was rotated, but the verification email could not be sent"
            };

            Json(json!({
                "success": true,
                "message": message,
                "emailSent": outcome.email_sent,
                "role": role_json(&outcome.role),
            }))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRolesParams {
    user_id: Option<String>,
}

pub async fn handle_list_roles(
    State(state): State<AppState>,
    Query(params): Query<ListRolesParams>,
) -> Response {
    let user_id = params.user_id.unwrap_or_default();
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_user_id",
            "userId query parameter is required",
        );
    }

    match state.lifecycle.list_roles(user_id).await {
        Ok(roles) => Json(json!({
            "success": true,
            "roles": roles.iter().map(role_json).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
