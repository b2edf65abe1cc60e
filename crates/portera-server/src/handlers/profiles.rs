use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use entity::profile;
use entity::role::RoleType;

use crate::error::{error_response, RoleError};
use crate::recovery::DEFAULT_COUNTRY;
use crate::state::AppState;
use crate::util;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileData {
    user_id: String,
    email: String,
    full_name: Option<String>,
    user_type: Option<String>,
    address: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
}

fn profile_json(p: &profile::Model) -> serde_json::Value {
    json!({
        "id": p.id,
        "email": p.email,
        "fullName": p.full_name,
        "userType": p.user_type,
        "address": p.address,
        "city": p.city,
        "postalCode": p.postal_code,
        "country": p.country,
        "createdAt": p.created_at,
        "updatedAt": p.updated_at,
    })
}

pub async fn handle_create_profile(
    State(state): State<AppState>,
    payload: Result<Json<CreateProfileData>, JsonRejection>,
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

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_email",
            "Email cannot be blank",
        );
    }

    let user_type = match payload.user_type.as_deref() {
        None => RoleType::Particular,
        Some(raw) => match RoleType::parse(raw.trim()) {
            Some(t) => t,
            None => {
                return RoleError::UnknownRoleType(raw.trim().to_string()).into_response();
            }
        },
    };

    let existing = match profile::Entity::find_by_id(user_id).one(&state.db).await {
        Ok(found) => found,
        Err(e) => return RoleError::from(e).into_response(),
    };
    if existing.is_some() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "profile_exists",
            "Profile already exists",
        );
    }

    let now = util::now_ts();
    let row = profile::ActiveModel {
        id: Set(user_id.to_string()),
        email: Set(email),
        full_name: Set(payload.full_name.clone()),
        user_type: Set(user_type),
        address: Set(payload.address.clone()),
        city: Set(payload.city.clone()),
        postal_code: Set(payload.postal_code.clone()),
        country: Set(payload
            .country
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    };

    match row.insert(&state.db).await {
        Ok(created) => Json(json!({
            "success": true,
            "profile": profile_json(&created),
        }))
        .into_response(),
        Err(e) => RoleError::from(e).into_response(),
    }
}
