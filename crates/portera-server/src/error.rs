use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::DbErr;
use thiserror::Error;

/// Failures of the role lifecycle, verification and recovery operations.
///
/// Duplicate errors are business-rule violations, not system faults; the two
/// variants stay distinct so the caller can tell "already verified" from
/// "pending verification, check your email".
#[derive(Debug, Error)]
pub enum RoleError {
    #[error("unknown role type: {0}")]
    UnknownRoleType(String),

    #[error("role already verified")]
    DuplicateVerified,

    #[error("role pending verification, check your email")]
    DuplicatePending,

    #[error("verification token not found")]
    TokenNotFound,

    #[error("verification token expired")]
    TokenExpired,

    #[error("role not found")]
    RoleNotFound,

    #[error("role is not verified")]
    RoleNotVerified,

    #[error("profile not found")]
    ProfileNotFound,

    #[error("store error: {0}")]
    Store(#[from] DbErr),
}

impl RoleError {
    pub fn code(&self) -> &'static str {
        match self {
            RoleError::UnknownRoleType(_) => "unknown_role_type",
            RoleError::DuplicateVerified => "role_already_verified",
            RoleError::DuplicatePending => "role_pending_verification",
            RoleError::TokenNotFound => "token_not_found",
            RoleError::TokenExpired => "token_expired",
            RoleError::RoleNotFound => "role_not_found",
            RoleError::RoleNotVerified => "role_not_verified",
            RoleError::ProfileNotFound => "profile_not_found",
            RoleError::Store(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RoleError::UnknownRoleType(_)
            | RoleError::DuplicateVerified
            | RoleError::DuplicatePending
            | RoleError::TokenExpired
            | RoleError::RoleNotVerified => StatusCode::BAD_REQUEST,
            RoleError::TokenNotFound | RoleError::RoleNotFound | RoleError::ProfileNotFound => {
                StatusCode::NOT_FOUND
            }
            RoleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "success": false,
        "error": {
            "code": code,
            "message": message
        }
    });

    (status, Json(body)).into_response()
}

impl IntoResponse for RoleError {
    fn into_response(self) -> Response {
        if let RoleError::Store(ref e) = self {
            tracing::error!(error = %e, "store error");
            // Store details stay out of the response body.
            return error_response(self.status(), self.code(), "Internal server error");
        }

        error_response(self.status(), self.code(), &self.to_string())
    }
}
