use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use todoshare_core::authz::{AuthzError, DenyReason};
use todoshare_core::sharing::SharingError;
use todoshare_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("forbidden: {0}")]
    Denied(DenyReason),

    #[error(transparent)]
    Sharing(#[from] SharingError),

    #[error("authorization error: {0}")]
    Authz(#[from] AuthzError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Denied(_) | ApiError::Sharing(SharingError::Forbidden(_)) => {
                StatusCode::FORBIDDEN
            }
            ApiError::NotFound(_)
            | ApiError::Sharing(SharingError::NotFound { .. })
            | ApiError::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Sharing(SharingError::Conflict { .. })
            | ApiError::Storage(StorageError::Conflict { .. }) => StatusCode::CONFLICT,
            ApiError::Sharing(SharingError::IncompatibleVisibility(_))
            | ApiError::Authz(AuthzError::ResourceMismatch { .. })
            | ApiError::Storage(StorageError::MissingReference { .. })
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Authz(AuthzError::Source(_))
            | ApiError::Storage(StorageError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denials_map_to_403() {
        for reason in [
            DenyReason::InsufficientRole,
            DenyReason::NotOwner,
            DenyReason::NoAccess,
        ] {
            assert_eq!(ApiError::Denied(reason).status_code(), StatusCode::FORBIDDEN);
        }
        let owner_revoke = ApiError::from(SharingError::Forbidden("l".to_string()));
        assert_eq!(owner_revoke.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn sharing_errors_map_to_distinct_statuses() {
        let conflict = ApiError::from(SharingError::Conflict {
            list_id: "l".to_string(),
            user_id: "u".to_string(),
        });
        let private = ApiError::from(SharingError::IncompatibleVisibility("l".to_string()));
        let missing = ApiError::from(SharingError::NotFound {
            list_id: "l".to_string(),
            user_id: "u".to_string(),
        });

        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(private.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_errors_keep_their_meaning() {
        let not_found = ApiError::from(StorageError::NotFound { entity: "todo" });
        let conflict = ApiError::from(StorageError::Conflict { entity: "user" });
        let internal = ApiError::from(StorageError::Internal("boom".to_string()));

        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert!(not_found.to_string().contains("todo"));
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn lookup_failure_is_internal() {
        let err = ApiError::from(AuthzError::Source("pool closed".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn mismatched_scope_is_a_bad_request() {
        let err = ApiError::from(AuthzError::ResourceMismatch {
            scope: todoshare_core::authz::Scope::TodoAccess,
            resource: todoshare_core::authz::ResourceRef::None,
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn denial_message_names_reason() {
        let err = ApiError::Denied(DenyReason::NotOwner);
        assert_eq!(err.to_string(), "forbidden: not the list owner");
    }
}
