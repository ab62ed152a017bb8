use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("a report is already being generated")]
    Busy,

    #[error("an API key must be selected first")]
    CredentialRequired,

    #[error("the API key was rejected; select a key again")]
    CredentialReselect,

    #[error("{0}")]
    Upstream(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal",
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Busy => "busy",
            AppError::CredentialRequired => "credential_required",
            AppError::CredentialReselect => "credential_reselect",
            AppError::Upstream(_) => "upstream",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Busy => StatusCode::CONFLICT,
            AppError::CredentialRequired => StatusCode::PRECONDITION_REQUIRED,
            AppError::CredentialReselect => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Internal(err) => {
                sentry_anyhow::capture_anyhow(err);
                tracing::error!(error = %err, "internal error");
            }
            AppError::Upstream(msg) => tracing::warn!(%msg, "upstream failure"),
            _ => {}
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_map_to_distinct_statuses() {
        assert_eq!(
            AppError::CredentialRequired.into_response().status(),
            StatusCode::PRECONDITION_REQUIRED
        );
        assert_eq!(
            AppError::CredentialReselect.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Busy.into_response().status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Upstream("x".to_string()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::CredentialRequired.code(), "credential_required");
        assert_eq!(AppError::CredentialReselect.code(), "credential_reselect");
        assert_eq!(AppError::Validation(String::new()).code(), "validation");
    }
}
