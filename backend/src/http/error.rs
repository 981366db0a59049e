//! HTTP error handling and the response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::db::repository::RepositoryError;
use crate::services::{messages, ServiceError};

/// Body of every response: `code` is 0 on success and the HTTP status
/// otherwise; `data` is null on errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: messages::SUCCESS.to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn empty() -> Self {
        Self {
            code: 0,
            message: messages::SUCCESS.to_string(),
            data: None,
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    Service(ServiceError),
    /// Request body or query string could not be decoded.
    BadRequest(String),
    /// No route matched.
    NotFound(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Service(e) => match e {
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Conflict(_) => StatusCode::CONFLICT,
                ServiceError::Repository(_) | ServiceError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Service(e) => e.public_message(),
            AppError::BadRequest(m) | AppError::NotFound(m) => m.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }
        (status, Json(ApiResponse::failure(status, self.message()))).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Service(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Service(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_status() {
        let cases = [
            (ServiceError::validation("x"), StatusCode::BAD_REQUEST),
            (ServiceError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ServiceError::forbidden(), StatusCode::FORBIDDEN),
            (ServiceError::not_found("x"), StatusCode::NOT_FOUND),
            (ServiceError::conflict("x"), StatusCode::CONFLICT),
            (ServiceError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_store_failure_hides_detail() {
        let err = AppError::from(RepositoryError::connection("pool exhausted"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), messages::DATABASE_ERROR);
    }

    #[test]
    fn test_failure_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::failure(StatusCode::CONFLICT, "dup")).unwrap();
        assert_eq!(body["code"], 409);
        assert_eq!(body["message"], "dup");
        assert!(body["data"].is_null());
    }
}
