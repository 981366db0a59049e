//! Service-level errors.
//!
//! Client-facing variants carry the message that ends up in the response
//! envelope. Store failures keep the underlying [`RepositoryError`].

use crate::db::repository::RepositoryError;

use super::messages;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("repository failure: {0}")]
    Repository(RepositoryError),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: &str) -> Self {
        Self::Validation(message.to_string())
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::Unauthorized(message.to_string())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden(messages::FORBIDDEN.to_string())
    }

    pub fn not_found(message: &str) -> Self {
        Self::NotFound(message.to_string())
    }

    pub fn conflict(message: &str) -> Self {
        Self::Conflict(message.to_string())
    }

    /// Message shown to clients. Store failures never expose their detail.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Validation(m)
            | ServiceError::Unauthorized(m)
            | ServiceError::Forbidden(m)
            | ServiceError::NotFound(m)
            | ServiceError::Conflict(m) => m.clone(),
            ServiceError::Repository(_) | ServiceError::Internal(_) => {
                messages::DATABASE_ERROR.to_string()
            }
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => {
                ServiceError::NotFound(messages::NOT_FOUND.to_string())
            }
            RepositoryError::Conflict { .. } => {
                ServiceError::Conflict(messages::CONFLICT.to_string())
            }
            RepositoryError::ValidationError { .. } => {
                ServiceError::Validation(messages::INVALID_DATA.to_string())
            }
            other => ServiceError::Repository(other),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(_: validator::ValidationErrors) -> Self {
        ServiceError::Validation(messages::INVALID_DATA.to_string())
    }
}

/// Map a repository `NotFound` onto a specific message; other errors
/// convert as usual.
pub fn missing(message: &'static str) -> impl FnOnce(RepositoryError) -> ServiceError {
    move |err| {
        if err.is_not_found() {
            ServiceError::NotFound(message.to_string())
        } else {
            ServiceError::from(err)
        }
    }
}

/// Map a repository `Conflict` onto a specific message.
pub fn conflicting(message: &'static str) -> impl FnOnce(RepositoryError) -> ServiceError {
    move |err| {
        if err.is_conflict() {
            ServiceError::Conflict(message.to_string())
        } else {
            ServiceError::from(err)
        }
    }
}
