//! Request extractors: bearer authentication, role guards, and JSON,
//! query and id extraction whose rejections use the response envelope.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::AppError;
use super::state::AppState;
use crate::models::UserRole;
use crate::services::{messages, Actor, ServiceError};

/// Any authenticated caller, with the raw token kept for logout.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub actor: Actor,
    pub token: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let actor = state.auth.authenticate(header)?;
        let token = header
            .and_then(|h| h.trim().strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        Ok(CurrentUser { actor, token })
    }
}

/// Caller with role `host` or `admin`.
#[derive(Debug, Clone)]
pub struct HostUser(pub Actor);

impl FromRequestParts<AppState> for HostUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser { actor, .. } = CurrentUser::from_request_parts(parts, state).await?;
        if !actor.is_host() {
            warn!(user_id = actor.user_id, role = %actor.role, "host route denied");
            return Err(ServiceError::forbidden().into());
        }
        Ok(HostUser(actor))
    }
}

/// Caller with role `guest`.
#[derive(Debug, Clone)]
pub struct GuestUser(pub Actor);

impl FromRequestParts<AppState> for GuestUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser { actor, .. } = CurrentUser::from_request_parts(parts, state).await?;
        if actor.role != UserRole::Guest {
            warn!(user_id = actor.user_id, role = %actor.role, "guest route denied");
            return Err(ServiceError::forbidden().into());
        }
        Ok(GuestUser(actor))
    }
}

/// `Json<T>` whose failures answer 400 invalid data.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    debug!(error = %rejection.body_text(), "rejected request body");
    AppError::BadRequest(messages::INVALID_DATA.to_string())
}

/// `Query<T>` whose failures answer 400 invalid data.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection: QueryRejection| {
                debug!(error = %rejection.body_text(), "rejected query string");
                AppError::BadRequest(messages::INVALID_DATA.to_string())
            })
    }
}

/// A single numeric `{id}` path segment; anything else answers 400 invalid id.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<i64>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| IdPath(id))
            .map_err(|_: PathRejection| AppError::BadRequest(messages::INVALID_ID.to_string()))
    }
}
