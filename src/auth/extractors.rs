use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::{error::ApiError, state::AppState, users::model::User};

/// The authenticated caller, loaded from the store. Rejects with 401.
pub struct Caller(pub User);

/// The caller if a bearer token was sent, `None` for anonymous requests.
/// A token that is present but invalid still rejects with 401.
pub struct MaybeCaller(pub Option<User>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header".into()))?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(Some)
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };
    let claims = JwtKeys::from_ref(state).verify(token).map_err(|_| {
        warn!("invalid or expired token");
        ApiError::Unauthorized("Invalid or expired token".into())
    })?;
    let user = state
        .repo
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    Ok(Some(user))
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .map(Caller)
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeCaller(resolve(parts, state).await?))
    }
}
