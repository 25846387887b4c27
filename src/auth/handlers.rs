use axum::{
    extract::{FromRef, State},
    routing::post,
    Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, TokenResponse},
        identity::Identity,
        jwt::JwtKeys,
    },
    error::ApiError,
    extract::Json,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let Some(user) = state.repo.find_user_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(invalid());
    };

    if !payload.password.verify(user.password_hash())? {
        warn!(user_id = user.id, "login invalid password");
        return Err(invalid());
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = user.id, identifier = user.identifier(), "user logged in");
    Ok(Json(TokenResponse {
        token,
        user: user.iri(),
    }))
}
