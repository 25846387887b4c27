use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::{
    dto::{user_resource, UserWrite, KIND},
    model::User,
    services,
};
use crate::{
    auth::extractors::{Caller, MaybeCaller},
    error::ApiError,
    extract::Json,
    format::{render_collection, render_item, Format, Rendered, Resource},
    groups::user_read_context,
    repo::{Page, Repository},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Loads the user's listings and builds the view for this caller.
pub async fn present(repo: &dyn Repository, caller: Option<&User>, user: &User) -> Result<Resource, ApiError> {
    let listings = repo.listings_by_owner(user.id).await?;
    let ctx = user_read_context(caller, user);
    debug!(user_id = user.id, groups = %ctx, "serializing user");
    Ok(user_resource(user, &ctx, &listings, OffsetDateTime::now_utc()))
}

#[instrument(skip(state, caller, headers))]
pub async fn list_users(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(page): Query<Page>,
    headers: HeaderMap,
) -> Result<Rendered, ApiError> {
    let (users, total) = services::list_users(state.repo.as_ref(), Some(&caller), page).await?;
    let mut items = Vec::with_capacity(users.len());
    for user in &users {
        items.push(present(state.repo.as_ref(), Some(&caller), user).await?);
    }
    render_collection(Format::negotiate(&headers, false), "/api/users", KIND, &items, total)
}

#[instrument(skip(state, caller, headers))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Rendered, ApiError> {
    let user = services::read_user(state.repo.as_ref(), caller.as_ref(), id).await?;
    let resource = present(state.repo.as_ref(), caller.as_ref(), &user).await?;
    render_item(Format::negotiate(&headers, false), &resource)
}

#[instrument(skip(state, caller, headers, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    headers: HeaderMap,
    Json(payload): Json<UserWrite>,
) -> Result<(StatusCode, Rendered), ApiError> {
    let user = services::register(state.repo.as_ref(), caller.as_ref(), payload).await?;
    let resource = present(state.repo.as_ref(), caller.as_ref(), &user).await?;
    Ok((
        StatusCode::CREATED,
        render_item(Format::negotiate(&headers, false), &resource)?,
    ))
}

#[instrument(skip(state, caller, headers, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<UserWrite>,
) -> Result<Rendered, ApiError> {
    let user = services::update_user(state.repo.as_ref(), caller.as_ref(), id, payload).await?;
    let resource = present(state.repo.as_ref(), caller.as_ref(), &user).await?;
    render_item(Format::negotiate(&headers, false), &resource)
}

#[instrument(skip(state, caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    services::delete_user(state.repo.as_ref(), caller.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
