use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::{
    dto::{listing_resource, CheeseListingWrite, KIND},
    services,
};
use crate::{
    access::{check_listing, Operation},
    auth::extractors::MaybeCaller,
    error::ApiError,
    extract::Json,
    format::{render_collection, render_item, Format, Rendered},
    groups::listing_read_context,
    repo::Page,
    state::AppState,
};

pub fn cheese_routes() -> Router<AppState> {
    Router::new()
        .route("/cheeses", get(list_cheeses).post(create_cheese))
        .route(
            "/cheeses/:id",
            get(get_cheese).put(update_cheese).delete(delete_cheese),
        )
}

#[instrument(skip(state, caller, headers))]
pub async fn list_cheeses(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Query(page): Query<Page>,
    headers: HeaderMap,
) -> Result<Rendered, ApiError> {
    check_listing(Operation::List, caller.as_ref(), None)?;
    let (listings, total) = state.repo.list_listings(page).await?;

    let ctx = listing_read_context(false);
    debug!(groups = %ctx, count = listings.len(), "serializing cheese listings");
    let now = OffsetDateTime::now_utc();
    let items: Vec<_> = listings
        .iter()
        .map(|l| listing_resource(l, &ctx, None, now))
        .collect();
    render_collection(Format::negotiate(&headers, true), "/api/cheeses", KIND, &items, total)
}

#[instrument(skip(state, caller, headers))]
pub async fn get_cheese(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Rendered, ApiError> {
    let listing = services::find_listing(state.repo.as_ref(), id).await?;
    check_listing(Operation::Read, caller.as_ref(), Some(&listing))?;
    let owner = state.repo.find_user(listing.owner_id).await?;

    let resource = listing_resource(
        &listing,
        &listing_read_context(true),
        owner.as_ref(),
        OffsetDateTime::now_utc(),
    );
    render_item(Format::negotiate(&headers, true), &resource)
}

#[instrument(skip(state, caller, headers, payload))]
pub async fn create_cheese(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    headers: HeaderMap,
    Json(payload): Json<CheeseListingWrite>,
) -> Result<(StatusCode, Rendered), ApiError> {
    let listing = services::create_listing(state.repo.as_ref(), caller.as_ref(), payload).await?;
    let resource = listing_resource(
        &listing,
        &listing_read_context(false),
        None,
        OffsetDateTime::now_utc(),
    );
    Ok((
        StatusCode::CREATED,
        render_item(Format::negotiate(&headers, true), &resource)?,
    ))
}

#[instrument(skip(state, caller, headers, payload))]
pub async fn update_cheese(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<CheeseListingWrite>,
) -> Result<Rendered, ApiError> {
    let listing = services::update_listing(state.repo.as_ref(), caller.as_ref(), id, payload).await?;
    let resource = listing_resource(
        &listing,
        &listing_read_context(false),
        None,
        OffsetDateTime::now_utc(),
    );
    render_item(Format::negotiate(&headers, true), &resource)
}

#[instrument(skip(state, caller))]
pub async fn delete_cheese(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    services::delete_listing(state.repo.as_ref(), caller.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
