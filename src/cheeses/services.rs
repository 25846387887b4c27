use tracing::{debug, info};

use crate::{
    access::{check_listing, AccessDenied, Operation},
    cheeses::{
        dto::{CheeseListingWrite, OwnerRef},
        model::{text_to_html, CheeseListing, NewCheeseListing},
    },
    error::ApiError,
    groups::listing_write_context,
    repo::Repository,
    users::model::User,
    validation::Violations,
};

pub const TITLE_TOO_LONG: &str = "Describe your cheese in 50 characters or less";
pub const OWNER_MISMATCH: &str = "Cannot set owner to a different user";
pub const OWNER_INVALID: &str = "Invalid owner reference";

fn validate_fields(v: &mut Violations, title: Option<&str>, raw_description: Option<&str>, price: Option<&i64>) {
    v.not_blank("title", title);
    v.length("title", title, 2, 50, Some(TITLE_TOO_LONG));
    v.not_blank("description", raw_description);
    v.present("price", price);
}

/// Resolves a submitted owner. `allowed` lists the ids the caller may assign.
fn resolve_owner(v: &mut Violations, submitted: Option<&OwnerRef>, allowed: &[i64], default: i64) -> i64 {
    let Some(owner) = submitted else {
        return default;
    };
    match owner.user_id() {
        Some(id) if allowed.contains(&id) => id,
        Some(_) => {
            v.add("owner", OWNER_MISMATCH);
            default
        }
        None => {
            v.add("owner", OWNER_INVALID);
            default
        }
    }
}

pub async fn find_listing(repo: &dyn Repository, id: i64) -> Result<CheeseListing, ApiError> {
    repo.find_listing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cheese listing", id))
}

pub async fn create_listing(
    repo: &dyn Repository,
    caller: Option<&User>,
    payload: CheeseListingWrite,
) -> Result<CheeseListing, ApiError> {
    check_listing(Operation::Create, caller, None)?;
    let caller = caller.ok_or_else(AccessDenied::anonymous)?;
    let payload = payload.restrict(&listing_write_context());

    let mut v = Violations::new();
    let owner_id = resolve_owner(&mut v, payload.owner.as_ref(), &[caller.id], caller.id);
    validate_fields(
        &mut v,
        payload.title.as_deref(),
        payload.description.as_deref(),
        payload.price.as_ref(),
    );
    let (Some(title), Some(description), Some(price), true) =
        (payload.title, payload.description, payload.price, v.is_empty())
    else {
        return Err(v.into());
    };
    let mut new = NewCheeseListing::new(title, &description, price, owner_id);
    new.is_published = payload.is_published.unwrap_or(false);

    let listing = repo.insert_listing(new).await?;
    info!(listing_id = listing.id, owner_id, "cheese listing created");
    Ok(listing)
}

pub async fn update_listing(
    repo: &dyn Repository,
    caller: Option<&User>,
    id: i64,
    payload: CheeseListingWrite,
) -> Result<CheeseListing, ApiError> {
    let mut listing = find_listing(repo, id).await?;
    check_listing(Operation::Update, caller, Some(&listing))?;
    let caller = caller.ok_or_else(AccessDenied::anonymous)?;
    let payload = payload.restrict(&listing_write_context());

    let mut v = Violations::new();
    let owner_id = resolve_owner(
        &mut v,
        payload.owner.as_ref(),
        &[caller.id, listing.owner_id],
        listing.owner_id,
    );
    let title = payload.title.unwrap_or_else(|| listing.title.clone());
    validate_fields(
        &mut v,
        Some(&title),
        payload.description.as_deref().or(Some(listing.description.as_str())),
        Some(&payload.price.unwrap_or(listing.price)),
    );
    v.into_result()?;

    listing.title = title;
    if let Some(raw) = payload.description.as_deref() {
        listing.description = text_to_html(raw);
    }
    listing.price = payload.price.unwrap_or(listing.price);
    listing.owner_id = owner_id;
    if let Some(published) = payload.is_published {
        listing.is_published = published;
    }

    let listing = repo.update_listing(&listing).await?;
    debug!(listing_id = listing.id, "cheese listing updated");
    Ok(listing)
}

pub async fn delete_listing(repo: &dyn Repository, caller: Option<&User>, id: i64) -> Result<(), ApiError> {
    check_listing(Operation::Delete, caller, None)?;
    if !repo.delete_listing(id).await? {
        return Err(ApiError::not_found("Cheese listing", id));
    }
    info!(listing_id = id, "cheese listing deleted");
    Ok(())
}
