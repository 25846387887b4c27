use serde::Deserialize;
use time::OffsetDateTime;

use crate::cheeses::model::CheeseListing;
use crate::format::{Field, Resource};
use crate::groups::{Context, Group, CHEESE_LISTING_FIELDS};
use crate::users::dto::user_resource;
use crate::users::model::{user_iri, User};

pub const KIND: &str = "cheeses";

/// Request body for POST and PUT. Absent fields are left untouched on update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheeseListingWrite {
    pub title: Option<String>,
    /// Plain text, converted to HTML before storage.
    pub description: Option<String>,
    pub price: Option<i64>,
    pub owner: Option<OwnerRef>,
    pub is_published: Option<bool>,
}

impl CheeseListingWrite {
    /// Drops every field the context may not write.
    pub fn restrict(mut self, ctx: &Context) -> Self {
        let can = |f| ctx.can_write(CHEESE_LISTING_FIELDS, f);
        if !can("title") {
            self.title = None;
        }
        if !can("description") {
            self.description = None;
        }
        if !can("price") {
            self.price = None;
        }
        if !can("owner") {
            self.owner = None;
        }
        if !can("isPublished") {
            self.is_published = None;
        }
        self
    }
}

/// Owner reference as sent by clients: an IRI or a bare id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OwnerRef {
    Id(i64),
    Iri(String),
}

impl OwnerRef {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            OwnerRef::Id(id) => Some(*id),
            OwnerRef::Iri(iri) => iri.strip_prefix("/api/users/")?.parse().ok(),
        }
    }
}

/// Readable view of a listing. With `cheese_listing:item:get` and a loaded
/// owner the owner is embedded, otherwise it is referenced by IRI.
pub fn listing_resource(
    listing: &CheeseListing,
    ctx: &Context,
    owner: Option<&User>,
    now: OffsetDateTime,
) -> Resource {
    let can = |f| ctx.can_read(CHEESE_LISTING_FIELDS, f);
    let mut r = Resource::new(listing.id, listing.iri(), KIND);
    if can("title") {
        r.value("title", listing.title.clone());
    }
    if can("shortDescription") {
        r.value("shortDescription", listing.short_description());
    }
    if can("price") {
        r.value("price", listing.price);
    }
    if can("owner") {
        match owner {
            Some(user) if ctx.has(Group::CheeseListingItemGet) => {
                r.push("owner", Field::One(user_resource(user, ctx, &[], now)));
            }
            _ => r.value("owner", user_iri(listing.owner_id)),
        }
    }
    if can("createdAtAgo") {
        r.value("createdAtAgo", listing.created_at_ago(now));
    }
    r
}
