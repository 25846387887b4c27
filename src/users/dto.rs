use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::cheeses::dto::listing_resource;
use crate::cheeses::model::CheeseListing;
use crate::format::{Field, Resource};
use crate::groups::{Context, USER_FIELDS};
use crate::users::model::{published_listings, PlainPassword, User};

pub const KIND: &str = "User";

/// Request body for registration and account updates.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWrite {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<PlainPassword>,
    pub phone_number: Option<String>,
    pub roles: Option<Vec<String>>,
}

impl UserWrite {
    /// Drops every field the context may not write.
    pub fn restrict(mut self, ctx: &Context) -> Self {
        let can = |f| ctx.can_write(USER_FIELDS, f);
        if !can("email") {
            self.email = None;
        }
        if !can("username") {
            self.username = None;
        }
        if !can("password") {
            self.password = None;
        }
        if !can("phoneNumber") {
            self.phone_number = None;
        }
        if !can("roles") {
            self.roles = None;
        }
        self
    }
}

/// Readable view of a user. `listings` is the user's full collection; only
/// the published ones are exposed.
pub fn user_resource(user: &User, ctx: &Context, listings: &[CheeseListing], now: OffsetDateTime) -> Resource {
    let can = |f| ctx.can_read(USER_FIELDS, f);
    let mut r = Resource::new(user.id, user.iri(), KIND);
    if can("email") {
        r.value("email", user.email.clone());
    }
    if can("username") {
        r.value("username", user.username.clone());
    }
    if can("phoneNumber") {
        r.value(
            "phoneNumber",
            user.phone_number.clone().map_or(Value::Null, Value::String),
        );
    }
    if can("cheeseListings") {
        let embedded = published_listings(listings)
            .into_iter()
            .map(|l| listing_resource(l, ctx, None, now))
            .collect();
        r.push("cheeseListings", Field::Many(embedded));
    }
    r
}
