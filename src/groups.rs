//! Field visibility per serialization group.
//!
//! Every exposed field is listed once with the groups that may read it and
//! the groups that may write it. Serializers and payload filters consult
//! these tables instead of deciding per handler.

use std::collections::BTreeSet;
use std::fmt;

use crate::users::model::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Group {
    UserRead,
    UserWrite,
    AdminRead,
    AdminWrite,
    OwnerRead,
    CheeseListingRead,
    CheeseListingWrite,
    CheeseListingItemGet,
}

impl Group {
    pub const ALL: [Group; 8] = [
        Group::UserRead,
        Group::UserWrite,
        Group::AdminRead,
        Group::AdminWrite,
        Group::OwnerRead,
        Group::CheeseListingRead,
        Group::CheeseListingWrite,
        Group::CheeseListingItemGet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Group::UserRead => "user:read",
            Group::UserWrite => "user:write",
            Group::AdminRead => "admin:read",
            Group::AdminWrite => "admin:write",
            Group::OwnerRead => "owner:read",
            Group::CheeseListingRead => "cheese_listing:read",
            Group::CheeseListingWrite => "cheese_listing:write",
            Group::CheeseListingItemGet => "cheese_listing:item:get",
        }
    }
}

pub struct FieldRule {
    pub name: &'static str,
    pub read: &'static [Group],
    pub write: &'static [Group],
}

const fn rule(name: &'static str, read: &'static [Group], write: &'static [Group]) -> FieldRule {
    FieldRule { name, read, write }
}

pub const USER_FIELDS: &[FieldRule] = &[
    rule("email", &[Group::UserRead], &[Group::UserWrite]),
    rule(
        "username",
        &[Group::UserRead, Group::CheeseListingItemGet],
        &[Group::UserWrite],
    ),
    rule(
        "phoneNumber",
        &[Group::AdminRead, Group::OwnerRead],
        &[Group::UserWrite],
    ),
    rule("roles", &[], &[Group::AdminWrite]),
    rule("password", &[], &[Group::UserWrite]),
    rule("cheeseListings", &[Group::UserRead], &[]),
];

pub const CHEESE_LISTING_FIELDS: &[FieldRule] = &[
    rule(
        "title",
        &[Group::CheeseListingRead, Group::UserRead],
        &[Group::CheeseListingWrite],
    ),
    rule("shortDescription", &[Group::CheeseListingRead], &[]),
    rule("description", &[], &[Group::CheeseListingWrite]),
    rule(
        "price",
        &[Group::CheeseListingRead, Group::UserRead],
        &[Group::CheeseListingWrite],
    ),
    rule(
        "owner",
        &[Group::CheeseListingRead],
        &[Group::CheeseListingWrite],
    ),
    rule("createdAtAgo", &[Group::CheeseListingRead], &[]),
    rule("isPublished", &[], &[Group::CheeseListingWrite]),
];

/// The set of groups active for one (de)serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context(BTreeSet<Group>);

impl Context {
    pub fn of(groups: &[Group]) -> Self {
        Self(groups.iter().copied().collect())
    }

    pub fn with(mut self, group: Group) -> Self {
        self.0.insert(group);
        self
    }

    pub fn has(&self, group: Group) -> bool {
        self.0.contains(&group)
    }

    pub fn can_read(&self, table: &[FieldRule], field: &str) -> bool {
        lookup(table, field).is_some_and(|r| r.read.iter().any(|g| self.has(*g)))
    }

    pub fn can_write(&self, table: &[FieldRule], field: &str) -> bool {
        lookup(table, field).is_some_and(|r| r.write.iter().any(|g| self.has(*g)))
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|g| g.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

fn lookup<'a>(table: &'a [FieldRule], field: &str) -> Option<&'a FieldRule> {
    table.iter().find(|r| r.name == field)
}

/// `owner:read` when reading yourself, `admin:read` for administrators.
pub fn user_read_context(caller: Option<&User>, target: &User) -> Context {
    let mut ctx = Context::of(&[Group::UserRead]);
    if let Some(caller) = caller {
        if caller.id == target.id {
            ctx = ctx.with(Group::OwnerRead);
        }
        if caller.is_admin() {
            ctx = ctx.with(Group::AdminRead);
        }
    }
    ctx
}

pub fn user_write_context(caller: Option<&User>) -> Context {
    let ctx = Context::of(&[Group::UserWrite]);
    match caller {
        Some(c) if c.is_admin() => ctx.with(Group::AdminWrite),
        _ => ctx,
    }
}

pub fn listing_read_context(item: bool) -> Context {
    let ctx = Context::of(&[Group::CheeseListingRead]);
    if item {
        ctx.with(Group::CheeseListingItemGet)
    } else {
        ctx
    }
}

pub fn listing_write_context() -> Context {
    Context::of(&[Group::CheeseListingWrite])
}
