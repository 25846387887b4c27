use std::fmt;

use crate::auth::identity::Identity;
use crate::auth::password::{hash_password, verify_password};
use crate::cheeses::model::CheeseListing;

pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// Account record. Holds only persisted state; the plain password never
/// lives here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub stored_roles: Vec<String>,
}

impl User {
    /// Stored roles plus the base role, without duplicates.
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = Vec::with_capacity(self.stored_roles.len() + 1);
        for role in self
            .stored_roles
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(ROLE_USER))
        {
            if !roles.iter().any(|r| r == role) {
                roles.push(role.to_string());
            }
        }
        roles
    }

    pub fn is_admin(&self) -> bool {
        self.is_granted(ROLE_ADMIN)
    }

    pub fn iri(&self) -> String {
        user_iri(self.id)
    }
}

impl Identity for User {
    fn identifier(&self) -> &str {
        &self.email
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }

    fn roles(&self) -> Vec<String> {
        User::roles(self)
    }
}

pub fn user_iri(id: i64) -> String {
    format!("/api/users/{id}")
}

/// Only the published subset of a user's listings, in stored order.
pub fn published_listings(listings: &[CheeseListing]) -> Vec<&CheeseListing> {
    listings.iter().filter(|l| l.is_published).collect()
}

/// Submitted credential. Consumed by hashing so it cannot outlive the write.
#[derive(serde::Deserialize)]
#[serde(transparent)]
pub struct PlainPassword(String);

impl PlainPassword {
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_hash(self) -> anyhow::Result<String> {
        hash_password(&self.0)
    }

    pub fn verify(self, hash: &str) -> anyhow::Result<bool> {
        verify_password(&self.0, hash)
    }
}

impl From<&str> for PlainPassword {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlainPassword(***)")
    }
}

/// Values for a user that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub roles: Vec<String>,
}
