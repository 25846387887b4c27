//! Persistence port. Every write is atomic; unique columns surface as
//! [`StoreError::Duplicate`].

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::cheeses::model::{CheeseListing, NewCheeseListing};
use crate::users::model::{NewUser, User};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub const PAGE_SIZE: i64 = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique column already holds the value. Carries the payload field name.
    #[error("duplicate value for {0}")]
    Duplicate(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 1-based page of a collection, `?page=N`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Page {
    #[serde(default = "first_page")]
    pub page: i64,
}

fn first_page() -> i64 {
    1
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1 }
    }
}

impl Page {
    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    /// Saturates for huge page numbers, which then simply come back empty.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(PAGE_SIZE)
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    // === Users ===

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Returns the page and the total number of users.
    async fn list_users(&self, page: Page) -> StoreResult<(Vec<User>, i64)>;

    /// True when another user (not `except`) already has this email.
    async fn email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool>;

    async fn username_taken(&self, username: &str, except: Option<i64>) -> StoreResult<bool>;

    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn update_user(&self, user: &User) -> StoreResult<User>;

    /// Also removes the user's listings. Returns false if nothing was deleted.
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    // === Cheese listings ===

    async fn find_listing(&self, id: i64) -> StoreResult<Option<CheeseListing>>;

    async fn list_listings(&self, page: Page) -> StoreResult<(Vec<CheeseListing>, i64)>;

    /// All listings owned by the user, ordered by id.
    async fn listings_by_owner(&self, owner_id: i64) -> StoreResult<Vec<CheeseListing>>;

    async fn insert_listing(&self, listing: NewCheeseListing) -> StoreResult<CheeseListing>;

    async fn update_listing(&self, listing: &CheeseListing) -> StoreResult<CheeseListing>;

    async fn delete_listing(&self, id: i64) -> StoreResult<bool>;
}
