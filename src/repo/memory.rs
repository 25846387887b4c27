use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Page, Repository, StoreError, StoreResult};
use crate::cheeses::model::{CheeseListing, NewCheeseListing};
use crate::users::model::{NewUser, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    listings: BTreeMap<i64, CheeseListing>,
    next_user_id: i64,
    next_listing_id: i64,
}

impl Tables {
    fn check_unique(&self, email: &str, username: &str, except: Option<i64>) -> StoreResult<()> {
        for u in self.users.values().filter(|u| Some(u.id) != except) {
            if u.email == email {
                return Err(StoreError::Duplicate("email"));
            }
            if u.username == username {
                return Err(StoreError::Duplicate("username"));
            }
        }
        Ok(())
    }
}

fn paged<T>(rows: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(0);
    rows.skip(offset).take(limit).collect()
}

/// Store used by the test suite; one lock guards both tables.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.tables().users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, page: Page) -> StoreResult<(Vec<User>, i64)> {
        let t = self.tables();
        Ok((paged(t.users.values().cloned(), page), t.users.len() as i64))
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool> {
        let t = self.tables();
        Ok(t.users.values().any(|u| u.email == email && Some(u.id) != except))
    }

    async fn username_taken(&self, username: &str, except: Option<i64>) -> StoreResult<bool> {
        let t = self.tables();
        Ok(t.users.values().any(|u| u.username == username && Some(u.id) != except))
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables();
        t.check_unique(&user.email, &user.username, None)?;
        t.next_user_id += 1;
        let stored = User {
            id: t.next_user_id,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            phone_number: user.phone_number,
            stored_roles: user.roles,
        };
        t.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut t = self.tables();
        t.check_unique(&user.email, &user.username, Some(user.id))?;
        t.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables();
        let removed = t.users.remove(&id).is_some();
        t.listings.retain(|_, l| l.owner_id != id);
        Ok(removed)
    }

    async fn find_listing(&self, id: i64) -> StoreResult<Option<CheeseListing>> {
        Ok(self.tables().listings.get(&id).cloned())
    }

    async fn list_listings(&self, page: Page) -> StoreResult<(Vec<CheeseListing>, i64)> {
        let t = self.tables();
        Ok((paged(t.listings.values().cloned(), page), t.listings.len() as i64))
    }

    async fn listings_by_owner(&self, owner_id: i64) -> StoreResult<Vec<CheeseListing>> {
        let t = self.tables();
        Ok(t.listings
            .values()
            .filter(|l| l.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn insert_listing(&self, listing: NewCheeseListing) -> StoreResult<CheeseListing> {
        let mut t = self.tables();
        t.next_listing_id += 1;
        let stored = CheeseListing {
            id: t.next_listing_id,
            title: listing.title,
            description: listing.description,
            price: listing.price,
            created_at: listing.created_at,
            is_published: listing.is_published,
            owner_id: listing.owner_id,
        };
        t.listings.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_listing(&self, listing: &CheeseListing) -> StoreResult<CheeseListing> {
        self.tables().listings.insert(listing.id, listing.clone());
        Ok(listing.clone())
    }

    async fn delete_listing(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables().listings.remove(&id).is_some())
    }
}
