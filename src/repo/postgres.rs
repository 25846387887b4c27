use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::OffsetDateTime;

use super::{Page, Repository, StoreError, StoreResult};
use crate::cheeses::model::{CheeseListing, NewCheeseListing};
use crate::users::model::{NewUser, User};

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    username: String,
    password_hash: String,
    phone_number: Option<String>,
    roles: Json<Vec<String>>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            username: r.username,
            password_hash: r.password_hash,
            phone_number: r.phone_number,
            stored_roles: r.roles.0,
        }
    }
}

#[derive(Debug, FromRow)]
struct CheeseListingRow {
    id: i64,
    title: String,
    description: String,
    price: i64,
    created_at: OffsetDateTime,
    is_published: bool,
    owner_id: i64,
}

impl From<CheeseListingRow> for CheeseListing {
    fn from(r: CheeseListingRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            price: r.price,
            created_at: r.created_at,
            is_published: r.is_published,
            owner_id: r.owner_id,
        }
    }
}

const USER_COLUMNS: &str = "id, email, username, password_hash, phone_number, roles";
const LISTING_COLUMNS: &str = "id, title, description, price, created_at, is_published, owner_id";

/// Maps the named unique constraints from the migrations to payload fields.
fn map_unique(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            match db.constraint() {
                Some("users_email_key") => return StoreError::Duplicate("email"),
                Some("users_username_key") => return StoreError::Duplicate("username"),
                _ => {}
            }
        }
    }
    StoreError::Database(e)
}

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn list_users(&self, page: Page) -> StoreResult<(Vec<User>, i64)> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok((rows.into_iter().map(User::from).collect(), total))
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> StoreResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn username_taken(&self, username: &str, except: Option<i64>) -> StoreResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE username = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, username, password_hash, phone_number, roles)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(Json(&user.roles))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique)?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET email = $2, username = $3, password_hash = $4, phone_number = $5, roles = $6
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(Json(&user.stored_roles))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique)?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_listing(&self, id: i64) -> StoreResult<Option<CheeseListing>> {
        let row = sqlx::query_as::<_, CheeseListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM cheese_listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CheeseListing::from))
    }

    async fn list_listings(&self, page: Page) -> StoreResult<(Vec<CheeseListing>, i64)> {
        let rows = sqlx::query_as::<_, CheeseListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM cheese_listings ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cheese_listings")
            .fetch_one(&self.pool)
            .await?;
        Ok((rows.into_iter().map(CheeseListing::from).collect(), total))
    }

    async fn listings_by_owner(&self, owner_id: i64) -> StoreResult<Vec<CheeseListing>> {
        let rows = sqlx::query_as::<_, CheeseListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM cheese_listings WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CheeseListing::from).collect())
    }

    async fn insert_listing(&self, listing: NewCheeseListing) -> StoreResult<CheeseListing> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, CheeseListingRow>(&format!(
            r#"
            INSERT INTO cheese_listings (title, description, price, created_at, is_published, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(listing.created_at)
        .bind(listing.is_published)
        .bind(listing.owner_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn update_listing(&self, listing: &CheeseListing) -> StoreResult<CheeseListing> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, CheeseListingRow>(&format!(
            r#"
            UPDATE cheese_listings
               SET title = $2, description = $3, price = $4, is_published = $5, owner_id = $6
             WHERE id = $1
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(listing.id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(listing.is_published)
        .bind(listing.owner_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_listing(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM cheese_listings WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
