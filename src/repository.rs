use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Category, CategoryRequest, Listing, ListingCreateRequest, ListingStatus,
        ListingUpdateRequest, NewUser, UpdateProfileRequest, User,
    },
};

const DEFAULT_CURRENCY: &str = "EUR";

/// Repository Trait
///
/// The persistence contract used by handlers and by the principal resolver. Every method
/// returns `AppResult`: storage failures surface as `AppError::Internal` instead of being
/// swallowed into empty results.
///
/// **Send + Sync + async_trait** keep `Arc<dyn Repository>` usable across Axum's tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    // `email` must already be normalized (trimmed, lowercased).
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    // Fails with `EmailTaken` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    // Also removes the user's listings.
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;

    // --- Categories ---
    async fn list_categories(&self) -> AppResult<Vec<Category>>;
    async fn get_category(&self, id: i64) -> AppResult<Option<Category>>;
    async fn create_category(&self, req: CategoryRequest) -> AppResult<Category>;
    async fn update_category(&self, id: i64, req: CategoryRequest) -> AppResult<Option<Category>>;
    // Fails with `BadRequest` while listings still reference the category.
    async fn delete_category(&self, id: i64) -> AppResult<bool>;

    // --- Listings ---
    // `None` returns every listing regardless of status.
    async fn list_listings(&self, status: Option<ListingStatus>) -> AppResult<Vec<Listing>>;
    async fn list_listings_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Listing>>;
    async fn get_listing(&self, id: Uuid) -> AppResult<Option<Listing>>;
    // New listings always start as `PENDING`.
    async fn create_listing(&self, owner_id: Uuid, req: ListingCreateRequest) -> AppResult<Listing>;
    // Partial update; absent fields keep their value.
    async fn update_listing(&self, id: Uuid, req: ListingUpdateRequest) -> AppResult<Option<Listing>>;
    // Compare-and-set: writes only while the stored status is still `expected`. `None` when
    // the listing is gone or its status has moved on.
    async fn set_listing_status(
        &self,
        id: Uuid,
        expected: ListingStatus,
        status: ListingStatus,
    ) -> AppResult<Option<Listing>>;
    async fn delete_listing(&self, id: Uuid) -> AppResult<bool>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// Maps constraint violations to client errors; everything else becomes `Internal`.
fn constraint_error(err: sqlx::Error, unique: AppError, foreign_key: AppError) -> AppError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => unique,
        Some(db) if db.is_foreign_key_violation() => foreign_key,
        _ => AppError::from(err),
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, surname, city, phone_number, role, created_at";

const LISTING_COLUMNS: &str = "id, title, description, price, currency, quantity, unit, city, \
     category_id, owner_id, status, created_at, updated_at";

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. Queries are built at runtime with `query_as` +
/// `bind`, so no database is needed at compile time.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Relies on the unique index on `users.email` rather than a read-then-insert check, so
    /// two concurrent registrations for one email cannot both succeed.
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, password_hash, name, surname, city, role, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.city)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(e, AppError::EmailTaken, AppError::internal("unexpected foreign key"))
        })
    }

    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $2, surname = $3, city = $4, phone_number = $5 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name.trim())
        .bind(&req.surname)
        .bind(&req.city)
        .bind(&req.phone_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// delete_user
    ///
    /// `listings.owner_id` is `ON DELETE CASCADE`.
    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(category)
    }

    async fn create_category(&self, req: CategoryRequest) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(req.name.trim())
        .bind(&req.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                AppError::BadRequest("category slug already exists".to_string()),
                AppError::internal("unexpected foreign key"),
            )
        })
    }

    async fn update_category(&self, id: i64, req: CategoryRequest) -> AppResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2, slug = $3 WHERE id = $1 RETURNING id, name, slug",
        )
        .bind(id)
        .bind(req.name.trim())
        .bind(&req.slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                AppError::BadRequest("category slug already exists".to_string()),
                AppError::internal("unexpected foreign key"),
            )
        })
    }

    async fn delete_category(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint_error(
                    e,
                    AppError::internal("unexpected unique violation"),
                    AppError::BadRequest("category is still used by listings".to_string()),
                )
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_listings(&self, status: Option<ListingStatus>) -> AppResult<Vec<Listing>> {
        // `$1 IS NULL` keeps a single statement for the filtered and unfiltered cases.
        let listings = sqlx::query_as::<_, Listing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings \
             WHERE ($1::listing_status IS NULL OR status = $1) ORDER BY created_at DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    async fn list_listings_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Listing>> {
        let listings = sqlx::query_as::<_, Listing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    async fn get_listing(&self, id: Uuid) -> AppResult<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(listing)
    }

    async fn create_listing(&self, owner_id: Uuid, req: ListingCreateRequest) -> AppResult<Listing> {
        sqlx::query_as::<_, Listing>(&format!(
            "INSERT INTO listings \
             (id, title, description, price, currency, quantity, unit, city, category_id, owner_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'PENDING', NOW()) \
             RETURNING {LISTING_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.title.trim())
        .bind(&req.description)
        .bind(req.price)
        .bind(req.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))
        .bind(req.quantity)
        .bind(req.unit.unwrap_or_default())
        .bind(req.city.trim())
        .bind(req.category_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                AppError::internal("unexpected unique violation"),
                AppError::BadRequest("unknown category".to_string()),
            )
        })
    }

    /// update_listing
    ///
    /// `COALESCE` keeps the stored value for every field the request leaves out.
    async fn update_listing(&self, id: Uuid, req: ListingUpdateRequest) -> AppResult<Option<Listing>> {
        sqlx::query_as::<_, Listing>(&format!(
            "UPDATE listings SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                price = COALESCE($4, price), \
                currency = COALESCE($5, currency), \
                quantity = COALESCE($6, quantity), \
                unit = COALESCE($7, unit), \
                city = COALESCE($8, city), \
                category_id = COALESCE($9, category_id), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {LISTING_COLUMNS}"
        ))
        .bind(id)
        .bind(req.title.as_deref().map(str::trim))
        .bind(&req.description)
        .bind(req.price)
        .bind(&req.currency)
        .bind(req.quantity)
        .bind(req.unit)
        .bind(req.city.as_deref().map(str::trim))
        .bind(req.category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            constraint_error(
                e,
                AppError::internal("unexpected unique violation"),
                AppError::BadRequest("unknown category".to_string()),
            )
        })
    }

    async fn set_listing_status(
        &self,
        id: Uuid,
        expected: ListingStatus,
        status: ListingStatus,
    ) -> AppResult<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>(&format!(
            "UPDATE listings SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3 RETURNING {LISTING_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;
        Ok(listing)
    }

    async fn delete_listing(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
struct MemoryTables {
    users: HashMap<Uuid, User>,
    categories: HashMap<i64, Category>,
    next_category_id: i64,
    listings: HashMap<Uuid, Listing>,
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory. Enforces the same constraints as the
/// Postgres schema (unique email and slug, category foreign key, owner cascade) so handler
/// and router tests exercise the real error paths without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<MemoryTables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated with the same categories the initial migration seeds.
    pub fn seeded() -> Self {
        let mut tables = MemoryTables::default();
        for (name, slug) in [
            ("Vegetables", "vegetables"),
            ("Fruits", "fruits"),
            ("Berries", "berries"),
            ("Dairy", "dairy"),
            ("Honey", "honey"),
        ] {
            tables.next_category_id += 1;
            let id = tables.next_category_id;
            tables.categories.insert(
                id,
                Category {
                    id,
                    name: name.to_string(),
                    slug: slug.to_string(),
                },
            );
        }
        Self {
            tables: RwLock::new(tables),
        }
    }
}

fn newest_first(mut listings: Vec<Listing>) -> Vec<Listing> {
    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    listings
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::EmailTaken);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            surname: user.surname,
            city: user.city,
            phone_number: None,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.name = req.name.trim().to_string();
            user.surname = req.surname;
            user.city = req.city;
            user.phone_number = req.phone_number;
            user.clone()
        }))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.users.remove(&id).is_some();
        if removed {
            tables.listings.retain(|_, listing| listing.owner_id != id);
        }
        Ok(removed)
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let mut categories: Vec<Category> =
            self.tables.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, req: CategoryRequest) -> AppResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.slug == req.slug) {
            return Err(AppError::BadRequest("category slug already exists".to_string()));
        }
        tables.next_category_id += 1;
        let category = Category {
            id: tables.next_category_id,
            name: req.name.trim().to_string(),
            slug: req.slug,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, req: CategoryRequest) -> AppResult<Option<Category>> {
        let mut tables = self.tables.write().await;
        if tables
            .categories
            .values()
            .any(|c| c.slug == req.slug && c.id != id)
        {
            return Err(AppError::BadRequest("category slug already exists".to_string()));
        }
        Ok(tables.categories.get_mut(&id).map(|category| {
            category.name = req.name.trim().to_string();
            category.slug = req.slug;
            category.clone()
        }))
    }

    async fn delete_category(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.listings.values().any(|l| l.category_id == id) {
            return Err(AppError::BadRequest(
                "category is still used by listings".to_string(),
            ));
        }
        Ok(tables.categories.remove(&id).is_some())
    }

    async fn list_listings(&self, status: Option<ListingStatus>) -> AppResult<Vec<Listing>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .listings
                .values()
                .filter(|l| status.is_none_or(|s| l.status == s))
                .cloned()
                .collect(),
        ))
    }

    async fn list_listings_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<Listing>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .listings
                .values()
                .filter(|l| l.owner_id == owner_id)
                .cloned()
                .collect(),
        ))
    }

    async fn get_listing(&self, id: Uuid) -> AppResult<Option<Listing>> {
        Ok(self.tables.read().await.listings.get(&id).cloned())
    }

    async fn create_listing(&self, owner_id: Uuid, req: ListingCreateRequest) -> AppResult<Listing> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&req.category_id) {
            return Err(AppError::BadRequest("unknown category".to_string()));
        }
        let listing = Listing {
            id: Uuid::new_v4(),
            title: req.title.trim().to_string(),
            description: req.description,
            price: req.price,
            currency: req.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            quantity: req.quantity,
            unit: req.unit.unwrap_or_default(),
            city: req.city.trim().to_string(),
            category_id: req.category_id,
            owner_id,
            status: ListingStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn update_listing(&self, id: Uuid, req: ListingUpdateRequest) -> AppResult<Option<Listing>> {
        let mut tables = self.tables.write().await;
        if req
            .category_id
            .is_some_and(|category_id| !tables.categories.contains_key(&category_id))
        {
            return Err(AppError::BadRequest("unknown category".to_string()));
        }
        Ok(tables.listings.get_mut(&id).map(|listing| {
            if let Some(title) = req.title {
                listing.title = title.trim().to_string();
            }
            if let Some(description) = req.description {
                listing.description = Some(description);
            }
            if let Some(price) = req.price {
                listing.price = price;
            }
            if let Some(currency) = req.currency {
                listing.currency = currency;
            }
            if let Some(quantity) = req.quantity {
                listing.quantity = Some(quantity);
            }
            if let Some(unit) = req.unit {
                listing.unit = unit;
            }
            if let Some(city) = req.city {
                listing.city = city.trim().to_string();
            }
            if let Some(category_id) = req.category_id {
                listing.category_id = category_id;
            }
            listing.updated_at = Some(Utc::now());
            listing.clone()
        }))
    }

    async fn set_listing_status(
        &self,
        id: Uuid,
        expected: ListingStatus,
        status: ListingStatus,
    ) -> AppResult<Option<Listing>> {
        let mut tables = self.tables.write().await;
        let current = tables.listings.get_mut(&id).filter(|l| l.status == expected);
        Ok(current.map(|listing| {
            listing.status = status;
            listing.updated_at = Some(Utc::now());
            listing.clone()
        }))
    }

    async fn delete_listing(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.write().await.listings.remove(&id).is_some())
    }
}
