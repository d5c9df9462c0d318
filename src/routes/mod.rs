/// Router Module Index
///
/// One router per resource, all nested under `/api`. None of these routers carries its own
/// auth layer: access is decided once, for the whole application, by the route table in
/// `auth::policy` (applied in `create_router`). A route missing from that table falls back
/// to "authenticated".
use crate::AppState;
use axum::Router;

/// Register, login and "who am I".
pub mod auth;

/// Produce listings and the owner's republish action.
pub mod listings;

/// Category catalog. Reads are public, writes are admin-only.
pub mod categories;

/// Profiles.
pub mod users;

/// Moderation queue and user administration.
pub mod admin;

/// api_routes
///
/// Everything served under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", axum::routing::get(crate::handlers::health))
        .nest("/auth", auth::auth_routes())
        .nest("/listings", listings::listing_routes())
        .nest("/categories", categories::category_routes())
        .nest("/users", users::user_routes())
        .nest("/admin", admin::admin_routes())
}
