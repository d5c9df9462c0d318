use crate::{AppState, handlers::users};
use axum::{Router, routing::get};

/// User Router Module
///
/// Mounted at `/api/users`. Authenticated only.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        // GET/PUT /api/users/profile
        // Always the caller's own record.
        .route(
            "/profile",
            get(users::get_profile).put(users::update_profile),
        )
        // GET /api/users/{id}
        .route("/{id}", get(users::get_user))
}
