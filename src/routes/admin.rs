use crate::{
    AppState,
    handlers::{listings, users},
};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// Mounted at `/api/admin`. The whole prefix is ADMIN-only in the route table, so handlers
/// here never re-check the role.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/listings
        // The moderation queue (PENDING, newest first).
        .route("/listings", get(listings::moderation_queue))
        // POST /api/admin/listings/{id}/approve
        // PENDING -> APPROVED. Repeating it is a no-op; a REJECTED listing must be
        // republished by its owner first.
        .route("/listings/{id}/approve", post(listings::approve_listing))
        // POST /api/admin/listings/{id}/reject
        // PENDING or APPROVED -> REJECTED (the latter is a takedown).
        .route("/listings/{id}/reject", post(listings::reject_listing))
        // GET /api/admin/users
        .route("/users", get(users::list_users))
        // DELETE /api/admin/users/{id}
        // Refuses to delete the caller or another admin.
        .route("/users/{id}", delete(users::delete_user))
}
