use crate::{AppState, handlers::listings};
use axum::{
    Router,
    routing::{get, post},
};

/// Listing Router Module
///
/// Mounted at `/api/listings`.
///
/// Reads are public, but a listing that is not APPROVED is only returned to its owner or an
/// admin (checked in the handler). All writes need a token, and per-listing writes are
/// additionally owner-or-admin.
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        // GET /api/listings?all=true
        // Approved listings; admins may ask for everything.
        // POST /api/listings
        // New listings always start PENDING.
        .route(
            "/",
            get(listings::list_listings).post(listings::create_listing),
        )
        // GET /api/listings/my-listings
        // Static segment, so it wins over `/{id}`.
        .route("/my-listings", get(listings::my_listings))
        .route(
            "/{id}",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        // POST /api/listings/{id}/republish
        // REJECTED -> PENDING only.
        .route("/{id}/republish", post(listings::republish_listing))
}
