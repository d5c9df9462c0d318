use crate::{AppState, handlers::categories};
use axum::{Router, routing::get};

/// Category Router Module
///
/// Mounted at `/api/categories`. GET is public; every other method requires ADMIN.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
}
