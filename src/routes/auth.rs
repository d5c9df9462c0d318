use crate::{AppState, handlers::auth};
use axum::{
    Router,
    routing::{get, post},
};

/// Auth Router Module
///
/// Mounted at `/api/auth`. Register and login are public; `/me` needs a token.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /api/auth/register
        // Creates a USER account and returns a token for it.
        .route("/register", post(auth::register))
        // POST /api/auth/login
        // Throttled per email. Unknown email and wrong password look the same.
        .route("/login", post(auth::login))
        // GET /api/auth/me
        .route("/me", get(auth::me))
}
