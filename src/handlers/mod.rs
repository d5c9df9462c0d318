//! HTTP handlers, grouped by resource.
//!
//! Route-level access (public / authenticated / admin) is already enforced by
//! `auth::principal::resolve_principal` before any handler runs. Handlers only add the
//! resource-level checks: existence first, then ownership.

pub mod auth;
pub mod categories;
pub mod listings;
pub mod users;

/// health
///
/// [Public Route] Liveness probe for load balancers.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
