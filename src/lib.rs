use std::sync::Arc;

use axum::{Router, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Security core: tokens, throttle, principal resolution, access policy.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod moderation;
pub mod repository;
pub mod validation;

// Routers, one per resource.
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

use auth::{
    AccessPolicy, Argon2Hasher, ClockState, HasherState, LoginThrottle, SystemClock, TokenService,
};

/// ApiDoc
///
/// OpenAPI document for every handler decorated with `#[utoipa::path]`.
/// Served at `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::register, handlers::auth::login, handlers::auth::me,
        handlers::listings::list_listings, handlers::listings::get_listing,
        handlers::listings::my_listings, handlers::listings::create_listing,
        handlers::listings::update_listing, handlers::listings::delete_listing,
        handlers::listings::republish_listing, handlers::listings::moderation_queue,
        handlers::listings::approve_listing, handlers::listings::reject_listing,
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::create_category, handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::users::get_profile, handlers::users::update_profile,
        handlers::users::get_user, handlers::users::list_users, handlers::users::delete_user,
    ),
    components(
        schemas(
            models::Role, models::ListingStatus, models::ListingUnit,
            models::Listing, models::Category, models::RegisterRequest, models::LoginRequest,
            models::ListingCreateRequest, models::ListingUpdateRequest, models::CategoryRequest,
            models::UpdateProfileRequest, models::AuthResponse, models::UserProfile,
            error::ErrorBody,
        )
    ),
    tags(
        (name = "kazenites", description = "Kazenites produce marketplace API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, cloneable container of shared services handed to every request.
/// Everything inside is either immutable or internally synchronized.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Token issuing and verification.
    pub tokens: Arc<TokenService>,
    /// Failed-login accounting. Process-wide, so it must be shared, never per-request.
    pub throttle: Arc<LoginThrottle>,
    /// Route table consulted by the principal-resolving middleware.
    pub policy: Arc<AccessPolicy>,
    pub hasher: HasherState,
}

impl AppState {
    /// Production wiring: system clock and default Argon2 cost.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self::with_clock(
            repo,
            config,
            Arc::new(SystemClock),
            Arc::new(Argon2Hasher::default()),
        )
    }

    /// Wiring with an explicit clock and hasher, so tests can move time and hash cheaply.
    pub fn with_clock(
        repo: RepositoryState,
        config: AppConfig,
        clock: ClockState,
        hasher: HasherState,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_minutes, clock.clone());
        let throttle =
            LoginThrottle::new(config.max_login_failures, config.lockout_minutes, clock);

        Self {
            repo,
            config,
            tokens: Arc::new(tokens),
            throttle: Arc::new(throttle),
            policy: Arc::new(AccessPolicy::marketplace()),
            hasher,
        }
    }
}

/// create_router
///
/// Assembles routing, the access-control middleware and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Routes. Access control is a single layer over everything, including the docs and
    // unmatched paths, driven by `AccessPolicy::marketplace()`.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", routes::api_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::principal::resolve_principal,
        ))
        .with_state(state);

    // 3. Observability and correlation (outermost, so rejected requests are traced too).
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` set above, so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
