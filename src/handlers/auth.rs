use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{Principal, normalize_identifier},
    error::{AppError, AppResult, ErrorBody},
    models::{AuthResponse, LoginRequest, NewUser, RegisterRequest, Role},
    validation,
};

/// register
///
/// [Public Route] Creates a `USER` account and signs the caller in.
///
/// The email is normalized before the uniqueness check, so `Anna@X.com` and `anna@x.com`
/// are the same account. Hashing runs on the blocking pool.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = AuthResponse),
        (status = 400, description = "Validation failed or email in use", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    validation::validate_register(&payload)?;

    let email = normalize_identifier(&payload.email);
    let hasher = state.hasher.clone();
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

    let user = state
        .repo
        .create_user(NewUser {
            email,
            password_hash,
            name: payload.name.trim().to_string(),
            surname: validation::trim_optional(payload.surname),
            city: validation::trim_optional(payload.city),
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");

    let token = state.tokens.issue(user.id, &user.email, user.role)?;
    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

/// login
///
/// [Public Route] Exchanges credentials for a signed token.
///
/// Unknown email and wrong password produce the same 401, and both pay for one hash
/// verification. The throttle guard is taken before anything else: every exit other than
/// a verified password counts as a failure, including storage and hashing errors.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 429, description = "Too many failed attempts", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_identifier(&payload.email);
    let attempt = state.throttle.begin(&email)?;

    let Some(user) = state.repo.find_user_by_email(&email).await? else {
        let hasher = state.hasher.clone();
        let password = payload.password;
        tokio::task::spawn_blocking(move || hasher.verify_decoy(&password)).await??;
        tracing::info!(identifier = %email, "login failed: unknown account");
        return Err(AppError::InvalidCredentials);
    };

    let hasher = state.hasher.clone();
    let password = payload.password;
    let stored_hash = user.password_hash.clone();
    let verified =
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash)).await??;

    if !verified {
        tracing::info!(identifier = %email, "login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    attempt.succeed();
    tracing::info!(user_id = %user.id, "login succeeded");

    let token = state.tokens.issue(user.id, &user.email, user.role)?;
    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

/// me
///
/// [Authenticated Route] Returns the caller's identity. `token` is always empty.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current identity", body = AuthResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn me(principal: Principal) -> Json<AuthResponse> {
    Json(AuthResponse {
        token: String::new(),
        user_id: principal.user_id,
        email: principal.user.email,
        role: principal.role,
    })
}
