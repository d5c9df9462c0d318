use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::Principal,
    error::{AppError, AppResult, ErrorBody},
    models::{Role, UpdateProfileRequest, UserProfile},
    validation,
};

/// get_profile
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "users",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_profile(principal: Principal) -> Json<UserProfile> {
    Json(UserProfile::from(principal.user))
}

/// update_profile
///
/// [Authenticated Route] Updates the caller's own profile. Email and role cannot be
/// changed here.
#[utoipa::path(
    put,
    path = "/api/users/profile",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn update_profile(
    principal: Principal,
    State(state): State<AppState>,
    Json(mut payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    validation::validate_profile(&payload)?;
    payload.name = payload.name.trim().to_string();
    payload.surname = validation::trim_optional(payload.surname);
    payload.city = validation::trim_optional(payload.city);
    payload.phone_number = validation::trim_optional(payload.phone_number);
    let user = state
        .repo
        .update_profile(principal.user_id, payload)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(Json(UserProfile::from(user)))
}

/// get_user
///
/// [Authenticated Route] Another user's profile, e.g. a listing's seller.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserProfile>> {
    state
        .repo
        .get_user(id)
        .await?
        .map(|user| Json(UserProfile::from(user)))
        .ok_or(AppError::NotFound("user"))
}

/// list_users
///
/// [Admin Route]
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = [UserProfile]),
        (status = 403, description = "Admin role required", body = ErrorBody)
    )
)]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserProfile>>> {
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// delete_user
///
/// [Admin Route] Deletes a user account together with its listings.
/// Admins cannot delete themselves or other admins.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Target is an admin", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_user(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let target = state
        .repo
        .get_user(id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    if target.id == principal.user_id {
        return Err(AppError::Forbidden("admins cannot delete their own account"));
    }
    if matches!(target.role, Role::Admin) {
        return Err(AppError::Forbidden("admin accounts cannot be deleted"));
    }

    if !state.repo.delete_user(id).await? {
        return Err(AppError::NotFound("user"));
    }
    tracing::info!(user_id = %id, deleted_by = %principal.user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
