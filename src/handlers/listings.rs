use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{MaybePrincipal, Principal, authorize_ownership, authorize_view},
    error::{AppError, AppResult, ErrorBody},
    models::{Listing, ListingCreateRequest, ListingStatus, ListingUpdateRequest},
    moderation::{self, ModerationAction},
    repository::Repository,
    validation,
};

const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// ListingFilter
///
/// Query parameters for `GET /api/listings`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingFilter {
    /// Admins only: include listings in every moderation state. Ignored for everyone else.
    pub all: Option<bool>,
}

/// Loads a listing or fails with 404. Every per-listing handler starts here, so existence is
/// always reported before permission.
pub(crate) async fn load_listing(repo: &dyn Repository, id: Uuid) -> AppResult<Listing> {
    repo.get_listing(id)
        .await?
        .ok_or(AppError::NotFound("listing"))
}

async fn ensure_category_exists(repo: &dyn Repository, category_id: i64) -> AppResult<()> {
    match repo.get_category(category_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::BadRequest(format!(
            "category {category_id} does not exist"
        ))),
    }
}

/// Applies a moderation action and persists the resulting status. A no-op transition
/// skips the write.
///
/// The write only lands if the status is still the one the transition was checked
/// against; when another request got there first, the action is re-evaluated on the
/// fresh record.
pub(crate) async fn apply_transition(
    repo: &dyn Repository,
    listing: &Listing,
    action: ModerationAction,
) -> AppResult<Listing> {
    let mut current = listing.clone();
    for _ in 0..MAX_TRANSITION_ATTEMPTS {
        let next = moderation::transition(current.status, action)?;
        if next == current.status {
            return Ok(current);
        }
        if let Some(updated) = repo.set_listing_status(current.id, current.status, next).await? {
            tracing::info!(
                listing_id = %current.id,
                action = action.as_str(),
                from = current.status.as_str(),
                to = next.as_str(),
                "listing status changed"
            );
            return Ok(updated);
        }
        tracing::debug!(listing_id = %current.id, "listing status changed concurrently, retrying");
        current = load_listing(repo, current.id).await?;
    }
    Err(AppError::InvalidTransition {
        action: action.as_str(),
        from: current.status.as_str(),
    })
}

/// list_listings
///
/// [Public Route] Lists approved listings, newest first.
/// An admin passing `all=true` sees listings in every state.
#[utoipa::path(
    get,
    path = "/api/listings",
    tag = "listings",
    params(ListingFilter),
    responses((status = 200, description = "Listings", body = [Listing]))
)]
pub async fn list_listings(
    principal: MaybePrincipal,
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> AppResult<Json<Vec<Listing>>> {
    let status = if filter.all.unwrap_or(false) && principal.is_admin() {
        None
    } else {
        Some(ListingStatus::Approved)
    };
    Ok(Json(state.repo.list_listings(status).await?))
}

/// get_listing
///
/// [Public Route] Single listing. Anything not yet approved is only shown to its owner or
/// an admin; everyone else gets 403.
#[utoipa::path(
    get,
    path = "/api/listings/{id}",
    tag = "listings",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing", body = Listing),
        (status = 403, description = "Not published", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_listing(
    principal: MaybePrincipal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Listing>> {
    let listing = load_listing(state.repo.as_ref(), id).await?;
    authorize_view(principal.as_ref(), listing.status, listing.owner_id)?;
    Ok(Json(listing))
}

/// my_listings
///
/// [Authenticated Route] The caller's own listings in every moderation state.
#[utoipa::path(
    get,
    path = "/api/listings/my-listings",
    tag = "listings",
    responses((status = 200, description = "My listings", body = [Listing]))
)]
pub async fn my_listings(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Listing>>> {
    Ok(Json(
        state.repo.list_listings_by_owner(principal.user_id).await?,
    ))
}

/// create_listing
///
/// [Authenticated Route] Submits a listing for moderation.
/// The owner is always the caller and the status always `PENDING`.
#[utoipa::path(
    post,
    path = "/api/listings",
    tag = "listings",
    request_body = ListingCreateRequest,
    responses(
        (status = 201, description = "Created", body = Listing),
        (status = 400, description = "Invalid payload or unknown category", body = ErrorBody)
    )
)]
pub async fn create_listing(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<ListingCreateRequest>,
) -> AppResult<(StatusCode, Json<Listing>)> {
    validation::validate_listing_create(&payload)?;
    ensure_category_exists(state.repo.as_ref(), payload.category_id).await?;

    let listing = state
        .repo
        .create_listing(principal.user_id, payload)
        .await?;
    tracing::info!(listing_id = %listing.id, owner_id = %principal.user_id, "listing created");
    Ok((StatusCode::CREATED, Json(listing)))
}

/// update_listing
///
/// [Authenticated Route] Partial update by the owner or an admin. Moderation status is
/// untouched.
#[utoipa::path(
    put,
    path = "/api/listings/{id}",
    tag = "listings",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body = ListingUpdateRequest,
    responses(
        (status = 200, description = "Updated", body = Listing),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_listing(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ListingUpdateRequest>,
) -> AppResult<Json<Listing>> {
    let listing = load_listing(state.repo.as_ref(), id).await?;
    authorize_ownership(&principal, listing.owner_id)?;
    validation::validate_listing_update(&payload)?;
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(state.repo.as_ref(), category_id).await?;
    }

    let updated = state
        .repo
        .update_listing(id, payload)
        .await?
        .ok_or(AppError::NotFound("listing"))?;
    Ok(Json(updated))
}

/// delete_listing
///
/// [Authenticated Route] Removes a listing. Owner or admin only.
#[utoipa::path(
    delete,
    path = "/api/listings/{id}",
    tag = "listings",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_listing(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let listing = load_listing(state.repo.as_ref(), id).await?;
    authorize_ownership(&principal, listing.owner_id)?;

    if !state.repo.delete_listing(id).await? {
        return Err(AppError::NotFound("listing"));
    }
    tracing::info!(listing_id = %id, deleted_by = %principal.user_id, "listing deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// republish_listing
///
/// [Authenticated Route] Sends a rejected listing back to the moderation queue.
/// Any other starting state is a 409.
#[utoipa::path(
    post,
    path = "/api/listings/{id}/republish",
    tag = "listings",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Back in the queue", body = Listing),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Listing is not rejected", body = ErrorBody)
    )
)]
pub async fn republish_listing(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Listing>> {
    let listing = load_listing(state.repo.as_ref(), id).await?;
    authorize_ownership(&principal, listing.owner_id)?;
    let updated =
        apply_transition(state.repo.as_ref(), &listing, ModerationAction::Republish).await?;
    Ok(Json(updated))
}

// --- Moderation (admin) ---

/// moderation_queue
///
/// [Admin Route] Listings waiting for a decision, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/listings",
    tag = "moderation",
    responses(
        (status = 200, description = "Pending listings", body = [Listing]),
        (status = 403, description = "Admin role required", body = ErrorBody)
    )
)]
pub async fn moderation_queue(State(state): State<AppState>) -> AppResult<Json<Vec<Listing>>> {
    Ok(Json(
        state
            .repo
            .list_listings(Some(ListingStatus::Pending))
            .await?,
    ))
}

/// approve_listing
///
/// [Admin Route] Publishes a listing. Approving an approved listing is a no-op.
#[utoipa::path(
    post,
    path = "/api/admin/listings/{id}/approve",
    tag = "moderation",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 204, description = "Approved"),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Listing was rejected", body = ErrorBody)
    )
)]
pub async fn approve_listing(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let listing = load_listing(state.repo.as_ref(), id).await?;
    apply_transition(state.repo.as_ref(), &listing, ModerationAction::Approve).await?;
    tracing::debug!(listing_id = %id, admin_id = %principal.user_id, "approve handled");
    Ok(StatusCode::NO_CONTENT)
}

/// reject_listing
///
/// [Admin Route] Rejects a pending listing or takes down an approved one.
#[utoipa::path(
    post,
    path = "/api/admin/listings/{id}/reject",
    tag = "moderation",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 204, description = "Rejected"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn reject_listing(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let listing = load_listing(state.repo.as_ref(), id).await?;
    apply_transition(state.repo.as_ref(), &listing, ModerationAction::Reject).await?;
    tracing::debug!(listing_id = %id, admin_id = %principal.user_id, "reject handled");
    Ok(StatusCode::NO_CONTENT)
}
