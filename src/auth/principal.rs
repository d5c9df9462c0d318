use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{HeaderMap, Method, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::policy::{Access, check_access};
use crate::{
    AppState,
    error::AppError,
    models::{Role, User},
};

/// Principal
///
/// The resolved identity of the in-flight request. Built once by `resolve_principal` and
/// handed to handlers through the `Principal` / `MaybePrincipal` extractors; it never
/// outlives the request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    /// The stored account record at resolution time.
    pub user: User,
}

impl Principal {
    pub fn from_user(user: User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            user,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// MaybePrincipal
///
/// Optional principal for routes that also serve anonymous callers.
#[derive(Debug, Clone, Default)]
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
    pub fn as_ref(&self) -> Option<&Principal> {
        self.0.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(Principal::is_admin)
    }
}

/// Request extension inserted by the middleware. `None` means anonymous.
#[derive(Debug, Clone)]
struct ResolvedPrincipal(Option<Principal>);

/// Extracts the token from an `Authorization: Bearer <token>` header.
/// Any other scheme is treated as no token at all.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

/// resolve_principal
///
/// Request-entry middleware applied to the whole router.
///
/// 1. Looks up the route's access requirement in the `AccessPolicy`.
/// 2. Public routes: no token means anonymous; a valid token still yields a principal;
///    an unusable (expired, forged, malformed) token is ignored and the caller is anonymous.
/// 3. Protected routes: a missing token is 401 `Unauthorized`, an unusable one is 401
///    `InvalidToken`, an insufficient role is 403. The handler is never reached.
pub async fn resolve_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    // Nested routers see a stripped URI; the route table is written against full paths.
    let path = match request.extensions().get::<OriginalUri>() {
        Some(OriginalUri(uri)) => uri.path().to_owned(),
        None => request.uri().path().to_owned(),
    };
    let token = bearer_token(request.headers()).map(str::to_owned);

    match authenticate_request(&state, &method, &path, token.as_deref()).await {
        Ok(principal) => {
            request
                .extensions_mut()
                .insert(ResolvedPrincipal(principal));
            next.run(request).await
        }
        Err(error) => error.into_response(),
    }
}

/// The middleware's decision, separated from axum plumbing. `token` is the raw bearer
/// token, if any.
pub async fn authenticate_request(
    state: &AppState,
    method: &Method,
    path: &str,
    token: Option<&str>,
) -> Result<Option<Principal>, AppError> {
    let access = state.policy.requirement(method, path);

    let principal = match (access, token) {
        (_, None) => None,
        (Access::Public, Some(token)) => match principal_from_token(state, token).await {
            Ok(principal) => Some(principal),
            // Stale or broken client state must not break anonymous browsing.
            Err(AppError::InvalidToken) => {
                tracing::debug!(%method, path, "ignoring unusable token on public route");
                None
            }
            Err(other) => return Err(other),
        },
        (_, Some(token)) => Some(principal_from_token(state, token).await.inspect_err(|_| {
            tracing::debug!(%method, path, "token rejected on protected route");
        })?),
    };

    check_access(access, principal.as_ref())?;
    Ok(principal)
}

/// Verifies the token and loads the current account record. A token whose subject no
/// longer exists is as good as an invalid one.
async fn principal_from_token(state: &AppState, token: &str) -> Result<Principal, AppError> {
    let identity = state.tokens.verify(token)?;
    let user = state
        .repo
        .get_user(identity.subject_id)
        .await?
        .ok_or(AppError::InvalidToken)?;
    Ok(Principal::from_user(user))
}

/// Handlers that take `Principal` are only reachable with a resolved principal; if the
/// middleware let an anonymous request through, extraction fails with 401.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ResolvedPrincipal>()
            .and_then(|resolved| resolved.0.clone())
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(
            parts
                .extensions
                .get::<ResolvedPrincipal>()
                .and_then(|resolved| resolved.0.clone()),
        ))
    }
}
