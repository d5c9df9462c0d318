use axum::http::Method;
use uuid::Uuid;

use super::principal::Principal;
use crate::{
    error::AppError,
    models::{ListingStatus, Role},
};

/// Access
///
/// What a route demands from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, with or without a principal.
    Public,
    /// Any authenticated principal.
    Authenticated,
    /// A principal holding at least this role.
    Role(Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `{name}`: exactly one path segment.
    Param,
    /// `**`: zero or more trailing segments.
    Rest,
}

/// RouteRule
///
/// One row of the route table: an optional method (None = any method), a path pattern and
/// the access it requires.
#[derive(Debug, Clone)]
pub struct RouteRule {
    method: Option<Method>,
    segments: Vec<Segment>,
    access: Access,
}

impl RouteRule {
    pub fn new(method: Option<Method>, pattern: &str, access: Access) -> Self {
        let segments = path_segments(pattern)
            .map(|segment| match segment {
                "**" => Segment::Rest,
                s if s.starts_with('{') && s.ends_with('}') => Segment::Param,
                s => Segment::Literal(s.to_string()),
            })
            .collect();

        Self {
            method,
            segments,
            access,
        }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        if self.method.as_ref().is_some_and(|m| m != method) {
            return false;
        }

        let mut path = path_segments(path);
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Param => {
                    if path.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(expected) => {
                    if path.next() != Some(expected.as_str()) {
                        return false;
                    }
                }
            }
        }
        path.next().is_none()
    }

    /// Higher sorts first: more literal segments, then no `**` tail, then more params,
    /// then a concrete method over "any method".
    fn specificity(&self) -> (usize, bool, usize, bool) {
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        let params = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Param))
            .count();
        let has_rest = self.segments.iter().any(|s| matches!(s, Segment::Rest));
        (literals, !has_rest, params, self.method.is_some())
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

pub fn get(pattern: &str, access: Access) -> RouteRule {
    RouteRule::new(Some(Method::GET), pattern, access)
}

pub fn post(pattern: &str, access: Access) -> RouteRule {
    RouteRule::new(Some(Method::POST), pattern, access)
}

pub fn put(pattern: &str, access: Access) -> RouteRule {
    RouteRule::new(Some(Method::PUT), pattern, access)
}

pub fn delete(pattern: &str, access: Access) -> RouteRule {
    RouteRule::new(Some(Method::DELETE), pattern, access)
}

pub fn any(pattern: &str, access: Access) -> RouteRule {
    RouteRule::new(None, pattern, access)
}

/// AccessPolicy
///
/// The static route table. Rules are evaluated most-specific first; a request that matches
/// no rule requires authentication.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<RouteRule>,
}

impl AccessPolicy {
    pub fn new(mut rules: Vec<RouteRule>) -> Self {
        // Stable sort: among equally specific rules the declaration order wins.
        rules.sort_by(|a, b| b.specificity().cmp(&a.specificity()));
        Self { rules }
    }

    /// The marketplace's route table.
    pub fn marketplace() -> Self {
        let admin = Access::Role(Role::Admin);

        Self::new(vec![
            get("/api/health", Access::Public),
            // Docs
            any("/swagger-ui/**", Access::Public),
            any("/api-docs/**", Access::Public),
            // Auth
            get("/api/auth/me", Access::Authenticated),
            any("/api/auth/**", Access::Public),
            // Catalog
            get("/api/categories/**", Access::Public),
            any("/api/categories/**", admin),
            // Listings
            get("/api/listings/my-listings", Access::Authenticated),
            get("/api/listings/**", Access::Public),
            post("/api/listings/**", Access::Authenticated),
            put("/api/listings/**", Access::Authenticated),
            delete("/api/listings/**", Access::Authenticated),
            // Users
            any("/api/users/**", Access::Authenticated),
            // Admin
            any("/api/admin/**", admin),
        ])
    }

    /// requirement
    ///
    /// The access required for `method path`. Unmatched requests are `Authenticated`.
    pub fn requirement(&self, method: &Method, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map_or(Access::Authenticated, |rule| rule.access)
    }

    /// authorize_route
    ///
    /// `Unauthorized` when the route needs a principal and there is none; `Forbidden` when
    /// the principal's role is insufficient.
    pub fn authorize_route(
        &self,
        principal: Option<&Principal>,
        method: &Method,
        path: &str,
    ) -> Result<(), AppError> {
        check_access(self.requirement(method, path), principal)
    }
}

/// Evaluates a single access requirement against an optional principal.
pub fn check_access(access: Access, principal: Option<&Principal>) -> Result<(), AppError> {
    match (access, principal) {
        (Access::Public, _) => Ok(()),
        (_, None) => Err(AppError::Unauthorized),
        (Access::Authenticated, Some(_)) => Ok(()),
        (Access::Role(required), Some(principal)) => require_role(principal, required),
    }
}

/// Admin satisfies every role requirement; User satisfies only User.
pub fn require_role(principal: &Principal, required: Role) -> Result<(), AppError> {
    match (required, principal.role) {
        (Role::User, _) | (Role::Admin, Role::Admin) => Ok(()),
        (Role::Admin, Role::User) => {
            tracing::info!(user_id = %principal.user_id, "forbidden: admin role required");
            Err(AppError::Forbidden("admin role required"))
        }
    }
}

/// authorize_ownership
///
/// Succeeds iff the principal is an admin or owns the resource. Callers must have already
/// established that the resource exists (NotFound is reported before Forbidden).
pub fn authorize_ownership(principal: &Principal, resource_owner_id: Uuid) -> Result<(), AppError> {
    match principal.role {
        Role::Admin => Ok(()),
        Role::User if principal.user_id == resource_owner_id => Ok(()),
        Role::User => {
            tracing::info!(
                user_id = %principal.user_id,
                owner_id = %resource_owner_id,
                "forbidden: not the resource owner"
            );
            Err(AppError::Forbidden("not allowed to modify this resource"))
        }
    }
}

/// authorize_view
///
/// Approved listings are readable by anyone; any other status only by the owner or an admin.
pub fn authorize_view(
    principal: Option<&Principal>,
    status: ListingStatus,
    resource_owner_id: Uuid,
) -> Result<(), AppError> {
    if crate::moderation::is_publicly_visible(status) {
        return Ok(());
    }
    match principal {
        Some(principal) => authorize_ownership(principal, resource_owner_id)
            .map_err(|_| AppError::Forbidden("listing is not published")),
        None => Err(AppError::Forbidden("listing is not published")),
    }
}
