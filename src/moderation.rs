//! Listing moderation lifecycle.
//!
//! ```text
//! PENDING --approve--> APPROVED --reject--> REJECTED --republish--> PENDING
//!    \------------------reject-----------------^
//! ```
//!
//! `approve` and `reject` are admin actions, `republish` is the owner's. The caller is
//! responsible for the role/ownership check; this module only knows which moves are legal.

use crate::{error::AppError, models::ListingStatus};

/// ModerationAction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
    Republish,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Republish => "republish",
        }
    }
}

/// Returns the status a listing moves to, or `InvalidTransition` when the action is not
/// allowed from `from`. Repeating an admin decision is a no-op rather than an error.
pub fn transition(from: ListingStatus, action: ModerationAction) -> Result<ListingStatus, AppError> {
    use ListingStatus::*;
    use ModerationAction::*;

    match (from, action) {
        (Pending, Approve) | (Approved, Approve) => Ok(Approved),
        (Pending, Reject) | (Approved, Reject) | (Rejected, Reject) => Ok(Rejected),
        (Rejected, Republish) => Ok(Pending),
        (from, action) => Err(AppError::InvalidTransition {
            action: action.as_str(),
            from: from.as_str(),
        }),
    }
}

/// Anyone may read an approved listing. Other states are only for the owner or an admin,
/// which the caller checks separately.
pub fn is_publicly_visible(status: ListingStatus) -> bool {
    matches!(status, ListingStatus::Approved)
}
