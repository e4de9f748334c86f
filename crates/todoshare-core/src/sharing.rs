//! Transition rules for list memberships.
//!
//! ```text
//!   (none) --invite--> pending --accept--> accepted
//!      ^                  |                   |
//!      +----revoke--------+-------revoke------+
//!   owner: created with the list, removed only with it
//! ```
//!
//! These functions only decide; applying the outcome to storage is the
//! caller's job, inside the same transaction that read `existing`.

use crate::model::{Access, AccessStatus, List, ListId, UserId, Visibility};
use crate::role::Role;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SharingError {
    #[error("list {0} is private and cannot be shared")]
    IncompatibleVisibility(String),

    #[error("user {user_id} already has access to list {list_id}")]
    Conflict { list_id: String, user_id: String },

    #[error("no access record for user {user_id} on list {list_id}")]
    NotFound { list_id: String, user_id: String },

    #[error("the owner's access to list {0} cannot be revoked")]
    Forbidden(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accepted,
    /// The row was already accepted, or belongs to the owner.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Delete,
    Unchanged,
}

/// Validates the sharing state of a list about to be created.
pub fn check_initial_share(
    visibility: Visibility,
    shared_with: &[UserId],
) -> Result<(), SharingError> {
    if visibility == Visibility::Private && !shared_with.is_empty() {
        return Err(SharingError::IncompatibleVisibility("new list".to_string()));
    }
    Ok(())
}

pub fn invite(
    list: &List,
    existing: Option<&Access>,
    user_id: UserId,
    role: Role,
) -> Result<Access, SharingError> {
    if list.visibility == Visibility::Private {
        return Err(SharingError::IncompatibleVisibility(list.id.to_string()));
    }
    if existing.is_some() {
        return Err(SharingError::Conflict {
            list_id: list.id.to_string(),
            user_id: user_id.to_string(),
        });
    }
    Ok(Access::pending(list.id, user_id, role))
}

pub fn accept(
    list_id: ListId,
    user_id: UserId,
    existing: Option<&Access>,
) -> Result<AcceptOutcome, SharingError> {
    match existing {
        None => Err(SharingError::NotFound {
            list_id: list_id.to_string(),
            user_id: user_id.to_string(),
        }),
        Some(access) => match access.status {
            AccessStatus::Pending => Ok(AcceptOutcome::Accepted),
            AccessStatus::Accepted | AccessStatus::Owner => Ok(AcceptOutcome::Unchanged),
        },
    }
}

pub fn revoke(existing: Option<&Access>) -> Result<RevokeOutcome, SharingError> {
    match existing {
        None => Ok(RevokeOutcome::Unchanged),
        Some(access) if access.is_owner() => {
            Err(SharingError::Forbidden(access.list_id.to_string()))
        }
        Some(_) => Ok(RevokeOutcome::Delete),
    }
}

/// Statuses to delete when a list's visibility is set to `visibility`.
/// Re-applying private is harmless: there is nothing left to delete.
pub fn statuses_revoked_by(visibility: Visibility) -> &'static [AccessStatus] {
    if visibility == Visibility::Private {
        &AccessStatus::REVOCABLE
    } else {
        &[]
    }
}
