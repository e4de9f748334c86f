//! Applies the membership transition rules to an open transaction.

use todoshare_core::model::{Access, AccessStatus, List, ListId, UserId, Visibility};
use todoshare_core::role::Role;
use todoshare_core::sharing::{self, AcceptOutcome, RevokeOutcome};
use todoshare_storage::Transaction;

use crate::error::ApiError;

/// Inserts the list, its owner row, and a pending row per shared user.
/// Each pending row carries the invitee's global role; those rows are returned.
/// Repeated ids in `shared_with` collapse to one invitation.
pub async fn create_list<T: Transaction>(
    tx: &mut T,
    list: &List,
    shared_with: &[UserId],
) -> Result<Vec<Access>, ApiError> {
    sharing::check_initial_share(list.visibility, shared_with)?;
    if shared_with.contains(&list.owner_id) {
        return Err(ApiError::BadRequest(
            "the owner cannot be shared with".to_string(),
        ));
    }
    let mut shared_with = shared_with.to_vec();
    shared_with.sort_unstable();
    shared_with.dedup();

    tx.create_list(list).await?;
    tx.create_access(&Access::owner(list.id, list.owner_id))
        .await?;

    let mut invited = Vec::with_capacity(shared_with.len());
    for user_id in &shared_with {
        let user = tx.get_user(user_id).await?.ok_or(ApiError::NotFound("user"))?;
        let existing = tx.get_access(&list.id, user_id).await?;
        let access = sharing::invite(list, existing.as_ref(), user.id, user.role)?;
        tx.create_access(&access).await?;
        invited.push(access);
    }
    Ok(invited)
}

/// `role` defaults to the invitee's global role.
pub async fn invite<T: Transaction>(
    tx: &mut T,
    list_id: &ListId,
    user_id: &UserId,
    role: Option<Role>,
) -> Result<Access, ApiError> {
    let list = tx.get_list(list_id).await?.ok_or(ApiError::NotFound("list"))?;
    let user = tx.get_user(user_id).await?.ok_or(ApiError::NotFound("user"))?;
    let existing = tx.get_access(list_id, user_id).await?;

    let role = role.unwrap_or(user.role);
    if !role.is_valid() {
        return Err(ApiError::BadRequest(format!("unknown role '{role}'")));
    }

    let access = sharing::invite(&list, existing.as_ref(), user.id, role)?;
    tx.create_access(&access).await?;
    Ok(access)
}

pub async fn accept<T: Transaction>(
    tx: &mut T,
    list_id: &ListId,
    user_id: &UserId,
) -> Result<(AcceptOutcome, Access), ApiError> {
    let existing = tx.get_access(list_id, user_id).await?;
    let outcome = sharing::accept(*list_id, *user_id, existing.as_ref())?;

    let mut access = existing.ok_or(ApiError::NotFound("access"))?;
    if outcome == AcceptOutcome::Accepted {
        tx.update_access_status(list_id, user_id, AccessStatus::Accepted)
            .await?;
        access.status = AccessStatus::Accepted;
    }
    Ok((outcome, access))
}

pub async fn revoke<T: Transaction>(
    tx: &mut T,
    list_id: &ListId,
    user_id: &UserId,
) -> Result<RevokeOutcome, ApiError> {
    let existing = tx.get_access(list_id, user_id).await?;
    let outcome = sharing::revoke(existing.as_ref())?;
    if outcome == RevokeOutcome::Delete {
        tx.delete_access(list_id, user_id).await?;
    }
    Ok(outcome)
}

/// Runs after a visibility change; returns how many rows were removed.
pub async fn apply_visibility<T: Transaction>(
    tx: &mut T,
    list_id: &ListId,
    visibility: Visibility,
) -> Result<u64, ApiError> {
    let statuses = sharing::statuses_revoked_by(visibility);
    if statuses.is_empty() {
        return Ok(0);
    }
    Ok(tx.delete_access_by_status(list_id, statuses).await?)
}
