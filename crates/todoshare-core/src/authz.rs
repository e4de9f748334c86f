//! Decides whether a caller may perform an operation on a list or todo.
//!
//! The decision runs in four steps: the global role gate, the admin
//! bypass, then a scope-specific membership check. Lookups go through an
//! [`AccessSource`], which the server backs with the request's open
//! transaction so the decision and the mutation see the same state.

use std::fmt;
use std::future::Future;

use crate::claims::Claims;
use crate::model::{AccessStatus, ListId, TodoId, UserId};
use crate::role::Role;

/// How far beyond the role gate a check must go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    NoRestriction,
    IsOwner,
    ListAccess,
    TodoAccess,
}

/// The resource an operation targets, as far as the request identifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    None,
    List(ListId),
    /// A list that does not exist yet; ownership comes from the request body.
    NewList { owner_id: UserId },
    Todo(TodoId),
    /// A todo about to be created in the given list.
    TodoInList(ListId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InsufficientRole,
    NotOwner,
    NoAccess,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenyReason::InsufficientRole => "insufficient role",
            DenyReason::NotOwner => "not the list owner",
            DenyReason::NoAccess => "no access to this resource",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("scope {scope:?} cannot be checked against {resource:?}")]
    ResourceMismatch { scope: Scope, resource: ResourceRef },

    #[error("access lookup failed: {0}")]
    Source(String),
}

/// Read-only lookups the resolver needs.
pub trait AccessSource: Send {
    fn list_owner(
        &mut self,
        list_id: &ListId,
    ) -> impl Future<Output = Result<Option<UserId>, AuthzError>> + Send;

    fn todo_list(
        &mut self,
        todo_id: &TodoId,
    ) -> impl Future<Output = Result<Option<ListId>, AuthzError>> + Send;

    /// Lists the user holds a row in with any of `statuses`, in one lookup.
    fn lists_with_status(
        &mut self,
        user_id: &UserId,
        statuses: &[AccessStatus],
    ) -> impl Future<Output = Result<Vec<ListId>, AuthzError>> + Send;
}

pub async fn authorize<S: AccessSource>(
    source: &mut S,
    claims: &Claims,
    resource: &ResourceRef,
    required: &Role,
    scope: Scope,
) -> Result<Decision, AuthzError> {
    if !claims.role.satisfies(required) {
        return Ok(Decision::Deny(DenyReason::InsufficientRole));
    }

    if claims.is_admin() {
        return Ok(Decision::Allow);
    }

    match scope {
        Scope::NoRestriction => Ok(Decision::Allow),
        Scope::IsOwner => check_owner(source, claims, resource).await,
        Scope::ListAccess => {
            let ResourceRef::List(list_id) = resource else {
                return Err(mismatch(scope, resource));
            };
            check_membership(source, &claims.user_id, list_id, &AccessStatus::LIST_VISIBLE).await
        }
        Scope::TodoAccess => {
            let list_id = match resource {
                ResourceRef::TodoInList(list_id) => *list_id,
                ResourceRef::Todo(todo_id) => match source.todo_list(todo_id).await? {
                    Some(list_id) => list_id,
                    None => return Ok(Decision::Deny(DenyReason::NoAccess)),
                },
                _ => return Err(mismatch(scope, resource)),
            };
            check_membership(source, &claims.user_id, &list_id, &AccessStatus::TODO_VISIBLE).await
        }
    }
}

async fn check_owner<S: AccessSource>(
    source: &mut S,
    claims: &Claims,
    resource: &ResourceRef,
) -> Result<Decision, AuthzError> {
    let owner_id = match resource {
        ResourceRef::List(list_id) => source.list_owner(list_id).await?,
        ResourceRef::NewList { owner_id } => Some(*owner_id),
        _ => return Err(mismatch(Scope::IsOwner, resource)),
    };

    if owner_id == Some(claims.user_id) {
        Ok(Decision::Allow)
    } else {
        Ok(Decision::Deny(DenyReason::NotOwner))
    }
}

async fn check_membership<S: AccessSource>(
    source: &mut S,
    user_id: &UserId,
    list_id: &ListId,
    statuses: &[AccessStatus],
) -> Result<Decision, AuthzError> {
    let visible = source.lists_with_status(user_id, statuses).await?;
    if visible.contains(list_id) {
        Ok(Decision::Allow)
    } else {
        Ok(Decision::Deny(DenyReason::NoAccess))
    }
}

fn mismatch(scope: Scope, resource: &ResourceRef) -> AuthzError {
    AuthzError::ResourceMismatch {
        scope,
        resource: resource.clone(),
    }
}
