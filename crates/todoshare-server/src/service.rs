use std::sync::Arc;

use chrono::{DateTime, Utc};

use todoshare_core::authz::{ResourceRef, Scope};
use todoshare_core::claims::Claims;
use todoshare_core::model::{
    Access, AccessStatus, List, ListId, Priority, Todo, TodoId, User, UserId, Visibility,
};
use todoshare_core::role::Role;
use todoshare_core::sharing::{AcceptOutcome, RevokeOutcome};
use todoshare_storage::{AccessStore, Database, ListStore, TodoStore, Transaction, UserStore};

use crate::audit;
use crate::coordinator::{Authorized, RequestScope};
use crate::error::ApiError;
use crate::sharing;

#[derive(Debug, Clone, Default)]
pub struct NewList {
    pub name: String,
    pub description: String,
    /// Defaults to the caller. Only admins may create lists for someone else.
    pub owner_id: Option<UserId>,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub shared_with: Vec<UserId>,
}

#[derive(Debug, Clone, Default)]
pub struct ListPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub assigned_to: Option<UserId>,
}

#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub completed: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub github_id: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub github_id: Option<String>,
}

pub struct TodoService<D: Database> {
    db: Arc<D>,
}

impl<D: Database> Clone for TodoService<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

impl<D: Database> TodoService<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self { db }
    }

    async fn authorized(
        &self,
        operation: &'static str,
        claims: &Claims,
        resource: ResourceRef,
        required: Role,
        scope: Scope,
    ) -> Result<Authorized<D::Tx>, ApiError> {
        RequestScope::begin(&*self.db, operation)
            .await?
            .authorize(claims, &resource, required, scope)
            .await
    }

    /// Opens and rolls back a transaction to prove the backend is reachable.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let tx = self.db.begin().await?;
        tx.rollback().await?;
        Ok(())
    }

    // ---- lists ----

    pub async fn create_list(&self, claims: &Claims, input: NewList) -> Result<List, ApiError> {
        let NewList {
            name,
            description,
            owner_id,
            visibility,
            tags,
            shared_with,
        } = input;
        let owner_id = owner_id.unwrap_or(claims.user_id);
        let mut scope = self
            .authorized(
                "create_list",
                claims,
                ResourceRef::NewList { owner_id },
                Role::Writer,
                Scope::IsOwner,
            )
            .await?;

        let result: Result<_, ApiError> = async {
            require_non_empty("name", &name)?;
            let now = Utc::now();
            let list = List {
                id: ListId::generate(),
                name,
                description,
                owner_id,
                visibility,
                tags,
                created_at: now,
                updated_at: now,
            };
            let invited = sharing::create_list(scope.tx(), &list, &shared_with).await?;
            Ok((list, invited))
        }
        .await;
        let (list, invited) = scope.finish(result).await?;

        for access in &invited {
            audit::audit_access_invited(&list.id, &access.user_id, &claims.user_id, &access.role);
        }
        tracing::info!(list_id = %list.id, owner_id = %list.owner_id, "list created");
        Ok(list)
    }

    pub async fn get_list(&self, claims: &Claims, list_id: ListId) -> Result<List, ApiError> {
        let mut scope = self
            .authorized(
                "get_list",
                claims,
                ResourceRef::List(list_id),
                Role::Reader,
                Scope::ListAccess,
            )
            .await?;
        let result = scope
            .tx()
            .get_list(&list_id)
            .await
            .map_err(ApiError::from)
            .and_then(|l| l.ok_or(ApiError::NotFound("list")));
        scope.finish(result).await
    }

    pub async fn list_all_lists(&self, claims: &Claims) -> Result<Vec<List>, ApiError> {
        let mut scope = self
            .authorized(
                "list_all_lists",
                claims,
                ResourceRef::None,
                Role::Admin,
                Scope::NoRestriction,
            )
            .await?;
        let result = scope.tx().list_lists().await.map_err(ApiError::from);
        scope.finish(result).await
    }

    pub async fn owned_lists(&self, claims: &Claims) -> Result<Vec<List>, ApiError> {
        self.lists_by_status(claims, "owned_lists", AccessStatus::Owner)
            .await
    }

    pub async fn pending_lists(&self, claims: &Claims) -> Result<Vec<List>, ApiError> {
        self.lists_by_status(claims, "pending_lists", AccessStatus::Pending)
            .await
    }

    pub async fn accepted_lists(&self, claims: &Claims) -> Result<Vec<List>, ApiError> {
        self.lists_by_status(claims, "accepted_lists", AccessStatus::Accepted)
            .await
    }

    async fn lists_by_status(
        &self,
        claims: &Claims,
        operation: &'static str,
        status: AccessStatus,
    ) -> Result<Vec<List>, ApiError> {
        let mut scope = self
            .authorized(
                operation,
                claims,
                ResourceRef::None,
                Role::Reader,
                Scope::NoRestriction,
            )
            .await?;
        let result: Result<_, ApiError> = async {
            let rows = scope
                .tx()
                .list_access_by_user(&claims.user_id, &[status])
                .await?;
            let mut lists = Vec::with_capacity(rows.len());
            for row in rows {
                if let Some(list) = scope.tx().get_list(&row.list_id).await? {
                    lists.push(list);
                }
            }
            Ok(lists)
        }
        .await;
        scope.finish(result).await
    }

    /// Applies the patch; switching to private removes every non-owner row.
    /// Members may edit content, only the owner may change visibility.
    pub async fn update_list(
        &self,
        claims: &Claims,
        list_id: ListId,
        patch: ListPatch,
    ) -> Result<List, ApiError> {
        let check = if patch.visibility.is_some() {
            Scope::IsOwner
        } else {
            Scope::ListAccess
        };
        let mut scope = self
            .authorized(
                "update_list",
                claims,
                ResourceRef::List(list_id),
                Role::Writer,
                check,
            )
            .await?;

        let result: Result<_, ApiError> = async {
            let mut list = scope
                .tx()
                .get_list(&list_id)
                .await?
                .ok_or(ApiError::NotFound("list"))?;
            if let Some(name) = patch.name {
                require_non_empty("name", &name)?;
                list.name = name;
            }
            if let Some(description) = patch.description {
                list.description = description;
            }
            if let Some(tags) = patch.tags {
                list.tags = tags;
            }
            let mut revoked = None;
            if let Some(visibility) = patch.visibility {
                list.visibility = visibility;
                if visibility == Visibility::Private {
                    revoked = Some(sharing::apply_visibility(scope.tx(), &list_id, visibility).await?);
                }
            }
            list.updated_at = Utc::now();
            scope.tx().update_list(&list).await?;
            Ok((list, revoked))
        }
        .await;
        let (list, revoked) = scope.finish(result).await?;

        if let Some(count) = revoked {
            audit::audit_list_made_private(&list.id, count);
        }
        Ok(list)
    }

    pub async fn rename_list(
        &self,
        claims: &Claims,
        list_id: ListId,
        name: String,
    ) -> Result<List, ApiError> {
        let patch = ListPatch {
            name: Some(name),
            ..Default::default()
        };
        self.update_list(claims, list_id, patch).await
    }

    pub async fn describe_list(
        &self,
        claims: &Claims,
        list_id: ListId,
        description: String,
    ) -> Result<List, ApiError> {
        let patch = ListPatch {
            description: Some(description),
            ..Default::default()
        };
        self.update_list(claims, list_id, patch).await
    }

    pub async fn delete_list(&self, claims: &Claims, list_id: ListId) -> Result<(), ApiError> {
        let mut scope = self
            .authorized(
                "delete_list",
                claims,
                ResourceRef::List(list_id),
                Role::Writer,
                Scope::IsOwner,
            )
            .await?;
        let result = scope.tx().delete_list(&list_id).await.map_err(ApiError::from);
        scope.finish(result).await?;

        audit::audit_list_deleted(&list_id, &claims.user_id);
        Ok(())
    }

    pub async fn list_owner(&self, claims: &Claims, list_id: ListId) -> Result<User, ApiError> {
        let mut scope = self
            .authorized(
                "list_owner",
                claims,
                ResourceRef::List(list_id),
                Role::Reader,
                Scope::ListAccess,
            )
            .await?;
        let result: Result<_, ApiError> = async {
            let list = scope
                .tx()
                .get_list(&list_id)
                .await?
                .ok_or(ApiError::NotFound("list"))?;
            scope
                .tx()
                .get_user(&list.owner_id)
                .await?
                .ok_or(ApiError::NotFound("user"))
        }
        .await;
        scope.finish(result).await
    }

    /// User records behind every access row of the list, owner included.
    pub async fn list_members(&self, claims: &Claims, list_id: ListId) -> Result<Vec<User>, ApiError> {
        let mut scope = self
            .authorized(
                "list_members",
                claims,
                ResourceRef::List(list_id),
                Role::Reader,
                Scope::ListAccess,
            )
            .await?;
        let result: Result<_, ApiError> = async {
            let rows = scope.tx().list_access_by_list(&list_id).await?;
            let mut users = Vec::with_capacity(rows.len());
            for row in rows {
                if let Some(user) = scope.tx().get_user(&row.user_id).await? {
                    users.push(user);
                }
            }
            Ok(users)
        }
        .await;
        scope.finish(result).await
    }

    pub async fn list_todos(&self, claims: &Claims, list_id: ListId) -> Result<Vec<Todo>, ApiError> {
        let mut scope = self
            .authorized(
                "list_todos",
                claims,
                ResourceRef::List(list_id),
                Role::Reader,
                Scope::ListAccess,
            )
            .await?;
        let result: Result<_, ApiError> = async {
            if scope.tx().get_list(&list_id).await?.is_none() {
                return Err(ApiError::NotFound("list"));
            }
            Ok(scope.tx().list_todos_by_list(&list_id).await?)
        }
        .await;
        scope.finish(result).await
    }

    // ---- access ----

    pub async fn invite(
        &self,
        claims: &Claims,
        list_id: ListId,
        user_id: UserId,
        role: Option<Role>,
    ) -> Result<Access, ApiError> {
        let mut scope = self
            .authorized(
                "invite",
                claims,
                ResourceRef::List(list_id),
                Role::Reader,
                Scope::IsOwner,
            )
            .await?;
        let result = sharing::invite(scope.tx(), &list_id, &user_id, role).await;
        let access = scope.finish(result).await?;

        audit::audit_access_invited(&list_id, &user_id, &claims.user_id, &access.role);
        Ok(access)
    }

    /// Accepts the caller's own invitation.
    pub async fn accept(&self, claims: &Claims, list_id: ListId) -> Result<Access, ApiError> {
        let mut scope = self
            .authorized(
                "accept",
                claims,
                ResourceRef::None,
                Role::Reader,
                Scope::NoRestriction,
            )
            .await?;
        let result = sharing::accept(scope.tx(), &list_id, &claims.user_id).await;
        let (outcome, access) = scope.finish(result).await?;

        if outcome == AcceptOutcome::Accepted {
            audit::audit_access_accepted(&list_id, &claims.user_id);
        }
        Ok(access)
    }

    /// Removing someone else requires ownership; anyone may remove themselves.
    pub async fn revoke(
        &self,
        claims: &Claims,
        list_id: ListId,
        user_id: UserId,
    ) -> Result<(), ApiError> {
        let (operation, resource, check) = if user_id == claims.user_id {
            ("decline", ResourceRef::None, Scope::NoRestriction)
        } else {
            ("revoke", ResourceRef::List(list_id), Scope::IsOwner)
        };
        let mut scope = self
            .authorized(operation, claims, resource, Role::Reader, check)
            .await?;
        let result = sharing::revoke(scope.tx(), &list_id, &user_id).await;
        let outcome = scope.finish(result).await?;

        if outcome == RevokeOutcome::Delete {
            audit::audit_access_revoked(&list_id, &user_id, &claims.user_id);
        }
        Ok(())
    }

    pub async fn get_access(
        &self,
        claims: &Claims,
        list_id: ListId,
        user_id: UserId,
    ) -> Result<Access, ApiError> {
        let mut scope = self
            .authorized(
                "get_access",
                claims,
                ResourceRef::List(list_id),
                Role::Reader,
                Scope::ListAccess,
            )
            .await?;
        let result = scope
            .tx()
            .get_access(&list_id, &user_id)
            .await
            .map_err(ApiError::from)
            .and_then(|a| a.ok_or(ApiError::NotFound("access")));
        scope.finish(result).await
    }

    pub async fn list_access(&self, claims: &Claims, list_id: ListId) -> Result<Vec<Access>, ApiError> {
        let mut scope = self
            .authorized(
                "list_access",
                claims,
                ResourceRef::List(list_id),
                Role::Reader,
                Scope::ListAccess,
            )
            .await?;
        let result = scope
            .tx()
            .list_access_by_list(&list_id)
            .await
            .map_err(ApiError::from);
        scope.finish(result).await
    }

    // ---- todos ----

    pub async fn create_todo(
        &self,
        claims: &Claims,
        list_id: ListId,
        input: NewTodo,
    ) -> Result<Todo, ApiError> {
        let mut scope = self
            .authorized(
                "create_todo",
                claims,
                ResourceRef::TodoInList(list_id),
                Role::Writer,
                Scope::TodoAccess,
            )
            .await?;
        let result: Result<_, ApiError> = async {
            require_non_empty("title", &input.title)?;
            if scope.tx().get_list(&list_id).await?.is_none() {
                return Err(ApiError::NotFound("list"));
            }
            let now = Utc::now();
            let todo = Todo {
                id: TodoId::generate(),
                list_id,
                title: input.title,
                description: input.description,
                tags: input.tags,
                completed: false,
                due_date: input.due_date,
                start_date: input.start_date,
                priority: input.priority,
                assigned_to: input.assigned_to,
                created_at: now,
                updated_at: now,
            };
            scope.tx().create_todo(&todo).await?;
            Ok(todo)
        }
        .await;
        scope.finish(result).await
    }

    pub async fn get_todo(&self, claims: &Claims, todo_id: TodoId) -> Result<Todo, ApiError> {
        let mut scope = self
            .authorized(
                "get_todo",
                claims,
                ResourceRef::Todo(todo_id),
                Role::Reader,
                Scope::TodoAccess,
            )
            .await?;
        let result = scope
            .tx()
            .get_todo(&todo_id)
            .await
            .map_err(ApiError::from)
            .and_then(|t| t.ok_or(ApiError::NotFound("todo")));
        scope.finish(result).await
    }

    pub async fn update_todo(
        &self,
        claims: &Claims,
        todo_id: TodoId,
        patch: TodoPatch,
    ) -> Result<Todo, ApiError> {
        let mut scope = self
            .authorized(
                "update_todo",
                claims,
                ResourceRef::Todo(todo_id),
                Role::Writer,
                Scope::TodoAccess,
            )
            .await?;
        let result: Result<_, ApiError> = async {
            let mut todo = scope
                .tx()
                .get_todo(&todo_id)
                .await?
                .ok_or(ApiError::NotFound("todo"))?;
            if let Some(title) = patch.title {
                require_non_empty("title", &title)?;
                todo.title = title;
            }
            if let Some(description) = patch.description {
                todo.description = description;
            }
            if let Some(tags) = patch.tags {
                todo.tags = tags;
            }
            if let Some(completed) = patch.completed {
                todo.completed = completed;
            }
            if patch.due_date.is_some() {
                todo.due_date = patch.due_date;
            }
            if patch.start_date.is_some() {
                todo.start_date = patch.start_date;
            }
            if let Some(priority) = patch.priority {
                todo.priority = priority;
            }
            if patch.assigned_to.is_some() {
                todo.assigned_to = patch.assigned_to;
            }
            todo.updated_at = Utc::now();
            scope.tx().update_todo(&todo).await?;
            Ok(todo)
        }
        .await;
        scope.finish(result).await
    }

    pub async fn complete_todo(&self, claims: &Claims, todo_id: TodoId) -> Result<Todo, ApiError> {
        let patch = TodoPatch {
            completed: Some(true),
            ..Default::default()
        };
        self.update_todo(claims, todo_id, patch).await
    }

    pub async fn assign_todo(
        &self,
        claims: &Claims,
        todo_id: TodoId,
        user_id: UserId,
    ) -> Result<Todo, ApiError> {
        let patch = TodoPatch {
            assigned_to: Some(user_id),
            ..Default::default()
        };
        self.update_todo(claims, todo_id, patch).await
    }

    pub async fn delete_todo(&self, claims: &Claims, todo_id: TodoId) -> Result<(), ApiError> {
        let mut scope = self
            .authorized(
                "delete_todo",
                claims,
                ResourceRef::Todo(todo_id),
                Role::Writer,
                Scope::TodoAccess,
            )
            .await?;
        let result = scope.tx().delete_todo(&todo_id).await.map_err(ApiError::from);
        scope.finish(result).await
    }

    pub async fn list_all_todos(&self, claims: &Claims) -> Result<Vec<Todo>, ApiError> {
        let mut scope = self
            .authorized(
                "list_all_todos",
                claims,
                ResourceRef::None,
                Role::Admin,
                Scope::NoRestriction,
            )
            .await?;
        let result = scope.tx().list_todos().await.map_err(ApiError::from);
        scope.finish(result).await
    }

    /// Todos in every list the caller owns or has accepted.
    pub async fn my_todos(&self, claims: &Claims) -> Result<Vec<Todo>, ApiError> {
        let mut scope = self
            .authorized(
                "my_todos",
                claims,
                ResourceRef::None,
                Role::Reader,
                Scope::NoRestriction,
            )
            .await?;
        let result: Result<_, ApiError> = async {
            let rows = scope
                .tx()
                .list_access_by_user(&claims.user_id, &AccessStatus::TODO_VISIBLE)
                .await?;
            let mut todos = Vec::new();
            for row in rows {
                todos.extend(scope.tx().list_todos_by_list(&row.list_id).await?);
            }
            Ok(todos)
        }
        .await;
        scope.finish(result).await
    }

    // ---- users ----

    pub async fn create_user(&self, claims: &Claims, input: NewUser) -> Result<User, ApiError> {
        let mut scope = self
            .authorized(
                "create_user",
                claims,
                ResourceRef::None,
                Role::Admin,
                Scope::NoRestriction,
            )
            .await?;
        let result: Result<_, ApiError> = async {
            require_non_empty("email", &input.email)?;
            if !input.role.is_valid() {
                return Err(ApiError::BadRequest(format!("unknown role '{}'", input.role)));
            }
            let now = Utc::now();
            let user = User {
                id: UserId::generate(),
                email: input.email,
                github_id: input.github_id,
                role: input.role,
                created_at: now,
                updated_at: now,
            };
            scope.tx().create_user(&user).await?;
            Ok(user)
        }
        .await;
        scope.finish(result).await
    }

    pub async fn get_user(&self, claims: &Claims, user_id: UserId) -> Result<User, ApiError> {
        let mut scope = self
            .authorized("get_user", claims, ResourceRef::None, Role::Reader, Scope::NoRestriction)
            .await?;
        let result = scope
            .tx()
            .get_user(&user_id)
            .await
            .map_err(ApiError::from)
            .and_then(|u| u.ok_or(ApiError::NotFound("user")));
        scope.finish(result).await
    }

    pub async fn get_user_by_email(&self, claims: &Claims, email: &str) -> Result<User, ApiError> {
        let mut scope = self
            .authorized(
                "get_user_by_email",
                claims,
                ResourceRef::None,
                Role::Reader,
                Scope::NoRestriction,
            )
            .await?;
        let result = scope
            .tx()
            .get_user_by_email(email)
            .await
            .map_err(ApiError::from)
            .and_then(|u| u.ok_or(ApiError::NotFound("user")));
        scope.finish(result).await
    }

    pub async fn list_users(&self, claims: &Claims) -> Result<Vec<User>, ApiError> {
        let mut scope = self
            .authorized("list_users", claims, ResourceRef::None, Role::Reader, Scope::NoRestriction)
            .await?;
        let result = scope.tx().list_users().await.map_err(ApiError::from);
        scope.finish(result).await
    }

    pub async fn update_user(
        &self,
        claims: &Claims,
        user_id: UserId,
        patch: UserPatch,
    ) -> Result<User, ApiError> {
        let mut scope = self
            .authorized("update_user", claims, ResourceRef::None, Role::Admin, Scope::NoRestriction)
            .await?;
        let result: Result<_, ApiError> = async {
            let mut user = scope
                .tx()
                .get_user(&user_id)
                .await?
                .ok_or(ApiError::NotFound("user"))?;
            if let Some(email) = patch.email {
                require_non_empty("email", &email)?;
                user.email = email;
            }
            if patch.github_id.is_some() {
                user.github_id = patch.github_id;
            }
            user.updated_at = Utc::now();
            scope.tx().update_user(&user).await?;
            Ok(user)
        }
        .await;
        scope.finish(result).await
    }

    pub async fn delete_user(&self, claims: &Claims, user_id: UserId) -> Result<(), ApiError> {
        let mut scope = self
            .authorized("delete_user", claims, ResourceRef::None, Role::Admin, Scope::NoRestriction)
            .await?;
        let result = scope.tx().delete_user(&user_id).await.map_err(ApiError::from);
        scope.finish(result).await?;
        tracing::info!(user_id = %user_id, deleted_by = %claims.user_id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoshare_core::authz::DenyReason;
    use todoshare_core::sharing::SharingError;
    use todoshare_storage::InMemoryDatabase;

    struct Fixture {
        service: TodoService<InMemoryDatabase>,
        admin: Claims,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = Arc::new(InMemoryDatabase::new());
            let admin = seed_user(&db, "root@example.com", Role::Admin).await;
            Self {
                service: TodoService::new(db),
                admin,
            }
        }

        async fn user(&self, email: &str, role: Role) -> Claims {
            let user = self
                .service
                .create_user(
                    &self.admin,
                    NewUser {
                        email: email.to_string(),
                        github_id: None,
                        role: role.clone(),
                    },
                )
                .await
                .unwrap();
            Claims::new(user.id, email, role)
        }
    }

    async fn seed_user(db: &InMemoryDatabase, email: &str, role: Role) -> Claims {
        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            email: email.to_string(),
            github_id: None,
            role: role.clone(),
            created_at: now,
            updated_at: now,
        };
        let mut tx = db.begin().await.unwrap();
        tx.create_user(&user).await.unwrap();
        tx.commit().await.unwrap();
        Claims::new(user.id, email, role)
    }

    fn shared_list(name: &str, shared_with: Vec<UserId>) -> NewList {
        NewList {
            name: name.to_string(),
            visibility: Visibility::Shared,
            shared_with,
            ..Default::default()
        }
    }

    fn todo(title: &str) -> NewTodo {
        NewTodo {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn pending_invitee_can_read_list_but_not_todos() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Writer).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![bob.user_id]))
            .await
            .unwrap();
        let item = f.service.create_todo(&alice, list.id, todo("dishes")).await.unwrap();

        assert_eq!(f.service.get_list(&bob, list.id).await.unwrap().id, list.id);
        let err = f.service.get_todo(&bob, item.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Denied(DenyReason::NoAccess)));
    }

    #[tokio::test]
    async fn accepting_grants_todo_access_and_is_repeatable() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Writer).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![bob.user_id]))
            .await
            .unwrap();
        let item = f.service.create_todo(&alice, list.id, todo("dishes")).await.unwrap();

        let access = f.service.accept(&bob, list.id).await.unwrap();
        let again = f.service.accept(&bob, list.id).await.unwrap();

        assert_eq!(access.status, AccessStatus::Accepted);
        assert_eq!(again.status, AccessStatus::Accepted);
        assert_eq!(f.service.list_access(&alice, list.id).await.unwrap().len(), 2);
        let done = f.service.complete_todo(&bob, item.id).await.unwrap();
        assert!(done.completed);
    }

    #[tokio::test]
    async fn list_members_returns_owner_and_invitees() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Reader).await;
        let carol = f.user("carol@example.com", Role::Reader).await;
        let dave = f.user("dave@example.com", Role::Reader).await;
        let list = f
            .service
            .create_list(&alice, shared_list("trip", vec![bob.user_id, carol.user_id]))
            .await
            .unwrap();
        f.service.accept(&bob, list.id).await.unwrap();

        let mut emails: Vec<String> = f
            .service
            .list_members(&carol, list.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        emails.sort();

        assert_eq!(
            emails,
            ["alice@example.com", "bob@example.com", "carol@example.com"]
        );
        let err = f.service.list_members(&dave, list.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Denied(DenyReason::NoAccess)));
    }

    #[tokio::test]
    async fn only_owner_changes_visibility() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Writer).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![bob.user_id]))
            .await
            .unwrap();

        let err = f
            .service
            .update_list(
                &bob,
                list.id,
                ListPatch {
                    visibility: Some(Visibility::Private),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Denied(DenyReason::NotOwner)));
        assert_eq!(f.service.list_access(&alice, list.id).await.unwrap().len(), 2);

        let renamed = f
            .service
            .rename_list(&bob, list.id, "house chores".to_string())
            .await
            .unwrap();
        assert_eq!(renamed.name, "house chores");
        assert_eq!(renamed.visibility, Visibility::Shared);
    }

    #[tokio::test]
    async fn create_list_rejects_owner_in_shared_with() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;

        let err = f
            .service
            .create_list(&alice, shared_list("chores", vec![alice.user_id]))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(f.service.owned_lists(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accept_without_invitation_is_not_found() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Reader).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![]))
            .await
            .unwrap();

        let err = f.service.accept(&bob, list.id).await.unwrap_err();

        assert!(matches!(err, ApiError::Sharing(SharingError::NotFound { .. })));
        assert_eq!(f.service.list_access(&alice, list.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn making_list_private_removes_members() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Reader).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![bob.user_id]))
            .await
            .unwrap();
        f.service.accept(&bob, list.id).await.unwrap();

        let patch = ListPatch {
            visibility: Some(Visibility::Private),
            ..Default::default()
        };
        let updated = f.service.update_list(&alice, list.id, patch).await.unwrap();

        assert_eq!(updated.visibility, Visibility::Private);
        let err = f.service.get_list(&bob, list.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Denied(DenyReason::NoAccess)));
        let rows = f.service.list_access(&alice, list.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_owner());
    }

    #[tokio::test]
    async fn reader_member_cannot_write_todos() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let carol = f.user("carol@example.com", Role::Reader).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![carol.user_id]))
            .await
            .unwrap();
        f.service.accept(&carol, list.id).await.unwrap();
        let item = f.service.create_todo(&alice, list.id, todo("dishes")).await.unwrap();

        assert!(f.service.get_todo(&carol, item.id).await.is_ok());
        let err = f.service.complete_todo(&carol, item.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Denied(DenyReason::InsufficientRole)));
    }

    #[tokio::test]
    async fn admin_bypasses_membership() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let list = f
            .service
            .create_list(&alice, NewList {
                name: "secret".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let renamed = f
            .service
            .rename_list(&f.admin, list.id, "declassified".to_string())
            .await
            .unwrap();

        assert_eq!(renamed.name, "declassified");
        assert_eq!(renamed.owner_id, alice.user_id);
    }

    #[tokio::test]
    async fn only_owner_invites_and_deletes() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Writer).await;
        let carol = f.user("carol@example.com", Role::Reader).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![bob.user_id]))
            .await
            .unwrap();
        f.service.accept(&bob, list.id).await.unwrap();

        let invite = f.service.invite(&bob, list.id, carol.user_id, None).await;
        let delete = f.service.delete_list(&bob, list.id).await;

        assert!(matches!(invite, Err(ApiError::Denied(DenyReason::NotOwner))));
        assert!(matches!(delete, Err(ApiError::Denied(DenyReason::NotOwner))));

        let access = f
            .service
            .invite(&alice, list.id, carol.user_id, None)
            .await
            .unwrap();
        assert_eq!(access.role, Role::Reader);
        f.service.delete_list(&alice, list.id).await.unwrap();
        assert!(f.service.pending_lists(&carol).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn member_can_decline_but_not_remove_others() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Reader).await;
        let carol = f.user("carol@example.com", Role::Reader).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![bob.user_id, carol.user_id]))
            .await
            .unwrap();

        let err = f
            .service
            .revoke(&bob, list.id, carol.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Denied(DenyReason::NotOwner)));

        f.service.revoke(&bob, list.id, bob.user_id).await.unwrap();
        f.service.revoke(&bob, list.id, bob.user_id).await.unwrap();
        assert!(f.service.pending_lists(&bob).await.unwrap().is_empty());
        assert_eq!(f.service.pending_lists(&carol).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn owner_cannot_leave_own_list() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![]))
            .await
            .unwrap();

        let err = f
            .service
            .revoke(&alice, list.id, alice.user_id)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Sharing(SharingError::Forbidden(_))));
        assert_eq!(f.service.owned_lists(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn writer_cannot_create_list_for_someone_else() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Writer).await;

        let err = f
            .service
            .create_list(&alice, NewList {
                name: "gift".to_string(),
                owner_id: Some(bob.user_id),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Denied(DenyReason::NotOwner)));
        assert!(f.service.owned_lists(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_create_leaves_nothing_behind() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;

        // the shared user does not exist, so the whole create rolls back
        let err = f
            .service
            .create_list(&alice, shared_list("chores", vec![UserId::generate()]))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound("user")));
        assert!(f.service.owned_lists(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn my_todos_skips_pending_lists() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Writer).await;
        let mine = f
            .service
            .create_list(&bob, shared_list("bob's", vec![]))
            .await
            .unwrap();
        let invited = f
            .service
            .create_list(&alice, shared_list("alice's", vec![bob.user_id]))
            .await
            .unwrap();
        f.service.create_todo(&bob, mine.id, todo("a")).await.unwrap();
        f.service.create_todo(&alice, invited.id, todo("b")).await.unwrap();

        assert_eq!(f.service.my_todos(&bob).await.unwrap().len(), 1);
        f.service.accept(&bob, invited.id).await.unwrap();
        assert_eq!(f.service.my_todos(&bob).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn admin_only_listings() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        f.service
            .create_list(&alice, shared_list("chores", vec![]))
            .await
            .unwrap();

        let err = f.service.list_all_lists(&alice).await.unwrap_err();
        assert!(matches!(err, ApiError::Denied(DenyReason::InsufficientRole)));
        assert_eq!(f.service.list_all_lists(&f.admin).await.unwrap().len(), 1);
        assert!(f.service.list_all_todos(&f.admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_update_keeps_role() {
        let f = Fixture::new().await;
        let bob = f.user("bob@example.com", Role::Reader).await;

        let updated = f
            .service
            .update_user(&f.admin, bob.user_id, UserPatch {
                email: Some("robert@example.com".to_string()),
                github_id: Some("bobby".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(updated.email, "robert@example.com");
        assert_eq!(updated.role, Role::Reader);
        let found = f
            .service
            .get_user_by_email(&bob, "robert@example.com")
            .await
            .unwrap();
        assert_eq!(found.id, bob.user_id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let f = Fixture::new().await;
        f.user("bob@example.com", Role::Reader).await;

        let err = f
            .service
            .create_user(&f.admin, NewUser {
                email: "bob@example.com".to_string(),
                github_id: None,
                role: Role::Reader,
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn owner_lookup_returns_user() {
        let f = Fixture::new().await;
        let alice = f.user("alice@example.com", Role::Writer).await;
        let bob = f.user("bob@example.com", Role::Reader).await;
        let list = f
            .service
            .create_list(&alice, shared_list("chores", vec![bob.user_id]))
            .await
            .unwrap();

        let owner = f.service.list_owner(&bob, list.id).await.unwrap();

        assert_eq!(owner.id, alice.user_id);
    }

    #[tokio::test]
    async fn ping_reaches_backend() {
        let f = Fixture::new().await;
        f.service.ping().await.unwrap();
    }
}
