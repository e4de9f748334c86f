use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use todoshare_core::model::{Access, AccessStatus, List, ListId, Todo, TodoId, User, UserId};

use crate::traits::{
    AccessStore, Database, ListStore, StorageError, TodoStore, Transaction, UserStore,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    lists: BTreeMap<ListId, List>,
    todos: BTreeMap<TodoId, Todo>,
    access: BTreeMap<(ListId, UserId), Access>,
}

impl Tables {
    fn remove_list(&mut self, list_id: &ListId) {
        self.lists.remove(list_id);
        self.access.retain(|(l, _), _| l != list_id);
        self.todos.retain(|_, t| t.list_id != *list_id);
    }
}

/// Process-local database. Transactions are serialized: a transaction holds
/// the lock from `begin` until it is committed, rolled back, or dropped, and
/// works on a private copy that only `commit` publishes.
///
/// `begin` clones every table, so each transaction costs time linear in the
/// stored data. Meant for tests and local development, not production load.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for InMemoryDatabase {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction, StorageError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction { guard, working })
    }
}

#[derive(Debug)]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl Transaction for InMemoryTransaction {
    async fn commit(self) -> Result<(), StorageError> {
        let InMemoryTransaction { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StorageError> {
        Ok(())
    }
}

impl AccessStore for InMemoryTransaction {
    async fn get_access(
        &mut self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> Result<Option<Access>, StorageError> {
        Ok(self.working.access.get(&(*list_id, *user_id)).cloned())
    }

    async fn list_access_by_list(&mut self, list_id: &ListId) -> Result<Vec<Access>, StorageError> {
        Ok(self
            .working
            .access
            .values()
            .filter(|a| a.list_id == *list_id)
            .cloned()
            .collect())
    }

    async fn list_access_by_user(
        &mut self,
        user_id: &UserId,
        statuses: &[AccessStatus],
    ) -> Result<Vec<Access>, StorageError> {
        Ok(self
            .working
            .access
            .values()
            .filter(|a| a.user_id == *user_id)
            .filter(|a| statuses.is_empty() || statuses.contains(&a.status))
            .cloned()
            .collect())
    }

    async fn create_access(&mut self, access: &Access) -> Result<(), StorageError> {
        let tables = &mut self.working;
        if !tables.lists.contains_key(&access.list_id) || !tables.users.contains_key(&access.user_id)
        {
            return Err(StorageError::MissingReference { entity: "access" });
        }

        let key = (access.list_id, access.user_id);
        if tables.access.contains_key(&key) {
            return Err(StorageError::Conflict { entity: "access" });
        }

        let second_owner = access.is_owner()
            && tables
                .access
                .values()
                .any(|a| a.list_id == access.list_id && a.is_owner());
        if second_owner {
            return Err(StorageError::Conflict { entity: "access" });
        }

        tables.access.insert(key, access.clone());
        Ok(())
    }

    async fn update_access_status(
        &mut self,
        list_id: &ListId,
        user_id: &UserId,
        status: AccessStatus,
    ) -> Result<(), StorageError> {
        match self.working.access.get_mut(&(*list_id, *user_id)) {
            Some(access) => {
                access.status = status;
                Ok(())
            }
            None => Err(StorageError::NotFound { entity: "access" }),
        }
    }

    async fn delete_access(&mut self, list_id: &ListId, user_id: &UserId) -> Result<(), StorageError> {
        self.working.access.remove(&(*list_id, *user_id));
        Ok(())
    }

    async fn delete_access_by_status(
        &mut self,
        list_id: &ListId,
        statuses: &[AccessStatus],
    ) -> Result<u64, StorageError> {
        let before = self.working.access.len();
        self.working
            .access
            .retain(|(l, _), a| !(l == list_id && statuses.contains(&a.status)));
        Ok((before - self.working.access.len()) as u64)
    }
}

impl ListStore for InMemoryTransaction {
    async fn create_list(&mut self, list: &List) -> Result<(), StorageError> {
        if !self.working.users.contains_key(&list.owner_id) {
            return Err(StorageError::MissingReference { entity: "list" });
        }
        if self.working.lists.contains_key(&list.id) {
            return Err(StorageError::Conflict { entity: "list" });
        }
        self.working.lists.insert(list.id, list.clone());
        Ok(())
    }

    async fn get_list(&mut self, list_id: &ListId) -> Result<Option<List>, StorageError> {
        Ok(self.working.lists.get(list_id).cloned())
    }

    async fn list_lists(&mut self) -> Result<Vec<List>, StorageError> {
        Ok(self.working.lists.values().cloned().collect())
    }

    async fn update_list(&mut self, list: &List) -> Result<(), StorageError> {
        match self.working.lists.get_mut(&list.id) {
            Some(stored) => {
                // owner and creation time are fixed at insert
                stored.name = list.name.clone();
                stored.description = list.description.clone();
                stored.visibility = list.visibility;
                stored.tags = list.tags.clone();
                stored.updated_at = list.updated_at;
                Ok(())
            }
            None => Err(StorageError::NotFound { entity: "list" }),
        }
    }

    async fn delete_list(&mut self, list_id: &ListId) -> Result<(), StorageError> {
        if !self.working.lists.contains_key(list_id) {
            return Err(StorageError::NotFound { entity: "list" });
        }
        self.working.remove_list(list_id);
        Ok(())
    }
}

impl TodoStore for InMemoryTransaction {
    async fn create_todo(&mut self, todo: &Todo) -> Result<(), StorageError> {
        let assignee_missing = todo
            .assigned_to
            .is_some_and(|u| !self.working.users.contains_key(&u));
        if !self.working.lists.contains_key(&todo.list_id) || assignee_missing {
            return Err(StorageError::MissingReference { entity: "todo" });
        }
        if self.working.todos.contains_key(&todo.id) {
            return Err(StorageError::Conflict { entity: "todo" });
        }
        self.working.todos.insert(todo.id, todo.clone());
        Ok(())
    }

    async fn get_todo(&mut self, todo_id: &TodoId) -> Result<Option<Todo>, StorageError> {
        Ok(self.working.todos.get(todo_id).cloned())
    }

    async fn list_todos(&mut self) -> Result<Vec<Todo>, StorageError> {
        Ok(self.working.todos.values().cloned().collect())
    }

    async fn list_todos_by_list(&mut self, list_id: &ListId) -> Result<Vec<Todo>, StorageError> {
        Ok(self
            .working
            .todos
            .values()
            .filter(|t| t.list_id == *list_id)
            .cloned()
            .collect())
    }

    async fn update_todo(&mut self, todo: &Todo) -> Result<(), StorageError> {
        if todo
            .assigned_to
            .is_some_and(|u| !self.working.users.contains_key(&u))
        {
            return Err(StorageError::MissingReference { entity: "todo" });
        }
        match self.working.todos.get_mut(&todo.id) {
            Some(stored) => {
                let list_id = stored.list_id;
                let created_at = stored.created_at;
                *stored = todo.clone();
                stored.list_id = list_id;
                stored.created_at = created_at;
                Ok(())
            }
            None => Err(StorageError::NotFound { entity: "todo" }),
        }
    }

    async fn delete_todo(&mut self, todo_id: &TodoId) -> Result<(), StorageError> {
        match self.working.todos.remove(todo_id) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound { entity: "todo" }),
        }
    }
}

impl UserStore for InMemoryTransaction {
    async fn create_user(&mut self, user: &User) -> Result<(), StorageError> {
        let taken = self.working.users.contains_key(&user.id)
            || self.working.users.values().any(|u| u.email == user.email);
        if taken {
            return Err(StorageError::Conflict { entity: "user" });
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&mut self, user_id: &UserId) -> Result<Option<User>, StorageError> {
        Ok(self.working.users.get(user_id).cloned())
    }

    async fn get_user_by_email(&mut self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&mut self) -> Result<Vec<User>, StorageError> {
        Ok(self.working.users.values().cloned().collect())
    }

    async fn update_user(&mut self, user: &User) -> Result<(), StorageError> {
        let email_taken = self
            .working
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email);
        if email_taken {
            return Err(StorageError::Conflict { entity: "user" });
        }
        match self.working.users.get_mut(&user.id) {
            Some(stored) => {
                stored.email = user.email.clone();
                stored.github_id = user.github_id.clone();
                stored.updated_at = user.updated_at;
                Ok(())
            }
            None => Err(StorageError::NotFound { entity: "user" }),
        }
    }

    async fn delete_user(&mut self, user_id: &UserId) -> Result<(), StorageError> {
        if self.working.users.remove(user_id).is_none() {
            return Err(StorageError::NotFound { entity: "user" });
        }

        let owned: Vec<ListId> = self
            .working
            .lists
            .values()
            .filter(|l| l.owner_id == *user_id)
            .map(|l| l.id)
            .collect();
        for list_id in &owned {
            self.working.remove_list(list_id);
        }

        self.working.access.retain(|(_, u), _| u != user_id);
        for todo in self.working.todos.values_mut() {
            if todo.assigned_to == Some(*user_id) {
                todo.assigned_to = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use todoshare_core::model::{Priority, Visibility};
    use todoshare_core::role::Role;

    fn user(email: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            email: email.to_string(),
            github_id: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    fn list(owner: &User, visibility: Visibility) -> List {
        let now = Utc::now();
        List {
            id: ListId::generate(),
            name: "chores".to_string(),
            description: String::new(),
            owner_id: owner.id,
            visibility,
            tags: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn todo(list: &List) -> Todo {
        let now = Utc::now();
        Todo {
            id: TodoId::generate(),
            list_id: list.id,
            title: "vacuum".to_string(),
            description: String::new(),
            tags: vec![],
            completed: false,
            due_date: None,
            start_date: None,
            priority: Priority::Medium,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded() -> (InMemoryDatabase, User, User, List) {
        let db = InMemoryDatabase::new();
        let alice = user("alice@example.com", Role::Writer);
        let bob = user("bob@example.com", Role::Reader);
        let l = list(&alice, Visibility::Shared);

        let mut tx = db.begin().await.unwrap();
        tx.create_user(&alice).await.unwrap();
        tx.create_user(&bob).await.unwrap();
        tx.create_list(&l).await.unwrap();
        tx.create_access(&Access::owner(l.id, alice.id)).await.unwrap();
        tx.commit().await.unwrap();

        (db, alice, bob, l)
    }

    // 1. Committed writes are visible to later transactions
    #[tokio::test]
    async fn committed_writes_are_visible() {
        let (db, alice, _, l) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        let access = tx.get_access(&l.id, &alice.id).await.unwrap().unwrap();

        assert_eq!(access.status, AccessStatus::Owner);
        assert_eq!(access.role, Role::Admin);
    }

    // 2. Dropped transaction leaves no trace
    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let (db, _, bob, l) = seeded().await;

        {
            let mut tx = db.begin().await.unwrap();
            tx.create_access(&Access::pending(l.id, bob.id, Role::Reader))
                .await
                .unwrap();
            assert!(tx.get_access(&l.id, &bob.id).await.unwrap().is_some());
        }

        let mut tx = db.begin().await.unwrap();
        assert!(tx.get_access(&l.id, &bob.id).await.unwrap().is_none());
    }

    // 3. Explicit rollback behaves like drop
    #[tokio::test]
    async fn rollback_discards_writes() {
        let (db, _, _, l) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        tx.delete_list(&l.id).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        assert!(tx.get_list(&l.id).await.unwrap().is_some());
    }

    // 4. Duplicate (list, user) pair conflicts
    #[tokio::test]
    async fn duplicate_access_conflicts() {
        let (db, _, bob, l) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        tx.create_access(&Access::pending(l.id, bob.id, Role::Reader))
            .await
            .unwrap();
        let err = tx
            .create_access(&Access::pending(l.id, bob.id, Role::Writer))
            .await
            .unwrap_err();

        assert_eq!(err, StorageError::Conflict { entity: "access" });
    }

    // 5. A list has at most one owner row
    #[tokio::test]
    async fn second_owner_row_conflicts() {
        let (db, _, bob, l) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        let err = tx
            .create_access(&Access::owner(l.id, bob.id))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict { .. }));
    }

    // 6. Access rows need an existing list and user
    #[tokio::test]
    async fn access_for_missing_list_is_rejected() {
        let (db, _, bob, _) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        let err = tx
            .create_access(&Access::pending(ListId::generate(), bob.id, Role::Reader))
            .await
            .unwrap_err();

        assert_eq!(err, StorageError::MissingReference { entity: "access" });
    }

    // 7. Status filter selects matching rows in one call
    #[tokio::test]
    async fn list_by_user_filters_statuses() {
        let (db, alice, bob, l) = seeded().await;
        let other = list(&alice, Visibility::Public);

        let mut tx = db.begin().await.unwrap();
        tx.create_list(&other).await.unwrap();
        tx.create_access(&Access::pending(l.id, bob.id, Role::Reader))
            .await
            .unwrap();
        tx.create_access(&Access::pending(other.id, bob.id, Role::Reader))
            .await
            .unwrap();
        tx.update_access_status(&other.id, &bob.id, AccessStatus::Accepted)
            .await
            .unwrap();

        let accepted = tx
            .list_access_by_user(&bob.id, &[AccessStatus::Accepted])
            .await
            .unwrap();
        let all = tx.list_access_by_user(&bob.id, &[]).await.unwrap();

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].list_id, other.id);
        assert_eq!(all.len(), 2);
    }

    // 8. Updating a missing row is NotFound
    #[tokio::test]
    async fn update_missing_access_is_not_found() {
        let (db, _, bob, l) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        let err = tx
            .update_access_status(&l.id, &bob.id, AccessStatus::Accepted)
            .await
            .unwrap_err();

        assert_eq!(err, StorageError::NotFound { entity: "access" });
    }

    // 9. Delete is idempotent
    #[tokio::test]
    async fn delete_access_twice_succeeds() {
        let (db, _, bob, l) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        tx.create_access(&Access::pending(l.id, bob.id, Role::Reader))
            .await
            .unwrap();
        tx.delete_access(&l.id, &bob.id).await.unwrap();
        tx.delete_access(&l.id, &bob.id).await.unwrap();

        assert!(tx.get_access(&l.id, &bob.id).await.unwrap().is_none());
    }

    // 10. Status-scoped delete spares the owner
    #[tokio::test]
    async fn delete_by_status_keeps_owner() {
        let (db, alice, bob, l) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        tx.create_access(&Access::pending(l.id, bob.id, Role::Reader))
            .await
            .unwrap();
        let removed = tx
            .delete_access_by_status(&l.id, &AccessStatus::REVOCABLE)
            .await
            .unwrap();

        let rows = tx.list_access_by_list(&l.id).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, alice.id);
    }

    // 11. Deleting a list cascades to rows and todos
    #[tokio::test]
    async fn delete_list_cascades() {
        let (db, _, bob, l) = seeded().await;
        let t = todo(&l);

        let mut tx = db.begin().await.unwrap();
        tx.create_access(&Access::pending(l.id, bob.id, Role::Reader))
            .await
            .unwrap();
        tx.create_todo(&t).await.unwrap();
        tx.delete_list(&l.id).await.unwrap();

        assert!(tx.list_access_by_list(&l.id).await.unwrap().is_empty());
        assert!(tx.get_todo(&t.id).await.unwrap().is_none());
        assert!(tx.list_access_by_user(&bob.id, &[]).await.unwrap().is_empty());
    }

    // 12. Deleting a user removes their rows and owned lists
    #[tokio::test]
    async fn delete_user_cascades() {
        let (db, alice, bob, l) = seeded().await;
        let bobs_list = list(&bob, Visibility::Shared);

        let mut tx = db.begin().await.unwrap();
        tx.create_list(&bobs_list).await.unwrap();
        tx.create_access(&Access::owner(bobs_list.id, bob.id))
            .await
            .unwrap();
        tx.create_access(&Access::pending(bobs_list.id, alice.id, Role::Writer))
            .await
            .unwrap();
        tx.create_access(&Access::pending(l.id, bob.id, Role::Reader))
            .await
            .unwrap();
        tx.delete_user(&bob.id).await.unwrap();

        assert!(tx.get_list(&bobs_list.id).await.unwrap().is_none());
        assert!(tx.get_access(&l.id, &bob.id).await.unwrap().is_none());
        assert_eq!(tx.list_access_by_user(&alice.id, &[]).await.unwrap().len(), 1);
    }

    // 13. Emails are unique
    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (db, _, _, _) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        let err = tx
            .create_user(&user("alice@example.com", Role::Reader))
            .await
            .unwrap_err();

        assert_eq!(err, StorageError::Conflict { entity: "user" });
    }

    // 14. User updates never touch the role
    #[tokio::test]
    async fn update_user_keeps_role() {
        let (db, _, mut bob, _) = seeded().await;

        let mut tx = db.begin().await.unwrap();
        bob.email = "robert@example.com".to_string();
        bob.role = Role::Admin;
        tx.update_user(&bob).await.unwrap();

        let stored = tx.get_user(&bob.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "robert@example.com");
        assert_eq!(stored.role, Role::Reader);
    }

    // 15. Todo updates keep the containing list
    #[tokio::test]
    async fn update_todo_cannot_move_lists() {
        let (db, alice, _, l) = seeded().await;
        let other = list(&alice, Visibility::Shared);
        let mut t = todo(&l);

        let mut tx = db.begin().await.unwrap();
        tx.create_list(&other).await.unwrap();
        tx.create_todo(&t).await.unwrap();
        t.list_id = other.id;
        t.completed = true;
        tx.update_todo(&t).await.unwrap();

        let stored = tx.get_todo(&t.id).await.unwrap().unwrap();
        assert_eq!(stored.list_id, l.id);
        assert!(stored.completed);
    }

    // 16. Transactions are serialized
    #[tokio::test]
    async fn second_begin_waits_for_first_to_finish() {
        let (db, _, _, _) = seeded().await;

        let tx = db.begin().await.unwrap();
        let db2 = db.clone();
        let waiter = tokio::spawn(async move { db2.begin().await.map(|_| ()) });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        tx.commit().await.unwrap();
        waiter.await.unwrap().unwrap();
    }
}
