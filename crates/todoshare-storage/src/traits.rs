use std::future::Future;

use todoshare_core::model::{
    Access, AccessStatus, List, ListId, Todo, TodoId, User, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{entity} already exists")]
    Conflict { entity: &'static str },
    #[error("{entity} references a missing record")]
    MissingReference { entity: &'static str },
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Opens transactions. Every store operation happens inside one.
pub trait Database: Send + Sync {
    type Tx: Transaction + 'static;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StorageError>> + Send;
}

/// A unit of work. Dropping it without calling [`Transaction::commit`]
/// discards every write made through it.
pub trait Transaction: AccessStore + ListStore + TodoStore + UserStore + Sized {
    fn commit(self) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

pub trait AccessStore: Send {
    fn get_access(
        &mut self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Option<Access>, StorageError>> + Send;

    fn list_access_by_list(
        &mut self,
        list_id: &ListId,
    ) -> impl Future<Output = Result<Vec<Access>, StorageError>> + Send;

    /// Rows held by `user_id` whose status is in `statuses`; all rows when empty.
    fn list_access_by_user(
        &mut self,
        user_id: &UserId,
        statuses: &[AccessStatus],
    ) -> impl Future<Output = Result<Vec<Access>, StorageError>> + Send;

    fn create_access(
        &mut self,
        access: &Access,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn update_access_status(
        &mut self,
        list_id: &ListId,
        user_id: &UserId,
        status: AccessStatus,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Deleting a row that does not exist succeeds.
    fn delete_access(
        &mut self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Returns the number of rows removed.
    fn delete_access_by_status(
        &mut self,
        list_id: &ListId,
        statuses: &[AccessStatus],
    ) -> impl Future<Output = Result<u64, StorageError>> + Send;
}

pub trait ListStore: Send {
    fn create_list(&mut self, list: &List)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    fn get_list(
        &mut self,
        list_id: &ListId,
    ) -> impl Future<Output = Result<Option<List>, StorageError>> + Send;

    fn list_lists(&mut self) -> impl Future<Output = Result<Vec<List>, StorageError>> + Send;

    fn update_list(&mut self, list: &List)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Removes the list together with its access rows and todos.
    fn delete_list(
        &mut self,
        list_id: &ListId,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

pub trait TodoStore: Send {
    fn create_todo(&mut self, todo: &Todo)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    fn get_todo(
        &mut self,
        todo_id: &TodoId,
    ) -> impl Future<Output = Result<Option<Todo>, StorageError>> + Send;

    fn list_todos(&mut self) -> impl Future<Output = Result<Vec<Todo>, StorageError>> + Send;

    fn list_todos_by_list(
        &mut self,
        list_id: &ListId,
    ) -> impl Future<Output = Result<Vec<Todo>, StorageError>> + Send;

    fn update_todo(&mut self, todo: &Todo)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    fn delete_todo(
        &mut self,
        todo_id: &TodoId,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

pub trait UserStore: Send {
    fn create_user(&mut self, user: &User)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    fn get_user(
        &mut self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Option<User>, StorageError>> + Send;

    fn get_user_by_email(
        &mut self,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, StorageError>> + Send;

    fn list_users(&mut self) -> impl Future<Output = Result<Vec<User>, StorageError>> + Send;

    /// Updates contact fields. The stored role is never changed.
    fn update_user(&mut self, user: &User)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Removes the user, the lists they own, and every access row they hold.
    /// Todos assigned to them become unassigned.
    fn delete_user(
        &mut self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
