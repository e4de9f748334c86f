pub mod migrations;
mod queries;

use sqlx::{PgPool, Postgres};

use todoshare_core::model::{Access, AccessStatus, List, ListId, Todo, TodoId, User, UserId};

use crate::traits::{
    AccessStore, Database, ListStore, StorageError, TodoStore, Transaction, UserStore,
};

#[derive(Debug, Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Database for PostgresDatabase {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction, StorageError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(PostgresTransaction { tx })
    }
}

/// Wraps a pooled connection with an open `BEGIN`. sqlx issues the
/// `ROLLBACK` itself if this is dropped before commit.
#[derive(Debug)]
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl Transaction for PostgresTransaction {
    async fn commit(self) -> Result<(), StorageError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    async fn rollback(self) -> Result<(), StorageError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

impl AccessStore for PostgresTransaction {
    async fn get_access(
        &mut self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> Result<Option<Access>, StorageError> {
        queries::get_access(&mut *self.tx, list_id, user_id).await
    }

    async fn list_access_by_list(&mut self, list_id: &ListId) -> Result<Vec<Access>, StorageError> {
        queries::list_access_by_list(&mut *self.tx, list_id).await
    }

    async fn list_access_by_user(
        &mut self,
        user_id: &UserId,
        statuses: &[AccessStatus],
    ) -> Result<Vec<Access>, StorageError> {
        queries::list_access_by_user(&mut *self.tx, user_id, statuses).await
    }

    async fn create_access(&mut self, access: &Access) -> Result<(), StorageError> {
        queries::insert_access(&mut *self.tx, access).await
    }

    async fn update_access_status(
        &mut self,
        list_id: &ListId,
        user_id: &UserId,
        status: AccessStatus,
    ) -> Result<(), StorageError> {
        queries::update_access_status(&mut *self.tx, list_id, user_id, status).await
    }

    async fn delete_access(&mut self, list_id: &ListId, user_id: &UserId) -> Result<(), StorageError> {
        queries::delete_access(&mut *self.tx, list_id, user_id).await
    }

    async fn delete_access_by_status(
        &mut self,
        list_id: &ListId,
        statuses: &[AccessStatus],
    ) -> Result<u64, StorageError> {
        queries::delete_access_by_status(&mut *self.tx, list_id, statuses).await
    }
}

impl ListStore for PostgresTransaction {
    async fn create_list(&mut self, list: &List) -> Result<(), StorageError> {
        queries::insert_list(&mut *self.tx, list).await
    }

    async fn get_list(&mut self, list_id: &ListId) -> Result<Option<List>, StorageError> {
        queries::get_list(&mut *self.tx, list_id).await
    }

    async fn list_lists(&mut self) -> Result<Vec<List>, StorageError> {
        queries::list_lists(&mut *self.tx).await
    }

    async fn update_list(&mut self, list: &List) -> Result<(), StorageError> {
        queries::update_list(&mut *self.tx, list).await
    }

    async fn delete_list(&mut self, list_id: &ListId) -> Result<(), StorageError> {
        queries::delete_list(&mut *self.tx, list_id).await
    }
}

impl TodoStore for PostgresTransaction {
    async fn create_todo(&mut self, todo: &Todo) -> Result<(), StorageError> {
        queries::insert_todo(&mut *self.tx, todo).await
    }

    async fn get_todo(&mut self, todo_id: &TodoId) -> Result<Option<Todo>, StorageError> {
        queries::get_todo(&mut *self.tx, todo_id).await
    }

    async fn list_todos(&mut self) -> Result<Vec<Todo>, StorageError> {
        queries::list_todos(&mut *self.tx).await
    }

    async fn list_todos_by_list(&mut self, list_id: &ListId) -> Result<Vec<Todo>, StorageError> {
        queries::list_todos_by_list(&mut *self.tx, list_id).await
    }

    async fn update_todo(&mut self, todo: &Todo) -> Result<(), StorageError> {
        queries::update_todo(&mut *self.tx, todo).await
    }

    async fn delete_todo(&mut self, todo_id: &TodoId) -> Result<(), StorageError> {
        queries::delete_todo(&mut *self.tx, todo_id).await
    }
}

impl UserStore for PostgresTransaction {
    async fn create_user(&mut self, user: &User) -> Result<(), StorageError> {
        queries::insert_user(&mut *self.tx, user).await
    }

    async fn get_user(&mut self, user_id: &UserId) -> Result<Option<User>, StorageError> {
        queries::get_user(&mut *self.tx, user_id).await
    }

    async fn get_user_by_email(&mut self, email: &str) -> Result<Option<User>, StorageError> {
        queries::get_user_by_email(&mut *self.tx, email).await
    }

    async fn list_users(&mut self) -> Result<Vec<User>, StorageError> {
        queries::list_users(&mut *self.tx).await
    }

    async fn update_user(&mut self, user: &User) -> Result<(), StorageError> {
        queries::update_user(&mut *self.tx, user).await
    }

    async fn delete_user(&mut self, user_id: &UserId) -> Result<(), StorageError> {
        queries::delete_user(&mut *self.tx, user_id).await
    }
}
