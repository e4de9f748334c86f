use todoshare_core::authz::{AccessSource, AuthzError};
use todoshare_core::model::{AccessStatus, ListId, TodoId, UserId};
use todoshare_storage::{AccessStore, ListStore, StorageError, TodoStore};

/// Serves resolver lookups from the request's own transaction.
pub struct TxAccessSource<'a, T> {
    tx: &'a mut T,
}

impl<'a, T> TxAccessSource<'a, T> {
    pub fn new(tx: &'a mut T) -> Self {
        Self { tx }
    }
}

fn source_error(e: StorageError) -> AuthzError {
    AuthzError::Source(e.to_string())
}

impl<T> AccessSource for TxAccessSource<'_, T>
where
    T: AccessStore + ListStore + TodoStore,
{
    async fn list_owner(&mut self, list_id: &ListId) -> Result<Option<UserId>, AuthzError> {
        let list = self.tx.get_list(list_id).await.map_err(source_error)?;
        Ok(list.map(|l| l.owner_id))
    }

    async fn todo_list(&mut self, todo_id: &TodoId) -> Result<Option<ListId>, AuthzError> {
        let todo = self.tx.get_todo(todo_id).await.map_err(source_error)?;
        Ok(todo.map(|t| t.list_id))
    }

    async fn lists_with_status(
        &mut self,
        user_id: &UserId,
        statuses: &[AccessStatus],
    ) -> Result<Vec<ListId>, AuthzError> {
        let rows = self
            .tx
            .list_access_by_user(user_id, statuses)
            .await
            .map_err(source_error)?;
        Ok(rows.into_iter().map(|a| a.list_id).collect())
    }
}
