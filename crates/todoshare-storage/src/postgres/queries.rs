use chrono::{DateTime, Utc};
use uuid::Uuid;

use todoshare_core::model::{
    Access, AccessStatus, List, ListId, Priority, Todo, TodoId, User, UserId,
};
use todoshare_core::role::Role;

use crate::traits::StorageError;

fn to_storage_error(e: sqlx::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

fn write_error(entity: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return StorageError::Conflict { entity };
            }
            if db_err.is_foreign_key_violation() {
                return StorageError::MissingReference { entity };
            }
        }
        to_storage_error(e)
    }
}

fn corrupt(e: impl std::fmt::Display) -> StorageError {
    StorageError::Internal(format!("corrupt row: {e}"))
}

fn status_strings(statuses: &[AccessStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

#[derive(sqlx::FromRow)]
struct AccessRow {
    list_id: Uuid,
    user_id: Uuid,
    access_level: String,
    status: String,
}

impl TryFrom<AccessRow> for Access {
    type Error = StorageError;

    fn try_from(row: AccessRow) -> Result<Self, Self::Error> {
        Ok(Access {
            list_id: ListId::new(row.list_id),
            user_id: UserId::new(row.user_id),
            role: Role::from(row.access_level),
            status: row.status.parse().map_err(corrupt)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ListRow {
    id: Uuid,
    name: String,
    description: String,
    owner_id: Uuid,
    visibility: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListRow> for List {
    type Error = StorageError;

    fn try_from(row: ListRow) -> Result<Self, Self::Error> {
        Ok(List {
            id: ListId::new(row.id),
            name: row.name,
            description: row.description,
            owner_id: UserId::new(row.owner_id),
            visibility: row.visibility.parse().map_err(corrupt)?,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TodoRow {
    id: Uuid,
    list_id: Uuid,
    title: String,
    description: String,
    tags: Vec<String>,
    completed: bool,
    due_date: Option<DateTime<Utc>>,
    start_date: Option<DateTime<Utc>>,
    priority: String,
    assigned_to: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TodoRow> for Todo {
    type Error = StorageError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        Ok(Todo {
            id: TodoId::new(row.id),
            list_id: ListId::new(row.list_id),
            title: row.title,
            description: row.description,
            tags: row.tags,
            completed: row.completed,
            due_date: row.due_date,
            start_date: row.start_date,
            priority: row.priority.parse::<Priority>().map_err(corrupt)?,
            assigned_to: row.assigned_to.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    github_id: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::new(row.id),
            email: row.email,
            github_id: row.github_id,
            role: Role::from(row.role),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StorageError>
where
    T: TryFrom<R, Error = StorageError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const ACCESS_COLUMNS: &str = "list_id, user_id, access_level, status";
const LIST_COLUMNS: &str =
    "id, name, description, owner_id, visibility, tags, created_at, updated_at";
const TODO_COLUMNS: &str = "id, list_id, title, description, tags, completed, due_date, \
     start_date, priority, assigned_to, created_at, updated_at";
const USER_COLUMNS: &str = "id, email, github_id, role, created_at, updated_at";

// access

pub async fn get_access<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list_id: &ListId,
    user_id: &UserId,
) -> Result<Option<Access>, StorageError> {
    let query =
        format!("SELECT {ACCESS_COLUMNS} FROM list_access WHERE list_id = $1 AND user_id = $2");
    let row: Option<AccessRow> = sqlx::query_as(&query)
        .bind(list_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    row.map(Access::try_from).transpose()
}

pub async fn list_access_by_list<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list_id: &ListId,
) -> Result<Vec<Access>, StorageError> {
    let query = format!("SELECT {ACCESS_COLUMNS} FROM list_access WHERE list_id = $1");
    let rows: Vec<AccessRow> = sqlx::query_as(&query)
        .bind(list_id.as_uuid())
        .fetch_all(executor)
        .await
        .map_err(to_storage_error)?;
    collect(rows)
}

pub async fn list_access_by_user<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user_id: &UserId,
    statuses: &[AccessStatus],
) -> Result<Vec<Access>, StorageError> {
    let query = format!(
        "SELECT {ACCESS_COLUMNS} FROM list_access \
         WHERE user_id = $1 AND (cardinality($2::text[]) = 0 OR status = ANY($2))"
    );
    let rows: Vec<AccessRow> = sqlx::query_as(&query)
        .bind(user_id.as_uuid())
        .bind(status_strings(statuses))
        .fetch_all(executor)
        .await
        .map_err(to_storage_error)?;
    collect(rows)
}

pub async fn insert_access<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    access: &Access,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO list_access (list_id, user_id, access_level, status) VALUES ($1, $2, $3, $4)",
    )
    .bind(access.list_id.as_uuid())
    .bind(access.user_id.as_uuid())
    .bind(access.role.as_str())
    .bind(access.status.as_str())
    .execute(executor)
    .await
    .map_err(write_error("access"))?;
    Ok(())
}

pub async fn update_access_status<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list_id: &ListId,
    user_id: &UserId,
    status: AccessStatus,
) -> Result<(), StorageError> {
    let result =
        sqlx::query("UPDATE list_access SET status = $3 WHERE list_id = $1 AND user_id = $2")
            .bind(list_id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(status.as_str())
            .execute(executor)
            .await
            .map_err(to_storage_error)?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound { entity: "access" });
    }
    Ok(())
}

pub async fn delete_access<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list_id: &ListId,
    user_id: &UserId,
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM list_access WHERE list_id = $1 AND user_id = $2")
        .bind(list_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(())
}

pub async fn delete_access_by_status<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list_id: &ListId,
    statuses: &[AccessStatus],
) -> Result<u64, StorageError> {
    let result = sqlx::query("DELETE FROM list_access WHERE list_id = $1 AND status = ANY($2)")
        .bind(list_id.as_uuid())
        .bind(status_strings(statuses))
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(result.rows_affected())
}

// lists

pub async fn insert_list<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list: &List,
) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        INSERT INTO lists (id, name, description, owner_id, visibility, tags, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(list.id.as_uuid())
    .bind(&list.name)
    .bind(&list.description)
    .bind(list.owner_id.as_uuid())
    .bind(list.visibility.as_str())
    .bind(&list.tags)
    .bind(list.created_at)
    .bind(list.updated_at)
    .execute(executor)
    .await
    .map_err(write_error("list"))?;
    Ok(())
}

pub async fn get_list<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list_id: &ListId,
) -> Result<Option<List>, StorageError> {
    let query = format!("SELECT {LIST_COLUMNS} FROM lists WHERE id = $1");
    let row: Option<ListRow> = sqlx::query_as(&query)
        .bind(list_id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    row.map(List::try_from).transpose()
}

pub async fn list_lists<'e>(executor: impl sqlx::PgExecutor<'e>) -> Result<Vec<List>, StorageError> {
    let query = format!("SELECT {LIST_COLUMNS} FROM lists ORDER BY created_at");
    let rows: Vec<ListRow> = sqlx::query_as(&query)
        .fetch_all(executor)
        .await
        .map_err(to_storage_error)?;
    collect(rows)
}

pub async fn update_list<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list: &List,
) -> Result<(), StorageError> {
    let result = sqlx::query(
        r#"
        UPDATE lists
        SET name = $2, description = $3, visibility = $4, tags = $5, updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(list.id.as_uuid())
    .bind(&list.name)
    .bind(&list.description)
    .bind(list.visibility.as_str())
    .bind(&list.tags)
    .bind(list.updated_at)
    .execute(executor)
    .await
    .map_err(to_storage_error)?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound { entity: "list" });
    }
    Ok(())
}

pub async fn delete_list<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list_id: &ListId,
) -> Result<(), StorageError> {
    let result = sqlx::query("DELETE FROM lists WHERE id = $1")
        .bind(list_id.as_uuid())
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound { entity: "list" });
    }
    Ok(())
}

// todos

pub async fn insert_todo<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    todo: &Todo,
) -> Result<(), StorageError> {
    let query = format!(
        "INSERT INTO todos ({TODO_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
    );
    sqlx::query(&query)
        .bind(todo.id.as_uuid())
        .bind(todo.list_id.as_uuid())
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(&todo.tags)
        .bind(todo.completed)
        .bind(todo.due_date)
        .bind(todo.start_date)
        .bind(todo.priority.as_str())
        .bind(todo.assigned_to.map(|u| *u.as_uuid()))
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .execute(executor)
        .await
        .map_err(write_error("todo"))?;
    Ok(())
}

pub async fn get_todo<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    todo_id: &TodoId,
) -> Result<Option<Todo>, StorageError> {
    let query = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = $1");
    let row: Option<TodoRow> = sqlx::query_as(&query)
        .bind(todo_id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    row.map(Todo::try_from).transpose()
}

pub async fn list_todos<'e>(executor: impl sqlx::PgExecutor<'e>) -> Result<Vec<Todo>, StorageError> {
    let query = format!("SELECT {TODO_COLUMNS} FROM todos ORDER BY created_at");
    let rows: Vec<TodoRow> = sqlx::query_as(&query)
        .fetch_all(executor)
        .await
        .map_err(to_storage_error)?;
    collect(rows)
}

pub async fn list_todos_by_list<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    list_id: &ListId,
) -> Result<Vec<Todo>, StorageError> {
    let query = format!("SELECT {TODO_COLUMNS} FROM todos WHERE list_id = $1 ORDER BY created_at");
    let rows: Vec<TodoRow> = sqlx::query_as(&query)
        .bind(list_id.as_uuid())
        .fetch_all(executor)
        .await
        .map_err(to_storage_error)?;
    collect(rows)
}

pub async fn update_todo<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    todo: &Todo,
) -> Result<(), StorageError> {
    let result = sqlx::query(
        r#"
        UPDATE todos
        SET title = $2, description = $3, tags = $4, completed = $5, due_date = $6,
            start_date = $7, priority = $8, assigned_to = $9, updated_at = $10
        WHERE id = $1
        "#,
    )
    .bind(todo.id.as_uuid())
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(&todo.tags)
    .bind(todo.completed)
    .bind(todo.due_date)
    .bind(todo.start_date)
    .bind(todo.priority.as_str())
    .bind(todo.assigned_to.map(|u| *u.as_uuid()))
    .bind(todo.updated_at)
    .execute(executor)
    .await
    .map_err(write_error("todo"))?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound { entity: "todo" });
    }
    Ok(())
}

pub async fn delete_todo<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    todo_id: &TodoId,
) -> Result<(), StorageError> {
    let result = sqlx::query("DELETE FROM todos WHERE id = $1")
        .bind(todo_id.as_uuid())
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound { entity: "todo" });
    }
    Ok(())
}

// users

pub async fn insert_user<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user: &User,
) -> Result<(), StorageError> {
    let query = format!("INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)");
    sqlx::query(&query)
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.github_id)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(executor)
        .await
        .map_err(write_error("user"))?;
    Ok(())
}

pub async fn get_user<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user_id: &UserId,
) -> Result<Option<User>, StorageError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row: Option<UserRow> = sqlx::query_as(&query)
        .bind(user_id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(User::from))
}

pub async fn get_user_by_email<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    email: &str,
) -> Result<Option<User>, StorageError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let row: Option<UserRow> = sqlx::query_as(&query)
        .bind(email)
        .fetch_optional(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(row.map(User::from))
}

pub async fn list_users<'e>(executor: impl sqlx::PgExecutor<'e>) -> Result<Vec<User>, StorageError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
    let rows: Vec<UserRow> = sqlx::query_as(&query)
        .fetch_all(executor)
        .await
        .map_err(to_storage_error)?;
    Ok(rows.into_iter().map(User::from).collect())
}

pub async fn update_user<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user: &User,
) -> Result<(), StorageError> {
    let result =
        sqlx::query("UPDATE users SET email = $2, github_id = $3, updated_at = $4 WHERE id = $1")
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(&user.github_id)
            .bind(user.updated_at)
            .execute(executor)
            .await
            .map_err(write_error("user"))?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound { entity: "user" });
    }
    Ok(())
}

pub async fn delete_user<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user_id: &UserId,
) -> Result<(), StorageError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id.as_uuid())
        .execute(executor)
        .await
        .map_err(to_storage_error)?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound { entity: "user" });
    }
    Ok(())
}
