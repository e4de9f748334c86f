use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use todoshare_core::claims::Claims;
use todoshare_core::model::{ListId, TodoId, UserId};
use todoshare_storage::Database;

use crate::error::ApiError;

use super::AppState;
use super::types::*;

type Caller = Extension<Claims>;

// ---- lists ----

pub async fn create_list<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Json(req): Json<CreateListRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let list = state.service.create_list(&claims, req.into()).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn list_all_lists<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list_all_lists(&claims).await?))
}

pub async fn owned_lists<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.owned_lists(&claims).await?))
}

pub async fn pending_lists<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.pending_lists(&claims).await?))
}

pub async fn accepted_lists<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.accepted_lists(&claims).await?))
}

pub async fn get_list<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_list(&claims, list_id).await?))
}

pub async fn update_list<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
    Json(req): Json<UpdateListRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.service.update_list(&claims, list_id, req.into()).await?,
    ))
}

pub async fn delete_list<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_list(&claims, list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_owner<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list_owner(&claims, list_id).await?))
}

pub async fn list_todos<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list_todos(&claims, list_id).await?))
}

// ---- access ----

pub async fn invite<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
    Json(req): Json<InviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let access = state
        .service
        .invite(&claims, list_id, req.user_id, req.role)
        .await?;
    Ok((StatusCode::CREATED, Json(access)))
}

pub async fn accept<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.accept(&claims, list_id).await?))
}

pub async fn list_members<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list_members(&claims, list_id).await?))
}

pub async fn list_access<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list_access(&claims, list_id).await?))
}

pub async fn get_access<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path((list_id, user_id)): Path<(ListId, UserId)>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.service.get_access(&claims, list_id, user_id).await?,
    ))
}

pub async fn revoke<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path((list_id, user_id)): Path<(ListId, UserId)>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.revoke(&claims, list_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- todos ----

pub async fn create_todo<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(list_id): Path<ListId>,
    Json(req): Json<CreateTodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = state
        .service
        .create_todo(&claims, list_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn list_all_todos<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list_all_todos(&claims).await?))
}

pub async fn my_todos<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.my_todos(&claims).await?))
}

pub async fn get_todo<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(todo_id): Path<TodoId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_todo(&claims, todo_id).await?))
}

pub async fn update_todo<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(todo_id): Path<TodoId>,
    Json(req): Json<UpdateTodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.service.update_todo(&claims, todo_id, req.into()).await?,
    ))
}

pub async fn complete_todo<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(todo_id): Path<TodoId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.complete_todo(&claims, todo_id).await?))
}

pub async fn delete_todo<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(todo_id): Path<TodoId>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_todo(&claims, todo_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- users ----

pub async fn create_user<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.service.create_user(&claims, req.into()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list_users(&claims).await?))
}

pub async fn get_user<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_user(&claims, user_id).await?))
}

pub async fn get_user_by_email<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_user_by_email(&claims, &email).await?))
}

pub async fn update_user<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(user_id): Path<UserId>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.service.update_user(&claims, user_id, req.into()).await?,
    ))
}

pub async fn delete_user<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(claims): Caller,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_user(&claims, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- probes ----

pub async fn healthz() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

pub async fn readyz<D: Database + 'static>(State(state): State<AppState<D>>) -> impl IntoResponse {
    match state.service.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ready" })),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}
