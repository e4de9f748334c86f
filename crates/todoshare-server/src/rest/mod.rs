mod handlers;
mod types;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use todoshare_storage::Database;

const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1 MB

use crate::error::ApiError;
use crate::middleware::{AuthState, auth_middleware};
use crate::service::TodoService;

pub struct AppState<D: Database> {
    pub service: Arc<TodoService<D>>,
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

/// Dropping the handler future on expiry drops its transaction, which rolls it back.
async fn timeout_middleware(
    State(timeout): State<Duration>,
    request: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(%path, timeout_ms = timeout.as_millis() as u64, "request timed out");
            ApiError::Timeout.into_response()
        }
    }
}

pub fn create_router<D>(state: AppState<D>, auth: AuthState, timeout: Duration) -> Router
where
    D: Database + 'static,
{
    Router::new()
        .route(
            "/v1/lists",
            post(handlers::create_list).get(handlers::list_all_lists),
        )
        .route("/v1/lists/owned", get(handlers::owned_lists))
        .route("/v1/lists/pending", get(handlers::pending_lists))
        .route("/v1/lists/accepted", get(handlers::accepted_lists))
        .route(
            "/v1/lists/{list_id}",
            get(handlers::get_list)
                .patch(handlers::update_list)
                .delete(handlers::delete_list),
        )
        .route("/v1/lists/{list_id}/owner", get(handlers::list_owner))
        .route("/v1/lists/{list_id}/users", get(handlers::list_members))
        .route(
            "/v1/lists/{list_id}/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/v1/lists/{list_id}/access",
            get(handlers::list_access).post(handlers::invite),
        )
        .route("/v1/lists/{list_id}/access/accept", post(handlers::accept))
        .route(
            "/v1/lists/{list_id}/access/{user_id}",
            get(handlers::get_access).delete(handlers::revoke),
        )
        .route("/v1/todos", get(handlers::list_all_todos))
        .route("/v1/todos/mine", get(handlers::my_todos))
        .route(
            "/v1/todos/{todo_id}",
            get(handlers::get_todo)
                .patch(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        .route("/v1/todos/{todo_id}/complete", post(handlers::complete_todo))
        .route(
            "/v1/users",
            post(handlers::create_user).get(handlers::list_users),
        )
        .route("/v1/users/by-email/{email}", get(handlers::get_user_by_email))
        .route(
            "/v1/users/{user_id}",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .layer(middleware::from_fn_with_state(timeout, timeout_middleware))
        .with_state(state)
}
