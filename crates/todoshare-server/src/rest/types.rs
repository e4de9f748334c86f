use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use todoshare_core::model::{Priority, UserId, Visibility};
use todoshare_core::role::Role;

use crate::service::{ListPatch, NewList, NewTodo, NewUser, TodoPatch, UserPatch};

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub shared_with: Vec<UserId>,
}

impl From<CreateListRequest> for NewList {
    fn from(req: CreateListRequest) -> Self {
        NewList {
            name: req.name,
            description: req.description,
            owner_id: req.owner_id,
            visibility: req.visibility,
            tags: req.tags,
            shared_with: req.shared_with,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateListRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
}

impl From<UpdateListRequest> for ListPatch {
    fn from(req: UpdateListRequest) -> Self {
        ListPatch {
            name: req.name,
            description: req.description,
            visibility: req.visibility,
            tags: req.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub user_id: UserId,
    /// Falls back to the invitee's global role.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    pub assigned_to: Option<UserId>,
}

impl From<CreateTodoRequest> for NewTodo {
    fn from(req: CreateTodoRequest) -> Self {
        NewTodo {
            title: req.title,
            description: req.description,
            tags: req.tags,
            due_date: req.due_date,
            start_date: req.start_date,
            priority: req.priority,
            assigned_to: req.assigned_to,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub completed: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<UserId>,
}

impl From<UpdateTodoRequest> for TodoPatch {
    fn from(req: UpdateTodoRequest) -> Self {
        TodoPatch {
            title: req.title,
            description: req.description,
            tags: req.tags,
            completed: req.completed,
            due_date: req.due_date,
            start_date: req.start_date,
            priority: req.priority,
            assigned_to: req.assigned_to,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub github_id: Option<String>,
    pub role: Role,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        NewUser {
            email: req.email,
            github_id: req.github_id,
            role: req.role,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub github_id: Option<String>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        UserPatch {
            email: req.email,
            github_id: req.github_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
