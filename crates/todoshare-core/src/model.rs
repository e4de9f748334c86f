use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(ListId);
uuid_id!(TodoId);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Shared,
    Public,
}

string_enum!(Visibility, "visibility", {
    Private => "private",
    Shared => "shared",
    Public => "public",
});

/// Lifecycle state of a user's membership in a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Owner,
    Pending,
    Accepted,
}

string_enum!(AccessStatus, "access status", {
    Owner => "owner",
    Pending => "pending",
    Accepted => "accepted",
});

impl AccessStatus {
    /// Statuses that let a user see a list and its metadata.
    pub const LIST_VISIBLE: [AccessStatus; 3] = [
        AccessStatus::Owner,
        AccessStatus::Accepted,
        AccessStatus::Pending,
    ];

    /// Statuses that let a user touch the todos inside a list.
    pub const TODO_VISIBLE: [AccessStatus; 2] = [AccessStatus::Owner, AccessStatus::Accepted];

    /// Statuses removed when a list turns private.
    pub const REVOCABLE: [AccessStatus; 2] = [AccessStatus::Pending, AccessStatus::Accepted];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

string_enum!(Priority, "priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub github_id: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub name: String,
    pub description: String,
    pub owner_id: UserId,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub list_id: ListId,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub assigned_to: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One user's membership in one list. At most one exists per `(list_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub list_id: ListId,
    pub user_id: UserId,
    pub role: Role,
    pub status: AccessStatus,
}

impl Access {
    pub fn owner(list_id: ListId, user_id: UserId) -> Self {
        Self {
            list_id,
            user_id,
            role: Role::Admin,
            status: AccessStatus::Owner,
        }
    }

    pub fn pending(list_id: ListId, user_id: UserId, role: Role) -> Self {
        Self {
            list_id,
            user_id,
            role,
            status: AccessStatus::Pending,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.status == AccessStatus::Owner
    }
}
