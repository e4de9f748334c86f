pub mod authz;
pub mod claims;
pub mod model;
pub mod role;
pub mod sharing;

pub use authz::{AccessSource, AuthzError, Decision, DenyReason, ResourceRef, Scope, authorize};
pub use claims::Claims;
pub use model::{Access, AccessStatus, List, ListId, Priority, Todo, TodoId, User, UserId, Visibility};
pub use role::Role;
