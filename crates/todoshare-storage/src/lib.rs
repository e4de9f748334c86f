pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::{InMemoryDatabase, InMemoryTransaction};
pub use postgres::{PostgresDatabase, PostgresTransaction};
pub use traits::{
    AccessStore, Database, ListStore, StorageError, TodoStore, Transaction, UserStore,
};
