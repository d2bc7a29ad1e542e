pub mod manager;
pub mod mongo;
pub mod pg_errors;
pub mod postgres;

pub use manager::{
    resolve_identity, Backend, ConnectionManager, GateState, ManagerOptions, ManagerStats,
    DEFAULT_IDENTITY,
};
pub use mongo::{MongoBackend, MongoManager};
pub use postgres::{PostgresBackend, PostgresManager};
