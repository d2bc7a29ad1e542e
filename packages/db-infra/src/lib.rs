//! Database connection lifecycle, configuration and migration helpers shared
//! by service processes.

pub mod config;
pub mod error;
pub mod infra;
pub mod migration;

pub use config::db::{LogMode, MongoConfig, PostgresConfig};
pub use error::{DbInfraError, DriverError};
pub use infra::db::{
    Backend, ConnectionManager, GateState, ManagerOptions, ManagerStats, MongoBackend,
    MongoManager, PostgresBackend, PostgresManager,
};
pub use migration::{rollback_migration, run_migration, MigrationRunner, SeaOrmMigrations};
