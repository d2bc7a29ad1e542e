//! Migration runner boundary.
//!
//! The engine itself is external. This module only fixes the two operations
//! services call at startup or from tooling: apply everything pending, and
//! step back one unit.

pub mod scaffold;

use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use thiserror::Error;
use tracing::info;

use crate::error::DbInfraError;
use crate::infra::db::postgres::PostgresManager;

pub use scaffold::{
    create_migration_files, create_migration_files_default, DbType, MigrationFiles,
    DEFAULT_MIGRATIONS_DIR,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MigrateError {
    /// Nothing to apply or roll back.
    #[error("no change")]
    NoChange,
    #[error("{0}")]
    Failed(String),
}

/// Engine behind [`run_migration`] and [`rollback_migration`].
///
/// [`SeaOrmMigrations`] is the only runner shipped here. There is none for
/// the document store: services that scaffold `.json` migrations with
/// [`DbType::MongoDb`](crate::migration::scaffold::DbType::MongoDb) supply
/// their own implementation.
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    /// Apply every pending migration.
    async fn up(&self) -> Result<(), MigrateError>;

    /// Move `n` migrations forward, or `|n|` back when negative.
    async fn steps(&self, n: i32) -> Result<(), MigrateError>;
}

/// Apply all pending migrations. An up-to-date schema is not an error.
pub async fn run_migration<R>(runner: &R) -> Result<(), DbInfraError>
where
    R: MigrationRunner + ?Sized,
{
    match runner.up().await {
        Ok(()) => {
            info!(migrate = "done");
            Ok(())
        }
        Err(MigrateError::NoChange) => {
            info!(migrate = "skipped", up_to_date = true);
            Ok(())
        }
        Err(MigrateError::Failed(message)) => Err(DbInfraError::Migration { message }),
    }
}

/// Roll back exactly one migration.
pub async fn rollback_migration<R>(runner: &R) -> Result<(), DbInfraError>
where
    R: MigrationRunner + ?Sized,
{
    runner
        .steps(-1)
        .await
        .map_err(|e| DbInfraError::Migration {
            message: e.to_string(),
        })?;
    info!(migrate = "rolled_back", steps = 1);
    Ok(())
}

/// [`MigrationRunner`] over a SeaORM migrator and a live connection.
pub struct SeaOrmMigrations<M> {
    db: DatabaseConnection,
    _migrator: PhantomData<fn() -> M>,
}

impl<M: MigratorTrait + 'static> SeaOrmMigrations<M> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _migrator: PhantomData,
        }
    }

    /// Runner bound to the manager's current client.
    pub fn from_manager(manager: &PostgresManager) -> Result<Self, DbInfraError> {
        manager
            .client()
            .map(Self::new)
            .ok_or(DbInfraError::NotConnected)
    }
}

fn failed(e: sea_orm::DbErr) -> MigrateError {
    MigrateError::Failed(e.to_string())
}

#[async_trait]
impl<M: MigratorTrait + 'static> MigrationRunner for SeaOrmMigrations<M> {
    async fn up(&self) -> Result<(), MigrateError> {
        let pending = M::get_pending_migrations(&self.db).await.map_err(failed)?;
        if pending.is_empty() {
            return Err(MigrateError::NoChange);
        }
        M::up(&self.db, None).await.map_err(failed)
    }

    async fn steps(&self, n: i32) -> Result<(), MigrateError> {
        if n == 0 {
            return Err(MigrateError::NoChange);
        }
        if n > 0 {
            let pending = M::get_pending_migrations(&self.db).await.map_err(failed)?;
            if pending.is_empty() {
                return Err(MigrateError::NoChange);
            }
            return M::up(&self.db, Some(n.unsigned_abs())).await.map_err(failed);
        }

        let applied = M::get_applied_migrations(&self.db).await.map_err(failed)?;
        if applied.is_empty() {
            return Err(MigrateError::NoChange);
        }
        M::down(&self.db, Some(n.unsigned_abs())).await.map_err(failed)
    }
}
