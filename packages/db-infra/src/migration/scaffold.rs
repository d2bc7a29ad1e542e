//! Timestamped up/down migration file pairs.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::DbInfraError;

pub const DEFAULT_MIGRATIONS_DIR: &str = "./migrations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    /// Scaffolds `.json` files only. Applying them needs a caller-provided
    /// [`MigrationRunner`](super::MigrationRunner).
    MongoDb,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Postgres => "postgres",
            DbType::MongoDb => "mongodb",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            DbType::Postgres => "sql",
            DbType::MongoDb => "json",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = DbInfraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(DbType::Postgres),
            "mongodb" => Ok(DbType::MongoDb),
            other => Err(DbInfraError::config(format!("db type is invalid: '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFiles {
    pub up: PathBuf,
    pub down: PathBuf,
}

/// Create `<unix_ts>_<name>.up.<ext>` and `<unix_ts>_<name>.down.<ext>` in
/// `dir`. Either both files exist afterwards or neither does.
pub fn create_migration_files(
    dir: impl AsRef<Path>,
    name: &str,
    db_type: DbType,
) -> Result<MigrationFiles, DbInfraError> {
    let timestamp = OffsetDateTime::now_utc().unix_timestamp();
    create_migration_files_at(dir.as_ref(), name, db_type, timestamp)
}

/// [`create_migration_files`] in [`DEFAULT_MIGRATIONS_DIR`].
pub fn create_migration_files_default(
    name: &str,
    db_type: DbType,
) -> Result<MigrationFiles, DbInfraError> {
    create_migration_files(DEFAULT_MIGRATIONS_DIR, name, db_type)
}

fn create_migration_files_at(
    dir: &Path,
    name: &str,
    db_type: DbType,
    timestamp: i64,
) -> Result<MigrationFiles, DbInfraError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DbInfraError::config("migration filename is not provided"));
    }
    if name.contains(['/', '\\']) {
        return Err(DbInfraError::config(format!(
            "migration filename must not contain path separators: '{name}'"
        )));
    }

    let ext = db_type.extension();
    let files = MigrationFiles {
        up: dir.join(format!("{timestamp}_{name}.up.{ext}")),
        down: dir.join(format!("{timestamp}_{name}.down.{ext}")),
    };

    create_empty(&files.up)?;

    if let Err(e) = create_empty(&files.down) {
        if let Err(rm_err) = fs::remove_file(&files.up) {
            warn!(
                path = %files.up.display(),
                error = %rm_err,
                "failed to remove up migration after down creation failed"
            );
        }
        return Err(e);
    }

    info!(
        scaffold = "created",
        db_type = %db_type,
        up = %files.up.display(),
        down = %files.down.display()
    );
    Ok(files)
}

// Never truncates an existing migration.
fn create_empty(path: &Path) -> Result<(), DbInfraError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| DbInfraError::Io {
            message: format!("failed to create {}: {e}", path.display()),
        })
}
