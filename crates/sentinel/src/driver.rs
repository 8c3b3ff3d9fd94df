//! Database driver contract
//!
//! A driver opens admin connections to an instance. A connection can dump the
//! schema of one database and read the migration history the control plane
//! recorded for it. Callers must [`Connection::close`] every connection they
//! open.

use crate::error::DriverError;
use crate::model::{DataSource, MigrationHistory};
use async_trait::async_trait;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[async_trait]
pub trait Driver: Send + Sync {
    /// Connect with the instance's admin credentials, no database selected
    async fn connect(&self, data_source: &DataSource) -> DriverResult<Box<dyn Connection>>;
}

#[async_trait]
pub trait Connection: Send + Sync {
    /// Schema-only DDL of `database`
    ///
    /// Returns [`DriverError::NotFound`] if the database no longer exists.
    async fn dump_schema_only(&self, database: &str) -> DriverResult<String>;

    /// Migration history of `database`, most recent first
    async fn find_migration_history(
        &self,
        database: &str,
        limit: usize,
    ) -> DriverResult<Vec<MigrationHistory>>;

    async fn close(&self) -> DriverResult<()>;
}
