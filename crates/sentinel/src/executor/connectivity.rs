//! Connectivity and schema drift detectors

use super::{with_timeout, ScanExecutor};
use crate::driver::Connection;
use crate::error::DriverError;
use crate::metrics::CheckOutcome;
use crate::model::{
    AnomalyPayload, AnomalyType, ConnectionPayload, DataSource, Database, Instance,
    SchemaDriftPayload,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

/// An open connection that is closed on every exit path
///
/// [`OpenConnection::close`] closes it in place. If the guard is dropped while
/// still open (a panic or an aborted scan task), the close is handed to the
/// runtime instead.
struct OpenConnection {
    connection: Arc<dyn Connection>,
    closed: bool,
}

impl OpenConnection {
    fn new(connection: Box<dyn Connection>) -> Self {
        Self {
            connection: Arc::from(connection),
            closed: false,
        }
    }

    fn get(&self) -> &dyn Connection {
        self.connection.as_ref()
    }

    async fn close(mut self, limit: Option<Duration>) -> Result<(), DriverError> {
        self.closed = true;
        with_timeout(limit, self.connection.close(), DriverError::Timeout).await
    }
}

impl Drop for OpenConnection {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let connection = self.connection.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = connection.close().await {
                        warn!(error = %e, "Failed to close abandoned connection");
                    }
                });
            }
            Err(_) => warn!("No runtime to close abandoned connection"),
        }
    }
}

impl ScanExecutor {
    /// Connect to the instance, then compare the live schema of `database`
    /// with its latest recorded migration
    ///
    /// Returns the connectivity outcome and the schema drift outcome. Drift is
    /// only checked over a successful connection.
    pub async fn check_connection(
        &self,
        instance: &Instance,
        data_source: &DataSource,
        database: &Database,
    ) -> (CheckOutcome, CheckOutcome) {
        let connection = match with_timeout(
            self.call_timeout,
            self.driver.connect(data_source),
            DriverError::Timeout,
        )
        .await
        {
            Ok(connection) => OpenConnection::new(connection),
            Err(e) => {
                debug!(
                    instance = %instance.name,
                    database = %database.name,
                    error = %e,
                    "Connection check failed"
                );
                let payload = AnomalyPayload::Connection(ConnectionPayload {
                    detail: e.to_string(),
                });
                let connectivity = self.raise(instance, database, payload).await;
                return (connectivity, CheckOutcome::Skipped);
            }
        };

        let connectivity = self
            .clear(instance, database, AnomalyType::DatabaseConnection)
            .await;
        let drift = self
            .check_schema_drift(connection.get(), instance, database)
            .await;

        if let Err(e) = connection.close(self.call_timeout).await {
            warn!(
                instance = %instance.name,
                database = %database.name,
                error = %e,
                "Failed to close connection"
            );
        }

        (connectivity, drift)
    }

    async fn check_schema_drift(
        &self,
        connection: &dyn Connection,
        instance: &Instance,
        database: &Database,
    ) -> CheckOutcome {
        let actual_schema = match with_timeout(
            self.call_timeout,
            connection.dump_schema_only(&database.name),
            DriverError::Timeout,
        )
        .await
        {
            Ok(schema) => schema,
            Err(e) if e.is_not_found() => {
                debug!(
                    instance = %instance.name,
                    database = %database.name,
                    "Database no longer exists, skipping schema drift check"
                );
                return CheckOutcome::Skipped;
            }
            Err(e) => {
                error!(
                    instance = %instance.name,
                    database = %database.name,
                    error = %e,
                    "Failed to dump database schema"
                );
                return CheckOutcome::Failed;
            }
        };

        let history = match with_timeout(
            self.call_timeout,
            connection.find_migration_history(&database.name, 1),
            DriverError::Timeout,
        )
        .await
        {
            Ok(history) => history,
            Err(e) => {
                error!(
                    instance = %instance.name,
                    database = %database.name,
                    error = %e,
                    "Failed to read migration history"
                );
                return CheckOutcome::Failed;
            }
        };

        // Nothing recorded yet, so there is no expectation to drift from
        let Some(latest) = history.into_iter().next() else {
            return CheckOutcome::Skipped;
        };

        if latest.schema == actual_schema {
            self.clear(instance, database, AnomalyType::DatabaseSchemaDrift)
                .await
        } else {
            let payload = AnomalyPayload::SchemaDrift(SchemaDriftPayload {
                version: latest.version,
                expected_schema: latest.schema,
                actual_schema,
            });
            self.raise(instance, database, payload).await
        }
    }
}
