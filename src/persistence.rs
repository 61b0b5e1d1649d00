pub mod db_task_driven_ports;

use crate::domain::DrivenPortError;
use crate::external_connections;
use crate::external_connections::ConnectionHandle;
use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres};

/// Data structure which owns clients for connecting to external systems.
/// Allows business logic to be agnostic of the external systems it communicates with
/// so driven adapters can easily be swapped out for other implementations
#[derive(Clone)]
pub struct ExternalConnectivity {
    db: PgPool,
}

impl ExternalConnectivity {
    /// Accepts the database pool shared by every request and wraps it
    pub fn new(db: PgPool) -> Self {
        ExternalConnectivity { db }
    }
}

/// A handle from ExternalConnectivity which holds a connection checked out of the pool
pub struct PoolConnectionHandle {
    active_connection: PoolConnection<Postgres>,
}

impl ConnectionHandle for PoolConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection {
        &mut self.active_connection
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    type DbHandle<'cxn_borrow> = PoolConnectionHandle;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error> {
        let handle = PoolConnectionHandle {
            active_connection: self
                .db
                .acquire()
                .await
                .context("acquiring a connection from the database pool")?,
        };

        Ok(handle)
    }
}

/// Sorts a sqlx failure into the port error taxonomy. SQLSTATE classes 22 (data exception)
/// and 23 (integrity constraint violation) mean the store refused the row; everything else
/// is treated as the store being unreachable.
fn port_error(err: sqlx::Error, trying_to: &'static str) -> DrivenPortError {
    let row_rejected = match &err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code.starts_with("22") || code.starts_with("23")),
        _ => false,
    };
    let cause = anyhow::Error::new(err).context(trying_to);

    if row_rejected {
        DrivenPortError::ConstraintViolation(cause)
    } else {
        DrivenPortError::StoreUnavailable(cause)
    }
}
