use sqlx::PgConnection;

/// A handle to a live database connection which can be lent out to run queries
pub trait ConnectionHandle {
    /// Borrows the underlying connection so a query can execute against it
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Represents the set of external systems the service talks to. Driven adapters receive
/// one of these on each call so business logic never needs to know where the connection
/// came from.
pub trait ExternalConnectivity {
    type DbHandle<'cxn_borrow>: ConnectionHandle + Send
    where
        Self: 'cxn_borrow;

    /// Acquires a database connection handle
    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;
}
