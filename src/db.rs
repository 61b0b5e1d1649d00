use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// How long a request waits for a pooled connection before the store counts as unavailable
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a bounded connection pool and verifies the database is reachable
pub async fn connect_sqlx(
    options: PgConnectOptions,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;

    info!(max_connections, "Connected to the task database");
    Ok(pool)
}
