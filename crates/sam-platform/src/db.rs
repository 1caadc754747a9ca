use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

const MAX_CONNECTIONS: u32 = 10;

/// Pool on the system of record.
pub async fn connect_database(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .context("failed to connect to the system of record")?;

    info!(max_connections = MAX_CONNECTIONS, "connected to postgres");
    Ok(pool)
}
