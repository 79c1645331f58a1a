//! Optional PostgreSQL pool.
//!
//! Created at startup when `DATABASE_URL` is set, pinged by the health check
//! and closed on shutdown. The request path never touches it.

use common::secret::{ExposeSecret, SecretString};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Statement timeout applied to every connection, in seconds.
const STATEMENT_TIMEOUT_SECS: u32 = 5;

/// Connect and verify the pool with a ping.
///
/// # Errors
///
/// Returns the sqlx error if the database cannot be reached.
pub async fn connect(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    let url = add_query_timeout(database_url.expose_secret(), STATEMENT_TIMEOUT_SECS);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

/// Adds statement_timeout to the database URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}options=-c%20statement_timeout%3D{}s",
        url, separator, timeout_secs
    )
}
