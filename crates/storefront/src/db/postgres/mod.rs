//! `PostgreSQL` adapter for the repository ports.
//!
//! Queries are runtime-checked (`sqlx::query_as::<_, Row>`) and decode into
//! private row types that convert into domain models.

mod cart;
mod catalog;
mod orders;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{HealthRepository, RepositoryError};

/// Repository implementation backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HealthRepository for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map unique-constraint violations to `Conflict`.
fn conflict_or_database(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
