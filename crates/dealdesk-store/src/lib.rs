//! # dealdesk-store
//!
//! Postgres persistence for the deal-lifecycle engine. Repositories are
//! modules of async functions over `&mut PgConnection`, so services can
//! compose several calls into one serializable transaction. Migrations
//! are embedded with `sqlx::migrate!`.

pub mod repo;
pub mod rows;

use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use dealdesk_core::{DealdeskError, DealdeskResult};

/// Embedded migrations, applied at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connect a pool and run pending migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> DealdeskResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| DealdeskError::internal(format!("Database connection failed: {e}")))?;
    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| DealdeskError::internal(format!("Migration failed: {e}")))?;
    Ok(pool)
}

/// Begin a serializable transaction. Every state transition runs inside
/// one of these; row locks serialise per-entity ordering.
pub async fn serializable_tx(pool: &PgPool) -> DealdeskResult<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await.db()?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await
        .db()?;
    Ok(tx)
}

/// Map sqlx errors onto the shared error type. Unique-index violations
/// surface as invariant violations so racing writers get a meaningful
/// rejection instead of a 500.
pub fn map_sqlx_error(e: sqlx::Error) -> DealdeskError {
    match &e {
        sqlx::Error::RowNotFound => DealdeskError::not_found("Row"),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DealdeskError::invariant(format!("Concurrent update conflict: {}", db.message()))
        }
        _ => DealdeskError::internal(format!("Database error: {e}")),
    }
}

/// Postfix adapter for `Result<T, sqlx::Error>`.
pub trait SqlxResultExt<T> {
    fn db(self) -> DealdeskResult<T>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn db(self) -> DealdeskResult<T> {
        self.map_err(map_sqlx_error)
    }
}

/// Convenience alias used across repository signatures.
pub type Conn = PgConnection;

#[cfg(test)]
mod tests {
    use super::*;
    use dealdesk_core::ErrorKind;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_other_errors_map_to_internal() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}

