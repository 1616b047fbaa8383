//! Schema version gate.
//!
//! Migrations are applied by an external tool; at startup the process only
//! verifies the database is at least at the level this build was written
//! against.

use crate::SqlStoreError;
use ipld_eth_core::{StoreError, StoreResult};
use sqlx::{PgPool, Row};

/// Minimum migration level this build supports.
pub const MIN_SCHEMA_VERSION: i64 = 1;

/// Verify the database is migrated to at least [`MIN_SCHEMA_VERSION`].
pub async fn ensure_schema_version(pool: &PgPool) -> StoreResult<()> {
    let row = sqlx::query("SELECT COALESCE(MAX(version), 0) AS version FROM eth.schema_version")
        .fetch_one(pool)
        .await
        .map_err(SqlStoreError::from)?;
    let found = i64::from(row.get::<i32, _>("version"));
    if found < MIN_SCHEMA_VERSION {
        return Err(StoreError::SchemaVersion { found, required: MIN_SCHEMA_VERSION });
    }
    Ok(())
}
