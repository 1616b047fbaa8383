//! Error types for the Postgres backend.

use ipld_eth_core::StoreError;

/// Error raised by the sqlx-backed stores.
#[derive(Debug, thiserror::Error)]
pub enum SqlStoreError {
    /// The database driver reported an error.
    #[error(transparent)]
    Sql(#[from] sqlx::Error),

    /// A row referenced an entity the same payload should have written.
    #[error("inconsistent payload: {0}")]
    InconsistentPayload(String),
}

impl From<SqlStoreError> for StoreError {
    fn from(error: SqlStoreError) -> Self {
        match error {
            SqlStoreError::Sql(sqlx::Error::Database(db))
                if db.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                Self::ConstraintViolation(db.message().to_owned())
            }
            SqlStoreError::Sql(other) => Self::backend(other),
            SqlStoreError::InconsistentPayload(message) => Self::ConstraintViolation(message),
        }
    }
}
