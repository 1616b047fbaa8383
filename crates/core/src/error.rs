//! Error types for the pipeline core.

use alloy::{consensus::crypto::RecoveryError, eips::eip2718::Eip2718Error};

/// Result type alias for block-store and metadata-store operations.
pub type StoreResult<T, E = StoreError> = Result<T, E>;

/// A malformed upstream payload.
///
/// Every variant is fatal for the payload and harmless for the process: the
/// driver logs it and drops the block.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The block RLP failed to decode.
    #[error("block RLP is malformed: {0}")]
    BlockRlp(alloy::rlp::Error),

    /// The receipts RLP failed to decode.
    #[error("receipts RLP is malformed: {0}")]
    ReceiptsRlp(Eip2718Error),

    /// A transaction signature did not yield a sender.
    #[error("sender recovery failed for transaction {index}: {source}")]
    SenderRecovery {
        /// Position of the offending transaction in the block.
        index: usize,
        /// The underlying recovery failure.
        #[source]
        source: RecoveryError,
    },

    /// A transaction was signed for a different chain.
    #[error("transaction {index} carries chain id {got}, expected {expected}")]
    ChainIdMismatch {
        /// Position of the offending transaction in the block.
        index: usize,
        /// Chain id embedded in the transaction.
        got: u64,
        /// Chain id this indexer is configured for.
        expected: u64,
    },

    /// The payload's receipt list does not pair with its transactions.
    #[error("payload has {receipts} receipts for {transactions} transactions")]
    ReceiptCountMismatch {
        /// Number of receipts decoded.
        receipts: usize,
        /// Number of transactions in the block.
        transactions: usize,
    },
}

/// Error type for block-store and metadata-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage backend failed; transient I/O errors land here.
    #[error("store backend error: {0}")]
    Backend(#[from] Box<dyn core::error::Error + Send + Sync + 'static>),

    /// A uniqueness conflict escaped the statement-level on-conflict
    /// handling. Treated as a bug in the caller or the schema.
    #[error("schema constraint violation: {0}")]
    ConstraintViolation(String),

    /// The database schema is older than this build requires.
    #[error("schema version {found} is below the required minimum {required}")]
    SchemaVersion {
        /// Version reported by the database.
        found: i64,
        /// Minimum version this build supports.
        required: i64,
    },

    /// The operation was cancelled before completion.
    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Wrap any error as a backend error.
    pub fn backend<E>(error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(error))
    }
}
