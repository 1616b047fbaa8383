//! Error types for the sync drivers.

use ipld_eth_core::{ConvertError, StoreError};

/// Errors surfaced when talking to the upstream node.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The upstream node is unreachable or rejected the call.
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] jsonrpsee::core::client::Error),

    /// A subscription notification failed to decode.
    #[error("subscription notification malformed: {0}")]
    Notification(#[from] serde_json::Error),
}

/// A failure of one payload's trip through the pipeline.
///
/// Conversion failures condemn the payload; publish and index failures are
/// transient store trouble, and the block stays missing until a later
/// ingest or back-fill pass retries it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The payload is malformed and will never index.
    #[error("payload malformed: {0}")]
    Convert(#[from] ConvertError),

    /// The blob store rejected the payload's objects.
    #[error("blob store write failed: {0}")]
    Publish(StoreError),

    /// The metadata store rejected the payload's rows.
    #[error("metadata index failed: {0}")]
    Index(StoreError),
}

impl PipelineError {
    /// Whether the failure condemns the payload rather than the backend.
    pub const fn is_payload_local(&self) -> bool {
        matches!(self, Self::Convert(_))
    }

    /// Whether the failure indicates a bug the process must stop for.
    ///
    /// A uniqueness conflict that escaped the statement-level on-conflict
    /// clauses means the schema and the indexer disagree; continuing would
    /// silently drop data, so the service shuts down for diagnosis.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Publish(StoreError::ConstraintViolation(_))
                | Self::Index(StoreError::ConstraintViolation(_))
        )
    }
}

/// Errors aborting a whole back-fill tick.
#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    /// The upstream node could not serve the tick.
    #[error(transparent)]
    Upstream(#[from] SyncError),

    /// The index could not be queried for watermarks or gaps.
    #[error("index query failed: {0}")]
    Store(#[from] StoreError),
}
