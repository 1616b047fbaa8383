//! Capability traits for the pipeline collaborators.
//!
//! Each stage of convert → publish → index is a narrow trait so drivers can
//! be assembled from real backends in production and capture doubles in
//! tests. All async methods return futures that are `Send`.

use crate::{ConvertError, StoreResult};
use ipld_eth_types::{BlockRange, CidPayload, ConvertedPayload, DataKind, StateDiffPayload};
use std::future::Future;

/// Decodes one upstream payload into its typed in-memory graph.
///
/// Implementations must be pure: no I/O, no shared mutable state, safe to
/// call from any number of workers at once.
pub trait PayloadConverter: Send + Sync + 'static {
    /// Decode `payload`, failing if any part of it is malformed.
    fn convert(&self, payload: StateDiffPayload) -> Result<ConvertedPayload, ConvertError>;
}

/// Writes every IPLD object of a converted payload into the block store.
pub trait IpldPublisher: Send + Sync + 'static {
    /// Persist the payload's blobs and return the CIDs the indexer should
    /// reference. Re-publishing identical bytes is a no-op.
    fn publish(
        &self,
        payload: &ConvertedPayload,
    ) -> impl Future<Output = StoreResult<CidPayload>> + Send;
}

/// Writes the relational rows referencing a published payload's CIDs.
pub trait CidIndexer: Send + Sync + 'static {
    /// Commit all rows for one payload atomically.
    ///
    /// Re-indexing a block is idempotent except for the header's validation
    /// counter, which increments by one per pass.
    fn index(&self, cids: &CidPayload) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Range-scoped bulk deletion and validation reset.
pub trait Cleaner: Send + Sync + 'static {
    /// Remove the selected data layer (and its dependents) for every range,
    /// blobs before metadata, leaf entities before their owners.
    fn clean(
        &self,
        ranges: &[BlockRange],
        kind: DataKind,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Zero the validation counter of every header in the ranges.
    fn reset_validation(
        &self,
        ranges: &[BlockRange],
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Read view over the header index, used by the gap-filler.
pub trait IndexView: Send + Sync + 'static {
    /// Highest block number present in the index, if any.
    fn max_block_number(&self) -> impl Future<Output = StoreResult<Option<u64>>> + Send;

    /// Interior ranges of block numbers missing between indexed blocks.
    fn find_gaps(&self) -> impl Future<Output = StoreResult<Vec<BlockRange>>> + Send;
}
