//! The convert → publish → index pipeline shared by both drivers.

use crate::PipelineError;
use ipld_eth_core::{CidIndexer, IpldPublisher, PayloadConverter};
use ipld_eth_types::StateDiffPayload;

/// One payload's full trip from wire bytes to committed rows.
///
/// The live service and the back-filler both drive payloads through the
/// same instance; all three stages are safe to share across workers.
#[derive(Debug)]
pub struct Pipeline<C, P, I> {
    converter: C,
    publisher: P,
    indexer: I,
}

impl<C, P, I> Pipeline<C, P, I>
where
    C: PayloadConverter,
    P: IpldPublisher,
    I: CidIndexer,
{
    /// Assemble a pipeline from its stages.
    pub const fn new(converter: C, publisher: P, indexer: I) -> Self {
        Self { converter, publisher, indexer }
    }

    /// Process one payload; returns the indexed block number.
    ///
    /// The indexer only runs once the publisher has committed, so a
    /// successful return means every referenced blob is durable.
    pub async fn process(&self, payload: StateDiffPayload) -> Result<u64, PipelineError> {
        let converted = self.converter.convert(payload)?;
        let block_number = converted.block_number();
        let cids = self.publisher.publish(&converted).await.map_err(PipelineError::Publish)?;
        self.indexer.index(&cids).await.map_err(PipelineError::Index)?;
        Ok(block_number)
    }
}
