//! Historical diff retrieval over HTTP JSON-RPC.

use crate::SyncError;
use alloy::primitives::U64;
use ipld_eth_types::StateDiffPayload;
use jsonrpsee::{
    core::client::ClientT,
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use std::future::Future;

/// On-demand diff retrieval plus chain-head queries.
pub trait DiffFetcher: Send + Sync + 'static {
    /// The upstream node's current head block number.
    fn chain_head(&self) -> impl Future<Output = Result<u64, SyncError>> + Send;

    /// The historical state diff for one block.
    fn diff_at(
        &self,
        block_number: u64,
    ) -> impl Future<Output = Result<StateDiffPayload, SyncError>> + Send;
}

/// HTTP JSON-RPC fetcher against a diff-emitting execution node.
#[derive(Debug)]
pub struct HttpFetcher {
    client: HttpClient,
}

impl HttpFetcher {
    /// Build a fetcher for the node's HTTP endpoint.
    pub fn connect(url: &str) -> Result<Self, SyncError> {
        let client = HttpClientBuilder::default().build(url)?;
        Ok(Self { client })
    }
}

impl DiffFetcher for HttpFetcher {
    async fn chain_head(&self) -> Result<u64, SyncError> {
        let head: U64 = self.client.request("eth_blockNumber", rpc_params![]).await?;
        Ok(head.to::<u64>())
    }

    async fn diff_at(&self, block_number: u64) -> Result<StateDiffPayload, SyncError> {
        self.client
            .request("statediff_stateDiffAt", rpc_params![block_number])
            .await
            .map_err(Into::into)
    }
}
