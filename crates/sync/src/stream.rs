//! The live subscription to the upstream `statediff` namespace.

use crate::SyncError;
use ipld_eth_types::{StateDiffPayload, StreamParams};
use jsonrpsee::{
    core::client::{Subscription, SubscriptionClientT},
    rpc_params,
    ws_client::{WsClient, WsClientBuilder},
};
use std::future::Future;

/// One live subscription's notification stream.
pub trait DiffSubscription: Send + 'static {
    /// The next notification; `None` once the subscription has ended.
    fn next(
        &mut self,
    ) -> impl Future<Output = Option<Result<StateDiffPayload, SyncError>>> + Send;
}

/// A client able to open state-diff subscriptions.
pub trait DiffStreamer: Send + Sync + 'static {
    /// Subscription type produced by [`DiffStreamer::stream`].
    type Sub: DiffSubscription;

    /// Open a fresh subscription.
    fn stream(&self) -> impl Future<Output = Result<Self::Sub, SyncError>> + Send;
}

/// WebSocket JSON-RPC streamer against a diff-emitting execution node.
#[derive(Debug)]
pub struct WsStreamer {
    client: WsClient,
    params: StreamParams,
}

impl WsStreamer {
    /// Connect to the node's WebSocket endpoint.
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        let client = WsClientBuilder::default().build(url).await?;
        Ok(Self { client, params: StreamParams::full() })
    }
}

/// A live `statediff_subscribe` subscription.
#[derive(Debug)]
pub struct WsDiffSubscription {
    inner: Subscription<StateDiffPayload>,
}

impl DiffSubscription for WsDiffSubscription {
    async fn next(&mut self) -> Option<Result<StateDiffPayload, SyncError>> {
        self.inner.next().await.map(|result| result.map_err(SyncError::from))
    }
}

impl DiffStreamer for WsStreamer {
    type Sub = WsDiffSubscription;

    async fn stream(&self) -> Result<WsDiffSubscription, SyncError> {
        let inner = self
            .client
            .subscribe("statediff_subscribe", rpc_params!["stream", self.params], "statediff_unsubscribe")
            .await?;
        Ok(WsDiffSubscription { inner })
    }
}
