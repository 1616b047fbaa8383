//! Driver tests over in-memory doubles: the live service end to end, the
//! back-fill controller's gap arithmetic, and the shutdown drain.

use ipld_eth_core::{
    fixtures,
    mem::{MemIndexer, MemPublisher},
    Converter,
};
use ipld_eth_sync::{
    BackfillConfig, Backfiller, DiffFetcher, DiffStreamer, DiffSubscription, Pipeline,
    SyncError, SyncService,
};
use ipld_eth_types::StateDiffPayload;
use std::{
    collections::BTreeSet,
    sync::Arc,
    time::Duration,
};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Hands out channel-backed subscriptions, one per `stream` call.
struct ChannelStreamer {
    subscriptions: Mutex<Vec<mpsc::Receiver<StateDiffPayload>>>,
}

impl ChannelStreamer {
    fn single(capacity: usize) -> (Self, mpsc::Sender<StateDiffPayload>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { subscriptions: Mutex::new(vec![rx]) }, tx)
    }
}

struct ChannelSubscription {
    rx: mpsc::Receiver<StateDiffPayload>,
}

impl DiffSubscription for ChannelSubscription {
    async fn next(&mut self) -> Option<Result<StateDiffPayload, SyncError>> {
        self.rx.recv().await.map(Ok)
    }
}

impl DiffStreamer for ChannelStreamer {
    type Sub = ChannelSubscription;

    async fn stream(&self) -> Result<ChannelSubscription, SyncError> {
        match self.subscriptions.lock().await.pop() {
            Some(rx) => Ok(ChannelSubscription { rx }),
            None => Err(SyncError::Upstream(jsonrpsee::core::client::Error::Custom(
                "no more subscriptions".to_owned(),
            ))),
        }
    }
}

/// Serves fixture diffs for every height up to a fixed head; remembers
/// which heights were asked for.
struct FixtureFetcher {
    head: u64,
    served: Arc<Mutex<BTreeSet<u64>>>,
}

impl FixtureFetcher {
    fn new(head: u64) -> (Self, Arc<Mutex<BTreeSet<u64>>>) {
        let served = Arc::new(Mutex::new(BTreeSet::new()));
        (Self { head, served: Arc::clone(&served) }, served)
    }
}

impl DiffFetcher for FixtureFetcher {
    async fn chain_head(&self) -> Result<u64, SyncError> {
        Ok(self.head)
    }

    async fn diff_at(&self, block_number: u64) -> Result<StateDiffPayload, SyncError> {
        self.served.lock().await.insert(block_number);
        Ok(fixtures::payload_for_block(block_number))
    }
}

fn pipeline(
    publisher: &MemPublisher,
    indexer: &MemIndexer,
) -> Arc<Pipeline<Converter, MemPublisher, MemIndexer>> {
    Arc::new(Pipeline::new(
        Converter::new(fixtures::TEST_CHAIN_ID),
        publisher.clone(),
        indexer.clone(),
    ))
}

async fn wait_for<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn service_indexes_streamed_payloads() {
    let (streamer, feed) = ChannelStreamer::single(16);
    let publisher = MemPublisher::new();
    let indexer = MemIndexer::new();
    let cancel = CancellationToken::new();

    let service =
        SyncService::new(streamer, pipeline(&publisher, &indexer), 2, cancel.clone());
    let handle = tokio::spawn(service.run());

    for number in 1u64..=3 {
        feed.send(fixtures::payload_for_block(number)).await.unwrap();
    }

    let probe = indexer.clone();
    wait_for(|| {
        let probe = probe.clone();
        async move { probe.block_numbers().await.len() == 3 }
    })
    .await;

    assert_eq!(indexer.block_numbers().await, vec![1, 2, 3]);
    assert_eq!(publisher.blob_count().await, 3 * fixtures::FIXTURE_BLOB_COUNT);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn service_drains_in_flight_payloads_on_shutdown() {
    let (streamer, feed) = ChannelStreamer::single(16);
    let publisher = MemPublisher::new();
    let indexer = MemIndexer::new();
    let cancel = CancellationToken::new();

    // Freeze the blob store so the worker parks mid-payload.
    let frozen = publisher.freeze().await;

    let service =
        SyncService::new(streamer, pipeline(&publisher, &indexer), 1, cancel.clone());
    let handle = tokio::spawn(service.run());

    feed.send(fixtures::payload_for_block(7)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    cancel.cancel();
    drop(frozen);

    // The drain finishes the in-flight payload: no torn writes.
    handle.await.unwrap();
    assert_eq!(indexer.block_numbers().await, vec![7]);
}

#[tokio::test]
async fn service_drops_malformed_payloads_and_continues() {
    let (streamer, feed) = ChannelStreamer::single(16);
    let publisher = MemPublisher::new();
    let indexer = MemIndexer::new();
    let cancel = CancellationToken::new();

    let service =
        SyncService::new(streamer, pipeline(&publisher, &indexer), 1, cancel.clone());
    let handle = tokio::spawn(service.run());

    let mut malformed = fixtures::payload_for_block(4);
    malformed.block_rlp = alloy::primitives::Bytes::from(vec![0xff, 0xff]);
    feed.send(malformed).await.unwrap();
    feed.send(fixtures::payload_for_block(5)).await.unwrap();

    let probe = indexer.clone();
    wait_for(|| {
        let probe = probe.clone();
        async move { !probe.block_numbers().await.is_empty() }
    })
    .await;

    assert_eq!(indexer.block_numbers().await, vec![5]);

    cancel.cancel();
    handle.await.unwrap();
}

/// An indexer double that always reports an escaped uniqueness conflict.
#[derive(Debug, Clone)]
struct ConflictIndexer;

impl ipld_eth_core::CidIndexer for ConflictIndexer {
    async fn index(
        &self,
        _cids: &ipld_eth_types::CidPayload,
    ) -> ipld_eth_core::StoreResult<()> {
        Err(ipld_eth_core::StoreError::ConstraintViolation(
            "duplicate key value violates unique constraint".to_owned(),
        ))
    }
}

#[tokio::test]
async fn service_stops_on_schema_conflict() {
    let (streamer, feed) = ChannelStreamer::single(16);
    let cancel = CancellationToken::new();
    let pipeline = Arc::new(Pipeline::new(
        Converter::new(fixtures::TEST_CHAIN_ID),
        MemPublisher::new(),
        ConflictIndexer,
    ));

    let service = SyncService::new(streamer, pipeline, 1, cancel.clone());
    let handle = tokio::spawn(service.run());

    feed.send(fixtures::payload_for_block(1)).await.unwrap();

    // The service cancels itself: an escaped constraint violation is a bug
    // to diagnose, not a payload to drop.
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("service did not stop")
        .unwrap();
    assert!(cancel.is_cancelled());
}

#[test]
fn payload_buffer_matches_the_upstream_contract() {
    assert_eq!(ipld_eth_sync::PAYLOAD_CHANNEL_SIZE, 20_000);
}

#[tokio::test]
async fn backfill_fills_gaps_up_to_the_validation_window() {
    let publisher = MemPublisher::new();
    let indexer = MemIndexer::new();
    let pipeline = pipeline(&publisher, &indexer);

    // Pre-index blocks 1, 2, 5, 6: interior gap {3, 4}, trailing gap 7..
    for number in [1u64, 2, 5, 6] {
        pipeline.process(fixtures::payload_for_block(number)).await.unwrap();
    }

    let (fetcher, served) = FixtureFetcher::new(10);
    let config =
        BackfillConfig { batch_size: 3, validation_window: 2, ..Default::default() };
    let backfiller = Backfiller::new(
        fetcher,
        indexer.clone(),
        Arc::clone(&pipeline),
        config,
        CancellationToken::new(),
    );

    let stats = backfiller.tick().await.unwrap();

    // Interior {3, 4} plus trailing {7, 8}; 9 and 10 stay inside the window.
    assert_eq!(stats.attempted, 4);
    assert_eq!(stats.indexed, 4);
    assert_eq!(stats.failed, 0);
    assert_eq!(indexer.block_numbers().await, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(*served.lock().await, BTreeSet::from([3, 4, 7, 8]));
}

#[tokio::test]
async fn backfill_is_a_no_op_when_nothing_is_missing() {
    let publisher = MemPublisher::new();
    let indexer = MemIndexer::new();
    let pipeline = pipeline(&publisher, &indexer);

    for number in 0u64..=8 {
        pipeline.process(fixtures::payload_for_block(number)).await.unwrap();
    }

    let (fetcher, _) = FixtureFetcher::new(10);
    let backfiller = Backfiller::new(
        fetcher,
        indexer.clone(),
        pipeline,
        BackfillConfig { validation_window: 2, ..Default::default() },
        CancellationToken::new(),
    );

    let stats = backfiller.tick().await.unwrap();
    assert_eq!(stats.attempted, 0);
}
