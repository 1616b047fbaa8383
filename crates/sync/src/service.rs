//! The live sync service: subscription, bounded buffering, worker pool.

use crate::{Backoff, DiffStreamer, DiffSubscription, Pipeline};
use ipld_eth_core::{CidIndexer, IpldPublisher, PayloadConverter};
use ipld_eth_types::StateDiffPayload;
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

/// Capacity of the payload buffer between the subscription and the worker
/// pool. When full, the subscription reader blocks, pushing backpressure
/// into the transport.
pub const PAYLOAD_CHANNEL_SIZE: usize = 20_000;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(64);

/// Long-running driver of the live path.
///
/// Holds one subscription at a time and fans payloads out to at most
/// `workers` concurrent pipeline passes. When the subscription drops, the
/// service drains in-flight payloads to completion, then reconnects with
/// bounded exponential backoff; a payload is either fully indexed or never
/// reaches the metadata store.
#[derive(Debug)]
pub struct SyncService<S, C, P, I> {
    streamer: S,
    pipeline: Arc<Pipeline<C, P, I>>,
    workers: usize,
    cancel: CancellationToken,
}

impl<S, C, P, I> SyncService<S, C, P, I>
where
    S: DiffStreamer,
    C: PayloadConverter,
    P: IpldPublisher,
    I: CidIndexer,
{
    /// Service over the given streamer and pipeline.
    pub fn new(
        streamer: S,
        pipeline: Arc<Pipeline<C, P, I>>,
        workers: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self { streamer, pipeline, workers: workers.max(1), cancel }
    }

    /// Run until cancelled.
    pub async fn run(self) {
        let mut backoff = Backoff::new(INITIAL_RECONNECT_DELAY, MAX_RECONNECT_DELAY);
        loop {
            let subscribed = tokio::select! {
                _ = self.cancel.cancelled() => return,
                subscribed = self.streamer.stream() => subscribed,
            };
            let subscription = match subscribed {
                Ok(subscription) => {
                    backoff.reset();
                    subscription
                }
                Err(err) => {
                    let delay = backoff.next_delay();
                    warn!(target: "sync::service", %err, ?delay,
                        "state diff subscription failed; backing off");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            };

            info!(target: "sync::service", workers = self.workers, "streaming state diffs");
            self.drive(subscription).await;
            if self.cancel.is_cancelled() {
                return;
            }
            warn!(target: "sync::service", "subscription ended; resubscribing");
        }
    }

    /// Pump one subscription until it ends or the service is cancelled,
    /// then wait for every dispatched payload to finish.
    async fn drive(&self, mut subscription: S::Sub) {
        let (buffer_tx, mut buffer_rx) = mpsc::channel::<StateDiffPayload>(PAYLOAD_CHANNEL_SIZE);

        let reader_cancel = self.cancel.clone();
        let reader = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    notification = subscription.next() => match notification {
                        Some(Ok(payload)) => {
                            if buffer_tx.send(payload).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            error!(target: "sync::service", %err,
                                "dropping undecodable notification");
                        }
                        None => break,
                    },
                }
            }
        });

        let tracker = TaskTracker::new();
        let slots = Arc::new(Semaphore::new(self.workers));
        loop {
            let payload = tokio::select! {
                _ = self.cancel.cancelled() => break,
                payload = buffer_rx.recv() => match payload {
                    Some(payload) => payload,
                    None => break,
                },
            };
            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let pipeline = Arc::clone(&self.pipeline);
            let worker_cancel = self.cancel.clone();
            tracker.spawn(async move {
                let _slot = permit;
                match pipeline.process(payload).await {
                    Ok(block_number) => {
                        debug!(target: "sync::service", block_number, "indexed state diff");
                    }
                    Err(err) if err.is_payload_local() => {
                        error!(target: "sync::service", %err, "dropping malformed payload");
                    }
                    Err(err) if err.is_fatal() => {
                        error!(target: "sync::service", %err,
                            "unexpected schema conflict; stopping for diagnosis");
                        worker_cancel.cancel();
                    }
                    Err(err) => {
                        error!(target: "sync::service", %err,
                            "payload not indexed; leaving block for back-fill");
                    }
                }
            });
        }

        // Drain: every payload already handed to a worker runs to its
        // commit-or-fail boundary before we reconnect or shut down.
        tracker.close();
        tracker.wait().await;
        reader.abort();
        let _ = reader.await;
    }
}
