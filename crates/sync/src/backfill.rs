//! The back-fill controller: gap detection and historical retrieval.

use crate::{Backoff, BackfillError, DiffFetcher, Pipeline};
use futures::future::join_all;
use ipld_eth_core::{CidIndexer, IndexView, IpldPublisher, PayloadConverter};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Settings for the back-fill controller.
#[derive(Debug, Clone, Copy)]
pub struct BackfillConfig {
    /// Pause between reconciliation ticks.
    pub frequency: Duration,
    /// Blocks fetched concurrently per batch.
    pub batch_size: usize,
    /// Recent blocks left to the live subscriber.
    ///
    /// The controller never fills above `head - validation_window`; those
    /// heights are still arriving over the stream and filling them here
    /// would only duplicate work.
    pub validation_window: u64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self { frequency: Duration::from_secs(15), batch_size: 100, validation_window: 15 }
    }
}

/// Outcome of one reconciliation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillStats {
    /// Blocks the tick tried to fill.
    pub attempted: usize,
    /// Blocks fully indexed.
    pub indexed: usize,
    /// Blocks that failed and remain missing.
    pub failed: usize,
}

/// Periodically reconciles the index against the upstream head.
///
/// Each tick finds interior gaps plus the span between the indexed
/// watermark and the head cushion, then drives the missing blocks through
/// the shared pipeline in concurrent batches. Per-block failures are left
/// for the next tick; the controller itself never aborts on them.
#[derive(Debug)]
pub struct Backfiller<F, V, C, P, I> {
    fetcher: F,
    view: V,
    pipeline: Arc<Pipeline<C, P, I>>,
    config: BackfillConfig,
    cancel: CancellationToken,
}

impl<F, V, C, P, I> Backfiller<F, V, C, P, I>
where
    F: DiffFetcher,
    V: IndexView,
    C: PayloadConverter,
    P: IpldPublisher,
    I: CidIndexer,
{
    /// Controller over the given fetcher, index view and pipeline.
    pub fn new(
        fetcher: F,
        view: V,
        pipeline: Arc<Pipeline<C, P, I>>,
        config: BackfillConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self { fetcher, view, pipeline, config, cancel }
    }

    /// Run ticks until cancelled.
    pub async fn run(self) {
        let mut backoff = Backoff::new(self.config.frequency, self.config.frequency * 8);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(self.config.frequency) => {}
            }
            match self.tick().await {
                Ok(stats) => {
                    backoff.reset();
                    if stats.attempted > 0 {
                        info!(target: "sync::backfill",
                            attempted = stats.attempted,
                            indexed = stats.indexed,
                            failed = stats.failed,
                            "back-fill tick finished");
                    }
                }
                Err(err) => {
                    let delay = backoff.next_delay();
                    warn!(target: "sync::backfill", %err, ?delay,
                        "back-fill tick failed; backing off");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One reconciliation pass.
    pub async fn tick(&self) -> Result<BackfillStats, BackfillError> {
        let head = self.fetcher.chain_head().await?;
        let ceiling = head.saturating_sub(self.config.validation_window);

        let mut missing = Vec::new();
        for gap in self.view.find_gaps().await? {
            missing.extend(gap.blocks().filter(|block| *block <= ceiling));
        }
        let watermark = self.view.max_block_number().await?;
        let trailing_start = watermark.map_or(0, |max| max + 1);
        missing.extend(trailing_start..=ceiling);
        missing.sort_unstable();
        missing.dedup();

        let mut stats = BackfillStats { attempted: missing.len(), ..Default::default() };
        if missing.is_empty() {
            return Ok(stats);
        }
        info!(target: "sync::backfill", blocks = missing.len(), ceiling,
            "filling missing blocks");

        for batch in missing.chunks(self.config.batch_size.max(1)) {
            if self.cancel.is_cancelled() {
                stats.attempted -= batch.len();
                continue;
            }
            let outcomes = join_all(batch.iter().map(|&block| self.fill_block(block))).await;
            for filled in outcomes {
                if filled {
                    stats.indexed += 1;
                } else {
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }

    async fn fill_block(&self, block_number: u64) -> bool {
        let payload = match self.fetcher.diff_at(block_number).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(target: "sync::backfill", block_number, %err,
                    "historical diff fetch failed; leaving for next tick");
                return false;
            }
        };
        match self.pipeline.process(payload).await {
            Ok(_) => true,
            Err(err) => {
                warn!(target: "sync::backfill", block_number, %err,
                    "back-fill indexing failed; leaving for next tick");
                false
            }
        }
    }
}
