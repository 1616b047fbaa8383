//! In-memory pipeline doubles for testing.
//!
//! These implement the capability traits over plain collections so drivers
//! can be exercised without a database or block store. They mirror the
//! production semantics that matter to callers: blob puts are idempotent,
//! re-indexing bumps the validation counter, uniqueness keys absorb
//! duplicates.

use crate::{assemble, CidIndexer, IndexView, IpldPublisher, StoreResult};
use alloy::primitives::{Bytes, B256};
use ipld_eth_types::{
    BlockRange, CidPayload, ConvertedPayload, DbHeaderCid, DbReceiptCid, DbStateCid, DbStorageCid,
    DbTransactionCid, DbUncleCid,
};
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Row counts across the in-memory metadata tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    /// Header rows.
    pub headers: usize,
    /// Uncle rows.
    pub uncles: usize,
    /// Transaction rows.
    pub transactions: usize,
    /// Receipt rows.
    pub receipts: usize,
    /// State node rows.
    pub state_nodes: usize,
    /// Storage node rows.
    pub storage_nodes: usize,
}

/// In-memory block store and publisher.
///
/// Thread-safe and cloneable; clones share the same store. The gate lets a
/// test freeze publishing to observe backpressure.
#[derive(Debug, Clone, Default)]
pub struct MemPublisher {
    blobs: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    gate: Arc<Mutex<()>>,
}

impl MemPublisher {
    /// New empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the store: every `publish` call blocks until the returned
    /// guard is dropped.
    pub async fn freeze(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Number of distinct blobs stored.
    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Whether a blob exists under the given multihash key.
    pub async fn contains(&self, mh_key: &[u8]) -> bool {
        self.blobs.read().await.contains_key(mh_key)
    }
}

impl IpldPublisher for MemPublisher {
    async fn publish(&self, payload: &ConvertedPayload) -> StoreResult<CidPayload> {
        let _gate = self.gate.lock().await;
        let (blobs, cids) = assemble(payload);
        let mut store = self.blobs.write().await;
        for blob in blobs {
            store.entry(blob.mh_key()).or_insert(blob.data);
        }
        Ok(cids)
    }
}

/// Everything indexed under one header.
#[derive(Debug, Clone)]
struct HeaderEntry {
    row: DbHeaderCid,
    times_validated: u64,
    uncles: BTreeMap<B256, DbUncleCid>,
    transactions: BTreeMap<B256, DbTransactionCid>,
    receipts: BTreeMap<B256, DbReceiptCid>,
    state_nodes: BTreeMap<Bytes, DbStateCid>,
    storage_nodes: BTreeMap<(Bytes, Bytes), DbStorageCid>,
}

impl HeaderEntry {
    fn new(row: DbHeaderCid) -> Self {
        Self {
            row,
            times_validated: 1,
            uncles: BTreeMap::new(),
            transactions: BTreeMap::new(),
            receipts: BTreeMap::new(),
            state_nodes: BTreeMap::new(),
            storage_nodes: BTreeMap::new(),
        }
    }
}

/// In-memory metadata indexer.
///
/// Headers are keyed by `(block_number, block_hash)`; children deduplicate
/// on the same uniqueness keys the relational schema declares.
#[derive(Debug, Clone, Default)]
pub struct MemIndexer {
    inner: Arc<RwLock<BTreeMap<(u64, B256), HeaderEntry>>>,
}

impl MemIndexer {
    /// New empty indexer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored header row, if indexed.
    pub async fn header(&self, block_number: u64, block_hash: B256) -> Option<DbHeaderCid> {
        self.inner
            .read()
            .await
            .get(&(block_number, block_hash))
            .map(|entry| entry.row.clone())
    }

    /// Validation counter for the given header, if indexed.
    pub async fn times_validated(&self, block_number: u64, block_hash: B256) -> Option<u64> {
        self.inner
            .read()
            .await
            .get(&(block_number, block_hash))
            .map(|entry| entry.times_validated)
    }

    /// Sorted, deduplicated block numbers present in the index.
    pub async fn block_numbers(&self) -> Vec<u64> {
        let inner = self.inner.read().await;
        let mut numbers: Vec<u64> = inner.keys().map(|(number, _)| *number).collect();
        numbers.dedup();
        numbers
    }

    /// Row counts across all tables.
    pub async fn counts(&self) -> RowCounts {
        let inner = self.inner.read().await;
        let mut counts = RowCounts { headers: inner.len(), ..Default::default() };
        for entry in inner.values() {
            counts.uncles += entry.uncles.len();
            counts.transactions += entry.transactions.len();
            counts.receipts += entry.receipts.len();
            counts.state_nodes += entry.state_nodes.len();
            counts.storage_nodes += entry.storage_nodes.len();
        }
        counts
    }
}

impl CidIndexer for MemIndexer {
    async fn index(&self, cids: &CidPayload) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let key = (cids.header.block_number, cids.header.block_hash);
        let entry = inner
            .entry(key)
            .and_modify(|entry| entry.times_validated += 1)
            .or_insert_with(|| HeaderEntry::new(cids.header.clone()));

        for uncle in &cids.uncles {
            entry.uncles.entry(uncle.block_hash).or_insert_with(|| uncle.clone());
        }
        for tx in &cids.transactions {
            entry.transactions.entry(tx.tx_hash).or_insert_with(|| tx.clone());
        }
        for (tx_hash, receipt) in &cids.receipts {
            entry.receipts.entry(*tx_hash).or_insert_with(|| receipt.clone());
        }
        for node in &cids.state_nodes {
            entry.state_nodes.entry(node.state_path.clone()).or_insert_with(|| node.clone());
        }
        for (state_path, nodes) in &cids.storage_nodes {
            for node in nodes {
                entry
                    .storage_nodes
                    .entry((state_path.clone(), node.storage_path.clone()))
                    .or_insert_with(|| node.clone());
            }
        }
        Ok(())
    }
}

impl IndexView for MemIndexer {
    async fn max_block_number(&self) -> StoreResult<Option<u64>> {
        Ok(self.inner.read().await.keys().map(|(number, _)| *number).max())
    }

    async fn find_gaps(&self) -> StoreResult<Vec<BlockRange>> {
        let numbers = self.block_numbers().await;
        let mut gaps = Vec::new();
        for pair in numbers.windows(2) {
            if pair[1] > pair[0] + 1 {
                gaps.push(BlockRange::new(pair[0] + 1, pair[1] - 1));
            }
        }
        Ok(gaps)
    }
}
