//! Transactional metadata indexing.

use crate::{
    encode::{encode_hash_array, encode_u256, to_i64},
    SqlStoreError,
};
use alloy::primitives::B256;
use ipld_eth_core::{CidIndexer, StoreResult};
use ipld_eth_types::{
    CidPayload, DbHeaderCid, DbReceiptCid, DbStateCid, DbStorageCid, DbTransactionCid, DbUncleCid,
    SourceNode,
};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::BTreeMap;

/// Writes the relational rows for published payloads.
///
/// One database transaction per payload, in dependency order: header first,
/// then uncles, transactions, receipts, state nodes, storage nodes. Unique
/// constraints absorb re-ingest; the header upsert is the only statement
/// that mutates an existing row, and it only bumps `times_validated`.
#[derive(Debug, Clone)]
pub struct PgIndexer {
    pool: PgPool,
    fingerprint: String,
}

impl PgIndexer {
    /// Indexer writing rows scoped to the given source node.
    pub fn new(pool: PgPool, source: &SourceNode) -> Self {
        Self { pool, fingerprint: source.fingerprint() }
    }

    async fn upsert_header(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        header: &DbHeaderCid,
    ) -> Result<i64, SqlStoreError> {
        let row = sqlx::query(
            "INSERT INTO eth.header_cids (
                block_number, block_hash, parent_hash, cid, mh_key, td, reward,
                state_root, tx_root, receipt_root, uncle_root, bloom, timestamp,
                eth_node_fingerprint, times_validated
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 1)
            ON CONFLICT (block_hash, eth_node_fingerprint)
            DO UPDATE SET times_validated = eth.header_cids.times_validated + 1
            RETURNING id",
        )
        .bind(to_i64(header.block_number))
        .bind(header.block_hash.as_slice())
        .bind(header.parent_hash.as_slice())
        .bind(&header.cid)
        .bind(header.mh_key.as_slice())
        .bind(encode_u256(&header.td))
        .bind(encode_u256(&header.reward))
        .bind(header.state_root.as_slice())
        .bind(header.tx_root.as_slice())
        .bind(header.receipt_root.as_slice())
        .bind(header.uncle_root.as_slice())
        .bind(header.bloom.as_slice())
        .bind(to_i64(header.timestamp))
        .bind(&self.fingerprint)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.get("id"))
    }

    async fn insert_uncle(
        tx: &mut Transaction<'_, Postgres>,
        header_id: i64,
        uncle: &DbUncleCid,
    ) -> Result<(), SqlStoreError> {
        sqlx::query(
            "INSERT INTO eth.uncle_cids (header_id, block_hash, parent_hash, cid, mh_key, reward)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (header_id, block_hash) DO NOTHING",
        )
        .bind(header_id)
        .bind(uncle.block_hash.as_slice())
        .bind(uncle.parent_hash.as_slice())
        .bind(&uncle.cid)
        .bind(uncle.mh_key.as_slice())
        .bind(encode_u256(&uncle.reward))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_transaction(
        tx: &mut Transaction<'_, Postgres>,
        header_id: i64,
        transaction: &DbTransactionCid,
    ) -> Result<i64, SqlStoreError> {
        // The no-op assignment to a conflict-key column makes Postgres
        // return the existing id without mutating any payload column.
        let row = sqlx::query(
            "INSERT INTO eth.transaction_cids
                (header_id, tx_hash, \"index\", cid, mh_key, src, dst, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (header_id, tx_hash)
             DO UPDATE SET header_id = excluded.header_id
             RETURNING id",
        )
        .bind(header_id)
        .bind(transaction.tx_hash.as_slice())
        .bind(to_i64(transaction.index))
        .bind(&transaction.cid)
        .bind(transaction.mh_key.as_slice())
        .bind(transaction.src.as_slice())
        .bind(transaction.dst.as_ref().map(|dst| dst.as_slice().to_vec()))
        .bind(transaction.data.as_ref())
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.get("id"))
    }

    async fn insert_receipt(
        tx: &mut Transaction<'_, Postgres>,
        tx_id: i64,
        receipt: &DbReceiptCid,
    ) -> Result<(), SqlStoreError> {
        sqlx::query(
            "INSERT INTO eth.receipt_cids
                (tx_id, cid, mh_key, contract, contract_hash,
                 topic0, topic1, topic2, topic3, log_contracts)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (tx_id) DO NOTHING",
        )
        .bind(tx_id)
        .bind(&receipt.cid)
        .bind(receipt.mh_key.as_slice())
        .bind(receipt.contract.as_ref().map(|c| c.as_slice().to_vec()))
        .bind(receipt.contract_hash.as_ref().map(|h| h.as_slice().to_vec()))
        .bind(encode_hash_array(&receipt.topics[0]))
        .bind(encode_hash_array(&receipt.topics[1]))
        .bind(encode_hash_array(&receipt.topics[2]))
        .bind(encode_hash_array(&receipt.topics[3]))
        .bind(
            receipt
                .log_contracts
                .iter()
                .map(|address| address.as_slice().to_vec())
                .collect::<Vec<_>>(),
        )
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_state_node(
        tx: &mut Transaction<'_, Postgres>,
        header_id: i64,
        node: &DbStateCid,
    ) -> Result<i64, SqlStoreError> {
        // Same no-op-assignment trick as the transaction insert: rows are
        // immutable once written, the conflict arm only surfaces the id.
        let row = sqlx::query(
            "INSERT INTO eth.state_cids
                (header_id, state_path, state_leaf_key, cid, mh_key, node_type)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (header_id, state_path)
             DO UPDATE SET header_id = excluded.header_id
             RETURNING id",
        )
        .bind(header_id)
        .bind(node.state_path.as_ref())
        .bind(node.state_leaf_key.as_ref().map(|key| key.as_slice().to_vec()))
        .bind(&node.cid)
        .bind(node.mh_key.as_slice())
        .bind(node.node_type.as_int())
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.get("id"))
    }

    async fn insert_storage_node(
        tx: &mut Transaction<'_, Postgres>,
        state_id: i64,
        node: &DbStorageCid,
    ) -> Result<(), SqlStoreError> {
        sqlx::query(
            "INSERT INTO eth.storage_cids
                (state_id, storage_path, storage_leaf_key, cid, mh_key, node_type)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (state_id, storage_path) DO NOTHING",
        )
        .bind(state_id)
        .bind(node.storage_path.as_ref())
        .bind(node.storage_leaf_key.as_ref().map(|key| key.as_slice().to_vec()))
        .bind(&node.cid)
        .bind(node.mh_key.as_slice())
        .bind(node.node_type.as_int())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

impl CidIndexer for PgIndexer {
    async fn index(&self, cids: &CidPayload) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(SqlStoreError::from)?;

        let header_id = self.upsert_header(&mut tx, &cids.header).await?;

        for uncle in &cids.uncles {
            Self::insert_uncle(&mut tx, header_id, uncle).await?;
        }

        let mut tx_ids: BTreeMap<B256, i64> = BTreeMap::new();
        for transaction in &cids.transactions {
            let id = Self::insert_transaction(&mut tx, header_id, transaction).await?;
            tx_ids.insert(transaction.tx_hash, id);
        }

        for (tx_hash, receipt) in &cids.receipts {
            let tx_id = tx_ids.get(tx_hash).copied().ok_or_else(|| {
                SqlStoreError::InconsistentPayload(format!(
                    "receipt references unknown transaction {tx_hash}"
                ))
            })?;
            Self::insert_receipt(&mut tx, tx_id, receipt).await?;
        }

        let mut state_ids: BTreeMap<&[u8], i64> = BTreeMap::new();
        for node in &cids.state_nodes {
            let id = Self::insert_state_node(&mut tx, header_id, node).await?;
            state_ids.insert(node.state_path.as_ref(), id);
        }

        for (state_path, nodes) in &cids.storage_nodes {
            let state_id = state_ids.get(state_path.as_ref()).copied().ok_or_else(|| {
                SqlStoreError::InconsistentPayload(format!(
                    "storage nodes reference unanchored state path 0x{}",
                    alloy::primitives::hex::encode(state_path)
                ))
            })?;
            for node in nodes {
                Self::insert_storage_node(&mut tx, state_id, node).await?;
            }
        }

        tx.commit().await.map_err(SqlStoreError::from)?;
        Ok(())
    }
}
