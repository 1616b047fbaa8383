//! Range-scoped deletion and validation reset.

use crate::{encode::to_i64, SqlStoreError};
use ipld_eth_core::{Cleaner, StoreResult};
use ipld_eth_types::{BlockRange, DataKind};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

/// Deletes indexed data and the blobs it references over block ranges.
///
/// Each range runs in its own transaction. Within a range, blob rows are
/// removed before the metadata rows that reference them, and leaf entities
/// strictly before their owners; the schema's cascading foreign keys close
/// any remaining dependents. After all ranges commit, the touched tables
/// are vacuum-analyzed outside any transaction.
#[derive(Debug, Clone)]
pub struct PgCleaner {
    pool: PgPool,
}

impl PgCleaner {
    /// Cleaner over the given pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn clean_range(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
        kind: DataKind,
    ) -> Result<(), SqlStoreError> {
        match kind {
            DataKind::Full | DataKind::Headers => {
                Self::delete_storage_blobs(tx, range).await?;
                Self::delete_state_blobs(tx, range).await?;
                Self::delete_receipt_blobs(tx, range).await?;
                Self::delete_transaction_blobs(tx, range).await?;
                Self::delete_uncle_blobs(tx, range).await?;
                Self::delete_header_blobs(tx, range).await?;
                Self::delete_header_rows(tx, range).await
            }
            DataKind::Uncles => {
                Self::delete_uncle_blobs(tx, range).await?;
                Self::delete_uncle_rows(tx, range).await
            }
            DataKind::Transactions => {
                Self::delete_receipt_blobs(tx, range).await?;
                Self::delete_transaction_blobs(tx, range).await?;
                Self::delete_transaction_rows(tx, range).await
            }
            DataKind::Receipts => {
                Self::delete_receipt_blobs(tx, range).await?;
                Self::delete_receipt_rows(tx, range).await
            }
            DataKind::State => {
                Self::delete_storage_blobs(tx, range).await?;
                Self::delete_state_blobs(tx, range).await?;
                Self::delete_state_rows(tx, range).await
            }
            DataKind::Storage => {
                Self::delete_storage_blobs(tx, range).await?;
                Self::delete_storage_rows(tx, range).await
            }
        }
    }

    async fn exec_range(
        tx: &mut Transaction<'_, Postgres>,
        sql: &str,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        sqlx::query(sql)
            .bind(to_i64(range.low))
            .bind(to_i64(range.high))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn delete_storage_blobs(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM public.blocks A
             USING eth.storage_cids B, eth.state_cids C, eth.header_cids D
             WHERE A.key = B.mh_key
               AND B.state_id = C.id
               AND C.header_id = D.id
               AND D.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_storage_rows(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM eth.storage_cids A
             USING eth.state_cids B, eth.header_cids C
             WHERE A.state_id = B.id
               AND B.header_id = C.id
               AND C.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_state_blobs(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM public.blocks A
             USING eth.state_cids B, eth.header_cids C
             WHERE A.key = B.mh_key
               AND B.header_id = C.id
               AND C.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_state_rows(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM eth.state_cids A
             USING eth.header_cids B
             WHERE A.header_id = B.id
               AND B.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_receipt_blobs(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM public.blocks A
             USING eth.receipt_cids B, eth.transaction_cids C, eth.header_cids D
             WHERE A.key = B.mh_key
               AND B.tx_id = C.id
               AND C.header_id = D.id
               AND D.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_receipt_rows(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM eth.receipt_cids A
             USING eth.transaction_cids B, eth.header_cids C
             WHERE A.tx_id = B.id
               AND B.header_id = C.id
               AND C.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_transaction_blobs(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM public.blocks A
             USING eth.transaction_cids B, eth.header_cids C
             WHERE A.key = B.mh_key
               AND B.header_id = C.id
               AND C.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_transaction_rows(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM eth.transaction_cids A
             USING eth.header_cids B
             WHERE A.header_id = B.id
               AND B.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_uncle_blobs(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM public.blocks A
             USING eth.uncle_cids B, eth.header_cids C
             WHERE A.key = B.mh_key
               AND B.header_id = C.id
               AND C.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_uncle_rows(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM eth.uncle_cids A
             USING eth.header_cids B
             WHERE A.header_id = B.id
               AND B.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_header_blobs(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM public.blocks A
             USING eth.header_cids B
             WHERE A.key = B.mh_key
               AND B.block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    async fn delete_header_rows(
        tx: &mut Transaction<'_, Postgres>,
        range: BlockRange,
    ) -> Result<(), SqlStoreError> {
        Self::exec_range(
            tx,
            "DELETE FROM eth.header_cids WHERE block_number BETWEEN $1 AND $2",
            range,
        )
        .await
    }

    /// `VACUUM ANALYZE` the tables the kind touched, plus the blob store.
    ///
    /// Runs outside any transaction; Postgres rejects VACUUM inside one.
    async fn vacuum(&self, kind: DataKind) -> Result<(), SqlStoreError> {
        let tables: &[&str] = match kind {
            DataKind::Full | DataKind::Headers => &[
                "eth.header_cids",
                "eth.uncle_cids",
                "eth.transaction_cids",
                "eth.receipt_cids",
                "eth.state_cids",
                "eth.storage_cids",
            ],
            DataKind::Uncles => &["eth.uncle_cids"],
            DataKind::Transactions => &["eth.transaction_cids", "eth.receipt_cids"],
            DataKind::Receipts => &["eth.receipt_cids"],
            DataKind::State => &["eth.state_cids", "eth.storage_cids"],
            DataKind::Storage => &["eth.storage_cids"],
        };
        for table in tables {
            sqlx::query(&format!("VACUUM ANALYZE {table}")).execute(&self.pool).await?;
        }
        sqlx::query("VACUUM ANALYZE public.blocks").execute(&self.pool).await?;
        Ok(())
    }
}

impl Cleaner for PgCleaner {
    async fn clean(&self, ranges: &[BlockRange], kind: DataKind) -> StoreResult<()> {
        for range in ranges {
            info!(target: "sql::cleaner", low = range.low, high = range.high, %kind,
                "cleaning block range");
            let mut tx = self.pool.begin().await.map_err(SqlStoreError::from)?;
            Self::clean_range(&mut tx, *range, kind).await?;
            tx.commit().await.map_err(SqlStoreError::from)?;
        }
        info!(target: "sql::cleaner", %kind, "vacuum analyzing cleaned tables");
        self.vacuum(kind).await?;
        Ok(())
    }

    async fn reset_validation(&self, ranges: &[BlockRange]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(SqlStoreError::from)?;
        for range in ranges {
            info!(target: "sql::cleaner", low = range.low, high = range.high,
                "resetting validation counters");
            sqlx::query(
                "UPDATE eth.header_cids SET times_validated = 0
                 WHERE block_number BETWEEN $1 AND $2",
            )
            .bind(to_i64(range.low))
            .bind(to_i64(range.high))
            .execute(&mut *tx)
            .await
            .map_err(SqlStoreError::from)?;
        }
        tx.commit().await.map_err(SqlStoreError::from)?;
        Ok(())
    }
}
