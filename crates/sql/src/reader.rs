//! Read-only queries over the header index.

use crate::{
    encode::{from_i64, to_i64},
    SqlStoreError,
};
use ipld_eth_core::{IndexView, StoreResult};
use ipld_eth_types::BlockRange;
use sqlx::{PgPool, Row};

/// Gap and watermark queries used by the back-fill controller.
#[derive(Debug, Clone)]
pub struct PgIndexReader {
    pool: PgPool,
}

impl PgIndexReader {
    /// Reader over the given pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Validation counter for a header at the given height and hash.
    pub async fn times_validated(
        &self,
        block_number: u64,
        block_hash: &[u8],
    ) -> StoreResult<Option<i32>> {
        let row = sqlx::query(
            "SELECT times_validated FROM eth.header_cids
             WHERE block_number = $1 AND block_hash = $2",
        )
        .bind(to_i64(block_number))
        .bind(block_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlStoreError::from)?;
        Ok(row.map(|r| r.get("times_validated")))
    }
}

impl IndexView for PgIndexReader {
    async fn max_block_number(&self) -> StoreResult<Option<u64>> {
        let row = sqlx::query("SELECT MAX(block_number) AS max_bn FROM eth.header_cids")
            .fetch_one(&self.pool)
            .await
            .map_err(SqlStoreError::from)?;
        Ok(row.get::<Option<i64>, _>("max_bn").map(from_i64))
    }

    async fn find_gaps(&self) -> StoreResult<Vec<BlockRange>> {
        // For each indexed block with no successor, the gap runs until the
        // next indexed block above it; blocks at the head (nothing above)
        // are the trailing edge, not a gap.
        let rows = sqlx::query(
            "SELECT c.block_number + 1 AS gap_start, MIN(a.block_number) - 1 AS gap_stop
             FROM eth.header_cids c
             LEFT JOIN eth.header_cids n ON c.block_number = n.block_number - 1
             LEFT JOIN eth.header_cids a ON c.block_number < a.block_number
             WHERE n.block_number IS NULL AND a.block_number IS NOT NULL
             GROUP BY c.block_number, n.block_number",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(SqlStoreError::from)?;

        let mut gaps: Vec<BlockRange> = rows
            .into_iter()
            .map(|row| {
                BlockRange::new(
                    from_i64(row.get::<i64, _>("gap_start")),
                    from_i64(row.get::<i64, _>("gap_stop")),
                )
            })
            .collect();
        gaps.sort_by_key(|range| range.low);
        Ok(gaps)
    }
}
