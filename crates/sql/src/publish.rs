//! Blob-store writes: the Postgres publisher.

use crate::SqlStoreError;
use ipld_eth_core::{assemble, IpldPublisher, StoreResult};
use ipld_eth_types::{CidPayload, ConvertedPayload};
use sqlx::{PgPool, Row};

/// Publishes the IPLD objects of a payload into `public.blocks`.
///
/// All blobs for one payload are written in a single transaction and
/// committed before the caller hands the returned [`CidPayload`] to the
/// indexer, so every referenced `mh_key` is durable by the time a metadata
/// row can point at it. Re-publishing identical bytes is absorbed by the
/// key's on-conflict clause.
#[derive(Debug, Clone)]
pub struct PgPublisher {
    pool: PgPool,
}

impl PgPublisher {
    /// Publisher over the given pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a raw blob by its multihash key.
    pub async fn get(&self, mh_key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT data FROM public.blocks WHERE key = $1")
            .bind(mh_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlStoreError::from)?;
        Ok(row.map(|r| r.get("data")))
    }
}

impl IpldPublisher for PgPublisher {
    async fn publish(&self, payload: &ConvertedPayload) -> StoreResult<CidPayload> {
        let (blobs, cids) = assemble(payload);

        let mut tx = self.pool.begin().await.map_err(SqlStoreError::from)?;
        for blob in &blobs {
            sqlx::query(
                "INSERT INTO public.blocks (key, data) VALUES ($1, $2)
                 ON CONFLICT (key) DO NOTHING",
            )
            .bind(blob.mh_key())
            .bind(blob.data.as_slice())
            .execute(&mut *tx)
            .await
            .map_err(SqlStoreError::from)?;
        }
        tx.commit().await.map_err(SqlStoreError::from)?;

        Ok(cids)
    }
}
