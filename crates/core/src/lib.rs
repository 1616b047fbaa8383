//! Pipeline core for the Ethereum state-diff IPLD indexer.
//!
//! The live and back-fill paths both run convert → publish → index. This
//! crate holds the stages that are pure — payload decoding, content
//! addressing, row assembly, reward math — plus the capability traits the
//! storage backends implement:
//!
//! - [`PayloadConverter`] decodes a wire payload ([`Converter`] is the
//!   production implementation)
//! - [`IpldPublisher`] persists blobs and yields a
//!   [`CidPayload`](ipld_eth_types::CidPayload)
//! - [`CidIndexer`] commits the relational rows
//! - [`Cleaner`] and [`IndexView`] serve the operator and gap-fill surfaces
//!
//! In-memory doubles for the async traits live in [`mem`] behind the
//! `test-utils` feature.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

mod assemble;
pub use assemble::assemble;

mod convert;
pub use convert::Converter;

mod error;
pub use error::{ConvertError, StoreError, StoreResult};

pub mod ipld;
pub use ipld::IpldBlob;

pub mod reward;

mod traits;
pub use traits::{Cleaner, CidIndexer, IndexView, IpldPublisher, PayloadConverter};

/// In-memory doubles for the pipeline capability traits.
#[cfg(any(test, feature = "test-utils"))]
pub mod mem;

/// Deterministic test payloads shared across the workspace.
#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

#[cfg(test)]
mod tests {
    use crate::{
        fixtures,
        mem::{MemIndexer, MemPublisher},
        CidIndexer, Converter, IndexView, IpldPublisher, PayloadConverter,
    };
    use alloy::primitives::U256;
    use ipld_eth_types::{BlockRange, NodeType};

    #[test]
    fn converter_decodes_the_fixture() {
        let converter = Converter::new(fixtures::TEST_CHAIN_ID);
        let converted = converter.convert(fixtures::payload_for_block(10)).unwrap();

        assert_eq!(converted.block_number(), 10);
        assert_eq!(converted.block.body.transactions.len(), 2);
        assert_eq!(converted.receipts.len(), 2);
        assert_eq!(converted.tx_meta.len(), 2);
        assert_eq!(converted.state_nodes.len(), 2);
        assert_eq!(converted.storage_nodes.len(), 1);

        // Every sender recovers to the fixture signer.
        let expected = fixtures::test_signer().address();
        assert!(converted.tx_meta.iter().all(|meta| meta.src == expected));

        // The creation transaction gets a contract address, the call does not.
        assert!(converted.receipt_meta[0].contract.is_none());
        assert!(converted.receipt_meta[1].contract.is_some());
        assert_eq!(converted.receipt_meta[0].topics[0].len(), 1);
        assert_eq!(converted.receipt_meta[0].log_contracts.len(), 1);
    }

    #[test]
    fn converter_rejects_receipt_count_mismatch() {
        let mut payload = fixtures::payload_for_block(10);
        payload.receipts_rlp = alloy::primitives::Bytes::from(vec![0xc0]); // empty list
        let err = Converter::new(fixtures::TEST_CHAIN_ID).convert(payload).unwrap_err();
        assert!(matches!(err, crate::ConvertError::ReceiptCountMismatch { receipts: 0, .. }));
    }

    #[test]
    fn converter_rejects_garbage_block_rlp() {
        let mut payload = fixtures::payload_for_block(10);
        payload.block_rlp = alloy::primitives::Bytes::from(vec![0x01, 0x02, 0x03]);
        let err = Converter::new(fixtures::TEST_CHAIN_ID).convert(payload).unwrap_err();
        assert!(matches!(err, crate::ConvertError::BlockRlp(_)));
    }

    #[test]
    fn converter_rejects_wrong_chain_id() {
        let payload = fixtures::payload_for_block(10);
        let err = Converter::new(fixtures::TEST_CHAIN_ID + 1).convert(payload).unwrap_err();
        assert!(matches!(err, crate::ConvertError::ChainIdMismatch { .. }));
    }

    #[test]
    fn converter_deduplicates_trie_paths() {
        let mut payload = fixtures::payload_for_block(10);
        payload.state_nodes.push(payload.state_nodes[0].clone());
        payload.storage_nodes.push(payload.storage_nodes[0].clone());
        let converted = Converter::new(fixtures::TEST_CHAIN_ID).convert(payload).unwrap();
        assert_eq!(converted.state_nodes.len(), 2);
        assert_eq!(converted.storage_nodes.values().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn assembly_addresses_every_row() {
        let converted =
            Converter::new(fixtures::TEST_CHAIN_ID).convert(fixtures::payload_for_block(10)).unwrap();
        let (blobs, cids) = crate::assemble(&converted);

        assert_eq!(blobs.len(), fixtures::FIXTURE_BLOB_COUNT);
        assert_eq!(cids.block_number(), 10);
        assert_eq!(cids.row_count(), fixtures::FIXTURE_BLOB_COUNT);

        // The header multihash is the block hash itself.
        assert_eq!(cids.header.block_hash.as_slice(), &cids.header.mh_key[2..]);

        // Transaction CIDs address the natural transaction hashes.
        for tx in &cids.transactions {
            assert_eq!(tx.tx_hash.as_slice(), &tx.mh_key[2..]);
        }

        // Leaf keys survive; branch nodes carry none.
        assert_eq!(cids.state_nodes.iter().filter(|n| n.state_leaf_key.is_some()).count(), 1);
        assert!(cids
            .state_nodes
            .iter()
            .all(|n| (n.node_type == NodeType::Leaf) == n.state_leaf_key.is_some()));

        // Rewards: subsidy + fees for a two-transaction block.
        assert!(cids.header.reward > crate::reward::static_subsidy(10));
        assert_eq!(cids.header.td, U256::from(1_000_000_010u64));
    }

    #[test]
    fn orphan_storage_gets_a_placeholder_anchor() {
        let mut payload = fixtures::payload_for_block(10);
        // Point the storage node at a state path absent from the diff.
        payload.storage_nodes[0].state_path = alloy::primitives::Bytes::from(vec![0x0f]);
        let converted = Converter::new(fixtures::TEST_CHAIN_ID).convert(payload).unwrap();
        let (blobs, cids) = crate::assemble(&converted);

        assert_eq!(blobs.len(), fixtures::FIXTURE_BLOB_COUNT + 1);
        assert_eq!(cids.state_nodes.len(), 3);
        let anchor =
            cids.state_nodes.iter().find(|n| n.state_path.as_ref() == [0x0f]).unwrap();
        assert_eq!(anchor.node_type, NodeType::Removed);
        assert!(anchor.state_leaf_key.is_none());
        assert!(cids.storage_nodes.contains_key(&anchor.state_path));

        // The anchor blob is keyed per header: cleaning one block's anchor
        // must never cascade into another block's rows.
        let mut other = fixtures::payload_for_block(11);
        other.storage_nodes[0].state_path = alloy::primitives::Bytes::from(vec![0x0f]);
        let other = Converter::new(fixtures::TEST_CHAIN_ID).convert(other).unwrap();
        let (_, other_cids) = crate::assemble(&other);
        let other_anchor =
            other_cids.state_nodes.iter().find(|n| n.state_path.as_ref() == [0x0f]).unwrap();
        assert_ne!(anchor.mh_key, other_anchor.mh_key);
    }

    #[tokio::test]
    async fn mem_pipeline_is_idempotent() {
        let converter = Converter::new(fixtures::TEST_CHAIN_ID);
        let publisher = MemPublisher::new();
        let indexer = MemIndexer::new();

        let converted = converter.convert(fixtures::payload_for_block(10)).unwrap();
        let cids = publisher.publish(&converted).await.unwrap();
        indexer.index(&cids).await.unwrap();

        assert_eq!(publisher.blob_count().await, fixtures::FIXTURE_BLOB_COUNT);
        let hash = cids.header.block_hash;
        assert_eq!(indexer.times_validated(10, hash).await, Some(1));

        // Second pass: same blobs, same rows, one more validation.
        let cids = publisher.publish(&converted).await.unwrap();
        indexer.index(&cids).await.unwrap();
        assert_eq!(publisher.blob_count().await, fixtures::FIXTURE_BLOB_COUNT);
        assert_eq!(indexer.times_validated(10, hash).await, Some(2));

        let counts = indexer.counts().await;
        assert_eq!(counts.headers, 1);
        assert_eq!(counts.transactions, 2);
        assert_eq!(counts.receipts, 2);
        assert_eq!(counts.state_nodes, 2);
        assert_eq!(counts.storage_nodes, 1);

        // Every referenced mh_key resolves in the blob store.
        for tx in &cids.transactions {
            assert!(publisher.contains(&tx.mh_key).await);
        }
        assert!(publisher.contains(&cids.header.mh_key).await);
    }

    #[tokio::test]
    async fn mem_index_view_reports_gaps() {
        let converter = Converter::new(fixtures::TEST_CHAIN_ID);
        let publisher = MemPublisher::new();
        let indexer = MemIndexer::new();

        for number in [1u64, 2, 5, 6] {
            let converted = converter.convert(fixtures::payload_for_block(number)).unwrap();
            let cids = publisher.publish(&converted).await.unwrap();
            indexer.index(&cids).await.unwrap();
        }

        assert_eq!(indexer.max_block_number().await.unwrap(), Some(6));
        assert_eq!(indexer.find_gaps().await.unwrap(), vec![BlockRange::new(3, 4)]);
    }
}
