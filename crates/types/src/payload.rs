//! Wire types delivered by the upstream node's `statediff` namespace.

use crate::{StateNode, StorageNode};
use alloy::primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};

/// Parameters sent with the `statediff_subscribe` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamParams {
    /// Include the RLP-encoded block in each payload.
    pub include_block: bool,
    /// Include the total difficulty in each payload.
    #[serde(rename = "includeTD")]
    pub include_td: bool,
    /// Include the RLP-encoded receipts in each payload.
    pub include_receipts: bool,
    /// Emit branch and extension nodes of the state trie, not just leaves.
    pub intermediate_state_nodes: bool,
    /// Emit branch and extension nodes of storage tries, not just leaves.
    pub intermediate_storage_nodes: bool,
}

impl StreamParams {
    /// Parameters requesting everything the pipeline consumes.
    pub const fn full() -> Self {
        Self {
            include_block: true,
            include_td: true,
            include_receipts: true,
            intermediate_state_nodes: true,
            intermediate_storage_nodes: true,
        }
    }
}

impl Default for StreamParams {
    fn default() -> Self {
        Self::full()
    }
}

/// One state-diff notification, delivered per canonical block.
///
/// Carries the full RLP-encoded block and receipts alongside the trie nodes
/// the block touched. Everything else the pipeline needs is derived from
/// these fields by the converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateDiffPayload {
    /// RLP encoding of the block (header, transactions, uncles).
    pub block_rlp: Bytes,
    /// RLP list of the block's consensus receipts.
    pub receipts_rlp: Bytes,
    /// Total difficulty of the chain up to and including this block.
    pub total_difficulty: U256,
    /// Touched account-trie nodes, unordered.
    #[serde(default)]
    pub state_nodes: Vec<StateNode>,
    /// Touched storage-trie nodes, unordered.
    #[serde(default)]
    pub storage_nodes: Vec<StorageNode>,
}
