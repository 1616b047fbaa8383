//! The typed in-memory graph decoded from one state-diff payload.

use crate::{StateNode, StorageNode};
use alloy::{
    consensus::{Block, ReceiptEnvelope, TxEnvelope},
    primitives::{Address, Bytes, B256, U256},
};
use std::collections::BTreeMap;

/// Per-transaction metadata precomputed by the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMeta {
    /// Transaction hash.
    pub hash: B256,
    /// Position within the block.
    pub index: u64,
    /// Recovered sender.
    pub src: Address,
    /// Recipient; `None` for contract creation.
    pub dst: Option<Address>,
    /// Call data.
    pub data: Bytes,
}

/// Per-receipt metadata precomputed by the converter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiptMeta {
    /// Created contract address, for creation transactions.
    pub contract: Option<Address>,
    /// Keccak hash of the created contract address.
    pub contract_hash: Option<B256>,
    /// Per-position log topics: `topics[n]` collects topic `n` of every log.
    pub topics: [Vec<B256>; 4],
    /// Addresses that emitted logs.
    pub log_contracts: Vec<Address>,
}

/// The fully decoded form of one upstream payload.
///
/// `tx_meta` and `receipt_meta` are index-aligned with the block's
/// transactions. Trie node sets are deduplicated by path; storage nodes are
/// grouped by the state path of their enclosing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPayload {
    /// The decoded block.
    pub block: Block<TxEnvelope>,
    /// Hash of the block header, computed once at conversion.
    pub block_hash: B256,
    /// Consensus receipts, one per transaction.
    pub receipts: Vec<ReceiptEnvelope>,
    /// Total difficulty through this block.
    pub total_difficulty: U256,
    /// Transaction metadata, index-aligned with the block's transactions.
    pub tx_meta: Vec<TxMeta>,
    /// Receipt metadata, index-aligned with `receipts`.
    pub receipt_meta: Vec<ReceiptMeta>,
    /// Deduplicated account-trie nodes, ordered by path.
    pub state_nodes: Vec<StateNode>,
    /// Deduplicated storage-trie nodes grouped by enclosing state path.
    pub storage_nodes: BTreeMap<Bytes, Vec<StorageNode>>,
}

impl ConvertedPayload {
    /// Height of the decoded block.
    pub const fn block_number(&self) -> u64 {
        self.block.header.number
    }
}
