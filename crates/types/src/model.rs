//! Row models for the `eth` schema, each paired with the CID it references.
//!
//! A `Db*Cid` value is one relational row the indexer will write, carrying
//! the string form of the CID for the `cid` column and the serialized
//! multihash for the `mh_key` column. The models are assembled by the
//! publisher and consumed by the indexer; they never travel back out of the
//! database as these types.

use crate::NodeType;
use alloy::primitives::{Address, Bloom, Bytes, B256, U256};
use std::collections::BTreeMap;

/// The `eth.header_cids` row for one block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbHeaderCid {
    /// Height of the block.
    pub block_number: u64,
    /// Hash of the header.
    pub block_hash: B256,
    /// Hash of the parent header.
    pub parent_hash: B256,
    /// String form of the header CID.
    pub cid: String,
    /// Serialized multihash keying the header blob.
    pub mh_key: Vec<u8>,
    /// Total difficulty through this block.
    pub td: U256,
    /// Miner reward for this block.
    pub reward: U256,
    /// State trie root.
    pub state_root: B256,
    /// Transaction trie root.
    pub tx_root: B256,
    /// Receipt trie root.
    pub receipt_root: B256,
    /// Uncles list hash.
    pub uncle_root: B256,
    /// Aggregate logs bloom.
    pub bloom: Bloom,
    /// Header timestamp, seconds.
    pub timestamp: u64,
}

/// The `eth.uncle_cids` row for one uncle header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbUncleCid {
    /// Hash of the uncle header.
    pub block_hash: B256,
    /// Hash of the uncle's parent.
    pub parent_hash: B256,
    /// String form of the uncle CID.
    pub cid: String,
    /// Serialized multihash keying the uncle blob.
    pub mh_key: Vec<u8>,
    /// Uncle miner reward.
    pub reward: U256,
}

/// The `eth.transaction_cids` row for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbTransactionCid {
    /// Transaction hash.
    pub tx_hash: B256,
    /// Position within the block.
    pub index: u64,
    /// String form of the transaction CID.
    pub cid: String,
    /// Serialized multihash keying the transaction blob.
    pub mh_key: Vec<u8>,
    /// Recovered sender.
    pub src: Address,
    /// Recipient; `None` for contract creation.
    pub dst: Option<Address>,
    /// Call data.
    pub data: Bytes,
}

/// The `eth.receipt_cids` row for one receipt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DbReceiptCid {
    /// String form of the receipt CID.
    pub cid: String,
    /// Serialized multihash keying the receipt blob.
    pub mh_key: Vec<u8>,
    /// Created contract address, for creation transactions.
    pub contract: Option<Address>,
    /// Keccak hash of the created contract address.
    pub contract_hash: Option<B256>,
    /// Per-position log topics: `topics[n]` collects topic `n` of every log.
    pub topics: [Vec<B256>; 4],
    /// Addresses that emitted logs in this receipt.
    pub log_contracts: Vec<Address>,
}

/// The `eth.state_cids` row for one account-trie node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStateCid {
    /// Nibble path from the state trie root.
    pub state_path: Bytes,
    /// Hashed account key, for leaf nodes.
    pub state_leaf_key: Option<B256>,
    /// String form of the node CID.
    pub cid: String,
    /// Serialized multihash keying the node blob.
    pub mh_key: Vec<u8>,
    /// Node kind tag.
    pub node_type: NodeType,
}

/// The `eth.storage_cids` row for one storage-trie node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStorageCid {
    /// Nibble path from the storage trie root.
    pub storage_path: Bytes,
    /// Hashed slot key, for leaf nodes.
    pub storage_leaf_key: Option<B256>,
    /// String form of the node CID.
    pub cid: String,
    /// Serialized multihash keying the node blob.
    pub mh_key: Vec<u8>,
    /// Node kind tag.
    pub node_type: NodeType,
}

/// Every relational row to be written for one block, with the CID and
/// mh_key each row references.
///
/// Produced by the publisher after the blobs are durably in the block
/// store, consumed by the indexer inside a single transaction. Receipts are
/// keyed by the hash of their transaction; storage nodes are grouped under
/// the state path of their enclosing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidPayload {
    /// The header row.
    pub header: DbHeaderCid,
    /// Uncle rows.
    pub uncles: Vec<DbUncleCid>,
    /// Transaction rows, in block order.
    pub transactions: Vec<DbTransactionCid>,
    /// Receipt rows keyed by transaction hash.
    pub receipts: BTreeMap<B256, DbReceiptCid>,
    /// State node rows.
    pub state_nodes: Vec<DbStateCid>,
    /// Storage node rows grouped by enclosing state path.
    pub storage_nodes: BTreeMap<Bytes, Vec<DbStorageCid>>,
}

impl CidPayload {
    /// Height of the block this payload indexes.
    pub const fn block_number(&self) -> u64 {
        self.header.block_number
    }

    /// Total number of rows this payload will write.
    pub fn row_count(&self) -> usize {
        1 + self.uncles.len()
            + self.transactions.len()
            + self.receipts.len()
            + self.state_nodes.len()
            + self.storage_nodes.values().map(Vec::len).sum::<usize>()
    }
}
