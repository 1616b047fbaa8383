//! Content addressing for Ethereum entities.
//!
//! Every object the publisher writes is keyed by a CIDv1 whose multihash is
//! the keccak-256 of the object bytes. Because headers, transactions and
//! receipts hash to their natural Ethereum identifiers, the resulting CIDs
//! are resolvable from the corresponding trie roots.

use alloy::{
    consensus::{Header, ReceiptEnvelope, TxEnvelope},
    eips::eip2718::Encodable2718,
    primitives::keccak256,
};
use cid::{multihash::Multihash, Cid};
use ipld_eth_types::{StateNode, StorageNode};

/// Multicodec content types for Ethereum IPLD objects.
pub mod codec {
    /// An RLP-encoded block header.
    pub const ETH_BLOCK: u64 = 0x90;
    /// An RLP-encoded list of uncle headers.
    pub const ETH_BLOCK_LIST: u64 = 0x91;
    /// A node of a transaction trie.
    pub const ETH_TX_TRIE: u64 = 0x92;
    /// An encoded transaction.
    pub const ETH_TX: u64 = 0x93;
    /// A node of a receipt trie.
    pub const ETH_TX_RECEIPT_TRIE: u64 = 0x94;
    /// An encoded receipt.
    pub const ETH_TX_RECEIPT: u64 = 0x95;
    /// A node of the state trie.
    pub const ETH_STATE_TRIE: u64 = 0x96;
    /// A node of a storage trie.
    pub const ETH_STORAGE_TRIE: u64 = 0x98;
}

/// Multihash function code for keccak-256.
const MH_KECCAK_256: u64 = 0x1b;

/// A content-addressed blob ready for the block store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpldBlob {
    /// Content identifier of the blob.
    pub cid: Cid,
    /// The raw bytes.
    pub data: Vec<u8>,
}

impl IpldBlob {
    /// Address `data` under the given multicodec.
    pub fn new(codec: u64, data: Vec<u8>) -> Self {
        let digest = keccak256(&data);
        let mh = Multihash::wrap(MH_KECCAK_256, digest.as_slice())
            .expect("a keccak-256 digest fits a 64-byte multihash");
        Self { cid: Cid::new_v1(codec, mh), data }
    }

    /// Serialized multihash, the block store primary key.
    pub fn mh_key(&self) -> Vec<u8> {
        self.cid.hash().to_bytes()
    }
}

/// Address a block header.
pub fn header_ipld(header: &Header) -> IpldBlob {
    IpldBlob::new(codec::ETH_BLOCK, alloy::rlp::encode(header))
}

/// Address an uncle header.
pub fn uncle_ipld(uncle: &Header) -> IpldBlob {
    IpldBlob::new(codec::ETH_BLOCK, alloy::rlp::encode(uncle))
}

/// Address a transaction by its canonical (EIP-2718) encoding.
pub fn tx_ipld(tx: &TxEnvelope) -> IpldBlob {
    IpldBlob::new(codec::ETH_TX, tx.encoded_2718())
}

/// Address a receipt by its canonical (EIP-2718) encoding.
pub fn receipt_ipld(receipt: &ReceiptEnvelope) -> IpldBlob {
    IpldBlob::new(codec::ETH_TX_RECEIPT, receipt.encoded_2718())
}

/// Address a state trie node.
pub fn state_node_ipld(node: &StateNode) -> IpldBlob {
    IpldBlob::new(codec::ETH_STATE_TRIE, node.node_value.to_vec())
}

/// Address a storage trie node.
pub fn storage_node_ipld(node: &StorageNode) -> IpldBlob {
    IpldBlob::new(codec::ETH_STORAGE_TRIE, node.node_value.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::consensus::Sealable;

    #[test]
    fn header_multihash_is_the_block_hash() {
        let header = Header { number: 42, ..Default::default() };
        let blob = header_ipld(&header);
        assert_eq!(blob.cid.hash().digest(), header.hash_slow().as_slice());
        assert_eq!(blob.cid.codec(), codec::ETH_BLOCK);
    }

    #[test]
    fn identical_bytes_share_a_key() {
        let a = IpldBlob::new(codec::ETH_STATE_TRIE, vec![0xc2, 0x80, 0x80]);
        let b = IpldBlob::new(codec::ETH_STATE_TRIE, vec![0xc2, 0x80, 0x80]);
        assert_eq!(a.cid, b.cid);
        assert_eq!(a.mh_key(), b.mh_key());
    }

    #[test]
    fn mh_key_embeds_the_keccak_code() {
        let blob = IpldBlob::new(codec::ETH_TX, vec![0x01]);
        let key = blob.mh_key();
        // varint code 0x1b, varint length 32, then the digest
        assert_eq!(key[0], 0x1b);
        assert_eq!(key[1], 32);
        assert_eq!(key.len(), 34);
    }
}
