//! Trie node records carried by a state diff.

use alloy::primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};

/// Patricia-Merkle trie node kind tag.
///
/// The wire encoding is the upstream node's integer tag. `Removed` marks a
/// node that was deleted by the block; its value is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum NodeType {
    /// A 17-item branch node.
    Branch,
    /// An extension node wrapping a shared path prefix.
    Extension,
    /// A leaf node holding an account or storage value.
    Leaf,
    /// A node removed by this block.
    Removed,
}

impl NodeType {
    /// The integer tag used on the wire and in the `node_type` columns.
    pub const fn as_int(&self) -> i32 {
        match self {
            Self::Branch => 0,
            Self::Extension => 1,
            Self::Leaf => 2,
            Self::Removed => 3,
        }
    }
}

impl From<NodeType> for u8 {
    fn from(t: NodeType) -> Self {
        t.as_int() as u8
    }
}

impl TryFrom<u8> for NodeType {
    type Error = UnknownNodeType;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Branch),
            1 => Ok(Self::Extension),
            2 => Ok(Self::Leaf),
            3 => Ok(Self::Removed),
            other => Err(UnknownNodeType(other)),
        }
    }
}

/// An unrecognized trie node tag on the wire.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("unknown trie node type tag: {0}")]
pub struct UnknownNodeType(pub u8);

/// A touched node in the account trie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateNode {
    /// Nibble path from the state trie root to this node.
    pub path: Bytes,
    /// RLP encoding of the node.
    pub node_value: Bytes,
    /// Keccak hash of the account address; meaningful for leaf nodes only.
    pub leaf_key: B256,
    /// Node kind tag.
    pub node_type: NodeType,
}

impl StateNode {
    /// The leaf key, if this node is a leaf.
    pub const fn leaf_key(&self) -> Option<B256> {
        match self.node_type {
            NodeType::Leaf => Some(self.leaf_key),
            _ => None,
        }
    }
}

/// A touched node in some account's storage trie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageNode {
    /// Nibble path from the storage trie root to this node.
    pub path: Bytes,
    /// RLP encoding of the node.
    pub node_value: Bytes,
    /// Keccak hash of the storage slot; meaningful for leaf nodes only.
    pub leaf_key: B256,
    /// Node kind tag.
    pub node_type: NodeType,
    /// Path of the enclosing account in the state trie.
    ///
    /// The matching state node may be absent from the same payload: a
    /// storage subtree can change under an otherwise untouched account.
    pub state_path: Bytes,
}

impl StorageNode {
    /// The leaf key, if this node is a leaf.
    pub const fn leaf_key(&self) -> Option<B256> {
        match self.node_type {
            NodeType::Leaf => Some(self.leaf_key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_tags_round_trip() {
        for t in [NodeType::Branch, NodeType::Extension, NodeType::Leaf, NodeType::Removed] {
            assert_eq!(NodeType::try_from(u8::from(t)).unwrap(), t);
        }
        assert!(NodeType::try_from(4).is_err());
    }

    #[test]
    fn leaf_key_only_for_leaves() {
        let node = StateNode {
            path: Bytes::from(vec![0x01]),
            node_value: Bytes::from(vec![0xc0]),
            leaf_key: B256::repeat_byte(0xab),
            node_type: NodeType::Branch,
        };
        assert!(node.leaf_key().is_none());

        let leaf = StateNode { node_type: NodeType::Leaf, ..node };
        assert_eq!(leaf.leaf_key(), Some(B256::repeat_byte(0xab)));
    }
}
