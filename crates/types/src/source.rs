//! Identity of the upstream execution node.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// Describes the execution node a running indexer observes.
///
/// Several indexers may share one metadata store; the fingerprint derived
/// from this identity scopes header rows so their validation counters do
/// not interfere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNode {
    /// Stable identifier of the node instance.
    pub node_id: String,
    /// Client name and version string reported by the node.
    pub client_name: String,
    /// Hash of the chain's genesis block.
    pub genesis_block: B256,
    /// Network id the node is attached to.
    pub network_id: u64,
    /// Chain id used for sender recovery.
    pub chain_id: u64,
}

impl SourceNode {
    /// The `eth_node_fingerprint` value persisted with every header row.
    ///
    /// Combines the chain view (genesis, network) with the node instance so
    /// two nodes following the same chain still count validations apart.
    pub fn fingerprint(&self) -> String {
        format!("{}-{}-{}", self.genesis_block, self.network_id, self.node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(node_id: &str) -> SourceNode {
        SourceNode {
            node_id: node_id.to_owned(),
            client_name: "geth/v1.9.11".to_owned(),
            genesis_block: B256::repeat_byte(0x11),
            network_id: 1,
            chain_id: 1,
        }
    }

    #[test]
    fn fingerprint_distinguishes_instances() {
        assert_ne!(source("a").fingerprint(), source("b").fingerprint());
    }

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(source("a").fingerprint(), source("a").fingerprint());
    }
}
