//! Assembly of the blob set and row models for one converted payload.

use crate::{ipld, reward};
use ipld_eth_types::{
    CidPayload, ConvertedPayload, DbHeaderCid, DbReceiptCid, DbStateCid, DbStorageCid,
    DbTransactionCid, DbUncleCid,
};
use std::collections::BTreeMap;

/// Project a converted payload onto its IPLD blobs and relational rows.
///
/// The returned blob list covers every `mh_key` referenced by the
/// [`CidPayload`]; writing the blobs before the rows preserves the
/// blob-before-row invariant. Pure; both stores receive the output as-is.
pub fn assemble(payload: &ConvertedPayload) -> (Vec<ipld::IpldBlob>, CidPayload) {
    let header = &payload.block.header;
    let body = &payload.block.body;
    let mut blobs =
        Vec::with_capacity(1 + body.ommers.len() + body.transactions.len() * 2);

    let header_blob = ipld::header_ipld(header);
    let header_row = DbHeaderCid {
        block_number: header.number,
        block_hash: payload.block_hash,
        parent_hash: header.parent_hash,
        cid: header_blob.cid.to_string(),
        mh_key: header_blob.mh_key(),
        td: payload.total_difficulty,
        reward: reward::block_reward(
            header,
            body.ommers.len(),
            &body.transactions,
            &payload.receipts,
        ),
        state_root: header.state_root,
        tx_root: header.transactions_root,
        receipt_root: header.receipts_root,
        uncle_root: header.ommers_hash,
        bloom: header.logs_bloom,
        timestamp: header.timestamp,
    };
    blobs.push(header_blob);

    let uncles = body
        .ommers
        .iter()
        .map(|uncle| {
            let blob = ipld::uncle_ipld(uncle);
            let row = DbUncleCid {
                block_hash: blob_hash(&blob),
                parent_hash: uncle.parent_hash,
                cid: blob.cid.to_string(),
                mh_key: blob.mh_key(),
                reward: reward::uncle_reward(header.number, uncle.number),
            };
            blobs.push(blob);
            row
        })
        .collect();

    let transactions: Vec<DbTransactionCid> = body
        .transactions
        .iter()
        .zip(&payload.tx_meta)
        .map(|(tx, meta)| {
            let blob = ipld::tx_ipld(tx);
            let row = DbTransactionCid {
                tx_hash: meta.hash,
                index: meta.index,
                cid: blob.cid.to_string(),
                mh_key: blob.mh_key(),
                src: meta.src,
                dst: meta.dst,
                data: meta.data.clone(),
            };
            blobs.push(blob);
            row
        })
        .collect();

    let receipts = payload
        .receipts
        .iter()
        .zip(&payload.receipt_meta)
        .zip(&payload.tx_meta)
        .map(|((receipt, meta), tx_meta)| {
            let blob = ipld::receipt_ipld(receipt);
            let row = DbReceiptCid {
                cid: blob.cid.to_string(),
                mh_key: blob.mh_key(),
                contract: meta.contract,
                contract_hash: meta.contract_hash,
                topics: meta.topics.clone(),
                log_contracts: meta.log_contracts.clone(),
            };
            blobs.push(blob);
            (tx_meta.hash, row)
        })
        .collect();

    let mut state_nodes: Vec<DbStateCid> = payload
        .state_nodes
        .iter()
        .map(|node| {
            let blob = ipld::state_node_ipld(node);
            let row = DbStateCid {
                state_path: node.path.clone(),
                state_leaf_key: node.leaf_key(),
                cid: blob.cid.to_string(),
                mh_key: blob.mh_key(),
                node_type: node.node_type,
            };
            blobs.push(blob);
            row
        })
        .collect();

    // A storage subtree can change under an account whose own node did not;
    // anchor such groups with a placeholder state node so their rows still
    // have an owner. The placeholder bytes fold in the block hash and the
    // state path: each anchor gets its own blob key, so a range-scoped
    // clean of one header's anchor never touches another's.
    for state_path in payload.storage_nodes.keys() {
        if !state_nodes.iter().any(|node| &node.state_path == state_path) {
            let mut anchor_bytes = payload.block_hash.as_slice().to_vec();
            anchor_bytes.extend_from_slice(state_path);
            let blob = ipld::IpldBlob::new(ipld::codec::ETH_STATE_TRIE, anchor_bytes);
            state_nodes.push(DbStateCid {
                state_path: state_path.clone(),
                state_leaf_key: None,
                cid: blob.cid.to_string(),
                mh_key: blob.mh_key(),
                node_type: ipld_eth_types::NodeType::Removed,
            });
            blobs.push(blob);
        }
    }

    let mut storage_nodes = BTreeMap::new();
    for (state_path, nodes) in &payload.storage_nodes {
        let rows: Vec<DbStorageCid> = nodes
            .iter()
            .map(|node| {
                let blob = ipld::storage_node_ipld(node);
                let row = DbStorageCid {
                    storage_path: node.path.clone(),
                    storage_leaf_key: node.leaf_key(),
                    cid: blob.cid.to_string(),
                    mh_key: blob.mh_key(),
                    node_type: node.node_type,
                };
                blobs.push(blob);
                row
            })
            .collect();
        storage_nodes.insert(state_path.clone(), rows);
    }

    (
        blobs,
        CidPayload { header: header_row, uncles, transactions, receipts, state_nodes, storage_nodes },
    )
}

/// The keccak digest the blob was addressed by, as a hash value.
fn blob_hash(blob: &ipld::IpldBlob) -> alloy::primitives::B256 {
    alloy::primitives::B256::from_slice(blob.cid.hash().digest())
}
