//! Decoding of upstream payloads into typed in-memory graphs.

use crate::{ConvertError, PayloadConverter};
use alloy::{
    consensus::{
        transaction::SignerRecoverable, Block, ReceiptEnvelope, Sealable, Transaction, TxEnvelope,
        TxReceipt,
    },
    eips::eip2718::Decodable2718,
    primitives::{keccak256, Bytes, B256},
    rlp::Decodable,
};
use ipld_eth_types::{
    ConvertedPayload, ReceiptMeta, StateDiffPayload, StateNode, StorageNode, TxMeta,
};
use std::collections::BTreeMap;

/// Decodes state-diff payloads for one configured chain.
///
/// The converter is pure: it holds only the chain id and performs no I/O,
/// so one instance can serve any number of parallel workers.
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    chain_id: u64,
}

impl Converter {
    /// Converter for the given chain id.
    pub const fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    fn tx_meta(&self, transactions: &[TxEnvelope]) -> Result<Vec<TxMeta>, ConvertError> {
        let mut meta = Vec::with_capacity(transactions.len());
        for (index, tx) in transactions.iter().enumerate() {
            if let Some(got) = tx.chain_id() {
                if got != self.chain_id {
                    return Err(ConvertError::ChainIdMismatch {
                        index,
                        got,
                        expected: self.chain_id,
                    });
                }
            }
            let src = tx
                .recover_signer()
                .map_err(|source| ConvertError::SenderRecovery { index, source })?;
            meta.push(TxMeta {
                hash: *tx.tx_hash(),
                index: index as u64,
                src,
                dst: tx.to(),
                data: tx.input().clone(),
            });
        }
        Ok(meta)
    }
}

impl PayloadConverter for Converter {
    fn convert(&self, payload: StateDiffPayload) -> Result<ConvertedPayload, ConvertError> {
        let block = Block::<TxEnvelope>::decode(&mut payload.block_rlp.as_ref())
            .map_err(ConvertError::BlockRlp)?;
        let block_hash = block.header.hash_slow();

        let receipts = decode_receipts(&payload.receipts_rlp)?;
        if receipts.len() != block.body.transactions.len() {
            return Err(ConvertError::ReceiptCountMismatch {
                receipts: receipts.len(),
                transactions: block.body.transactions.len(),
            });
        }

        let tx_meta = self.tx_meta(&block.body.transactions)?;
        let receipt_meta = receipt_meta(&tx_meta, &block.body.transactions, &receipts);

        Ok(ConvertedPayload {
            state_nodes: dedup_state_nodes(payload.state_nodes),
            storage_nodes: group_storage_nodes(payload.storage_nodes),
            block,
            block_hash,
            receipts,
            total_difficulty: payload.total_difficulty,
            tx_meta,
            receipt_meta,
        })
    }
}

/// Decode the payload's receipt list.
///
/// Each list item uses the network encoding: a plain RLP list for legacy
/// receipts, an RLP byte-string wrapping the typed encoding otherwise.
fn decode_receipts(rlp: &[u8]) -> Result<Vec<ReceiptEnvelope>, ConvertError> {
    let mut buf = rlp;
    let header = alloy::rlp::Header::decode(&mut buf)
        .map_err(|err| ConvertError::ReceiptsRlp(err.into()))?;
    if !header.list {
        return Err(ConvertError::ReceiptsRlp(alloy::rlp::Error::UnexpectedString.into()));
    }
    let mut items = &buf[..header.payload_length];
    let mut receipts = Vec::new();
    while !items.is_empty() {
        receipts.push(
            ReceiptEnvelope::network_decode(&mut items).map_err(ConvertError::ReceiptsRlp)?,
        );
    }
    Ok(receipts)
}

fn receipt_meta(
    tx_meta: &[TxMeta],
    transactions: &[TxEnvelope],
    receipts: &[ReceiptEnvelope],
) -> Vec<ReceiptMeta> {
    tx_meta
        .iter()
        .zip(transactions)
        .zip(receipts)
        .map(|((tm, tx), receipt)| {
            let contract = tm.dst.is_none().then(|| tm.src.create(tx.nonce()));
            let mut topics: [Vec<B256>; 4] = Default::default();
            let mut log_contracts = Vec::new();
            for log in receipt.logs() {
                for (position, topic) in log.data.topics().iter().take(4).enumerate() {
                    topics[position].push(*topic);
                }
                log_contracts.push(log.address);
            }
            ReceiptMeta {
                contract,
                contract_hash: contract.map(|address| keccak256(address)),
                topics,
                log_contracts,
            }
        })
        .collect()
}

/// Drop duplicate state paths; a payload carrying the same path twice keeps
/// the last occurrence.
fn dedup_state_nodes(nodes: Vec<StateNode>) -> Vec<StateNode> {
    let deduped: BTreeMap<Bytes, StateNode> =
        nodes.into_iter().map(|node| (node.path.clone(), node)).collect();
    deduped.into_values().collect()
}

/// Group storage nodes under their enclosing state path, deduplicating
/// storage paths within each group.
fn group_storage_nodes(nodes: Vec<StorageNode>) -> BTreeMap<Bytes, Vec<StorageNode>> {
    let mut grouped: BTreeMap<Bytes, BTreeMap<Bytes, StorageNode>> = BTreeMap::new();
    for node in nodes {
        grouped
            .entry(node.state_path.clone())
            .or_default()
            .insert(node.path.clone(), node);
    }
    grouped
        .into_iter()
        .map(|(state_path, by_path)| (state_path, by_path.into_values().collect()))
        .collect()
}
