//! Deterministic payload fixtures shared by tests across the workspace.
//!
//! `payload_for_block` produces a fully decodable state diff: two signed
//! legacy transactions (one call, one contract creation), paired receipts,
//! two state nodes and one storage node under the first state path.

use alloy::{
    consensus::{
        Block, BlockBody, Header, Receipt, ReceiptEnvelope, ReceiptWithBloom,
        SignableTransaction, TxEnvelope, TxLegacy,
    },
    eips::eip2718::Encodable2718,
    primitives::{b256, Address, Bytes, Log, TxKind, B256, U256},
    signers::{local::PrivateKeySigner, SignerSync},
};
use ipld_eth_types::{NodeType, SourceNode, StateDiffPayload, StateNode, StorageNode};

/// Chain id all fixtures are signed for.
pub const TEST_CHAIN_ID: u64 = 1;

/// A deterministic signer for fixture transactions.
pub fn test_signer() -> PrivateKeySigner {
    PrivateKeySigner::from_bytes(&b256!(
        "0x4646464646464646464646464646464646464646464646464646464646464646"
    ))
    .expect("fixture key is a valid secp256k1 scalar")
}

/// The source-node identity fixtures index under.
pub fn test_source() -> SourceNode {
    SourceNode {
        node_id: "test-node".to_owned(),
        client_name: "geth/fixture".to_owned(),
        genesis_block: B256::repeat_byte(0x11),
        network_id: 1,
        chain_id: TEST_CHAIN_ID,
    }
}

fn signed_legacy(nonce: u64, to: TxKind, signer: &PrivateKeySigner) -> TxEnvelope {
    let tx = TxLegacy {
        chain_id: Some(TEST_CHAIN_ID),
        nonce,
        gas_price: 20_000_000_000,
        gas_limit: 21_000,
        to,
        value: U256::from(1_000u64),
        input: Bytes::from(vec![0xde, 0xad]),
    };
    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .expect("signing a fixture hash cannot fail");
    TxEnvelope::Legacy(tx.into_signed(signature))
}

fn legacy_receipt(cumulative_gas_used: u64, logs: Vec<Log>) -> ReceiptEnvelope {
    let receipt = Receipt { status: true.into(), cumulative_gas_used, logs };
    let logs_bloom = receipt.bloom_slow();
    ReceiptEnvelope::Legacy(ReceiptWithBloom { receipt, logs_bloom })
}

fn encode_receipts(receipts: &[ReceiptEnvelope]) -> Bytes {
    let payload_length: usize = receipts.iter().map(Encodable2718::network_len).sum();
    let mut out = Vec::with_capacity(payload_length + 4);
    alloy::rlp::Header { list: true, payload_length }.encode(&mut out);
    for receipt in receipts {
        receipt.network_encode(&mut out);
    }
    out.into()
}

fn leaf(path: Vec<u8>, key_byte: u8) -> (Bytes, B256) {
    (Bytes::from(path), B256::repeat_byte(key_byte))
}

/// A complete, decodable payload for the given block height.
///
/// Transaction nonces, receipt gas totals and trie node values all fold in
/// the block height, so payloads for different heights share no blobs.
pub fn payload_for_block(block_number: u64) -> StateDiffPayload {
    payload_inner(block_number, vec![])
}

/// Like [`payload_for_block`], with one uncle included.
pub fn payload_with_uncle(block_number: u64) -> StateDiffPayload {
    let uncle = Header {
        number: block_number.saturating_sub(1),
        extra_data: Bytes::from(vec![0x55]),
        ..Default::default()
    };
    payload_inner(block_number, vec![uncle])
}

fn payload_inner(block_number: u64, ommers: Vec<Header>) -> StateDiffPayload {
    let signer = test_signer();
    let transactions = vec![
        signed_legacy(block_number * 2, TxKind::Call(Address::repeat_byte(0x22)), &signer),
        signed_legacy(block_number * 2 + 1, TxKind::Create, &signer),
    ];
    let log = Log::new_unchecked(
        Address::repeat_byte(0x33),
        vec![B256::repeat_byte(0x44)],
        Bytes::new(),
    );
    let receipts = vec![
        legacy_receipt(21_000 + block_number, vec![log]),
        legacy_receipt(42_000 + block_number, vec![]),
    ];

    let header = Header {
        number: block_number,
        gas_limit: 8_000_000,
        gas_used: 42_000 + block_number,
        timestamp: 1_600_000_000 + block_number,
        ..Default::default()
    };
    let block = Block { header, body: BlockBody { transactions, ommers, withdrawals: None } };

    let (state_path_a, account_key) = leaf(vec![0x01], 0xaa);
    let (state_path_b, _) = leaf(vec![0x02], 0x00);
    let (storage_path, slot_key) = leaf(vec![0x04], 0xbb);
    let height_byte = block_number as u8;

    StateDiffPayload {
        receipts_rlp: encode_receipts(&receipts),
        block_rlp: alloy::rlp::encode(&block).into(),
        total_difficulty: U256::from(1_000_000_000u64) + U256::from(block_number),
        state_nodes: vec![
            StateNode {
                path: state_path_a.clone(),
                node_value: Bytes::from(vec![0xc2, 0x80, height_byte]),
                leaf_key: account_key,
                node_type: NodeType::Leaf,
            },
            StateNode {
                path: state_path_b,
                node_value: Bytes::from(vec![0xc3, 0x80, 0x80, height_byte]),
                leaf_key: B256::ZERO,
                node_type: NodeType::Branch,
            },
        ],
        storage_nodes: vec![StorageNode {
            path: storage_path,
            node_value: Bytes::from(vec![0xc2, 0x01, height_byte]),
            leaf_key: slot_key,
            node_type: NodeType::Leaf,
            state_path: state_path_a,
        }],
    }
}

/// Number of distinct IPLD blobs `payload_for_block` yields end to end:
/// header + two transactions + two receipts + two state nodes + one
/// storage node.
pub const FIXTURE_BLOB_COUNT: usize = 8;
