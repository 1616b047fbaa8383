//! Shared data types for the Ethereum state-diff IPLD indexer.
//!
//! This crate holds the plain data carried between pipeline stages:
//!
//! - the wire payload delivered by the upstream node ([`StateDiffPayload`])
//! - the typed graph the converter decodes it into ([`ConvertedPayload`])
//! - the relational row models paired with their CIDs ([`CidPayload`])
//! - range and kind selectors for the cleaner ([`BlockRange`], [`DataKind`])
//!
//! No I/O and no business logic live here.

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

mod converted;
pub use converted::{ConvertedPayload, ReceiptMeta, TxMeta};

mod kind;
pub use kind::{DataKind, UnknownDataKind};

mod model;
pub use model::{
    CidPayload, DbHeaderCid, DbReceiptCid, DbStateCid, DbStorageCid, DbTransactionCid, DbUncleCid,
};

mod node;
pub use node::{NodeType, StateNode, StorageNode, UnknownNodeType};

mod payload;
pub use payload::{StateDiffPayload, StreamParams};

mod range;
pub use range::BlockRange;

mod source;
pub use source::SourceNode;
