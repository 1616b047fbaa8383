//! Drivers for the state-diff IPLD indexer.
//!
//! Two paths feed the same [`Pipeline`]:
//!
//! - [`SyncService`] holds the live WebSocket subscription and fans
//!   payloads out to a bounded worker pool
//! - [`Backfiller`] periodically reconciles the index against the upstream
//!   head and pulls missing blocks over HTTP
//!
//! Both observe one [`CancellationToken`](tokio_util::sync::CancellationToken)
//! and drain in-flight payloads before returning.

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

mod backfill;
pub use backfill::{BackfillConfig, BackfillStats, Backfiller};

mod backoff;
pub use backoff::Backoff;

mod error;
pub use error::{BackfillError, PipelineError, SyncError};

mod fetch;
pub use fetch::{DiffFetcher, HttpFetcher};

mod pipeline;
pub use pipeline::Pipeline;

mod service;
pub use service::{SyncService, PAYLOAD_CHANNEL_SIZE};

mod stream;
pub use stream::{DiffStreamer, DiffSubscription, WsDiffSubscription, WsStreamer};
