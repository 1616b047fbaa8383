//! Postgres backends for the state-diff IPLD indexer.
//!
//! Implements the pipeline's storage capabilities over sqlx:
//!
//! - [`PgPublisher`] writes content-addressed blobs into `public.blocks`
//! - [`PgIndexer`] commits the `eth.*` metadata rows transactionally
//! - [`PgCleaner`] handles range deletion and validation reset
//! - [`PgIndexReader`] serves the gap queries behind back-fill
//!
//! The schema is applied by an external migration tool; [`version`] gates
//! startup on the migration level. A copy of the migration ships under
//! `migrations/` for test setup and operator reference.

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

mod clean;
pub use clean::PgCleaner;

mod connect;
pub use connect::{connect, connect_url, DbConfig};

mod encode;

mod error;
pub use error::SqlStoreError;

mod index;
pub use index::PgIndexer;

mod publish;
pub use publish::PgPublisher;

mod reader;
pub use reader::PgIndexReader;

mod version;
pub use version::{ensure_schema_version, MIN_SCHEMA_VERSION};

/// The initial schema migration, as shipped under `migrations/`.
pub const INITIAL_MIGRATION: &str = include_str!("../migrations/001_initial.sql");
