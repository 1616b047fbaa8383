//! TOML configuration for the indexer process.
//!
//! The configuration is an explicit value loaded once at startup and passed
//! into the components that need it; nothing reads it globally afterwards.

use alloy::primitives::B256;
use ipld_eth_sql::DbConfig;
use ipld_eth_sync::BackfillConfig;
use ipld_eth_types::SourceNode;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Full process configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Identity of the upstream execution node.
    pub ethereum: EthereumSection,
    /// Metadata store connection.
    pub database: DbConfig,
    /// Live subscription settings.
    #[serde(default)]
    pub sync: SyncSection,
    /// Back-fill settings.
    #[serde(default)]
    pub backfill: BackfillSection,
    /// Logging settings.
    #[serde(default)]
    pub log: LogSection,
}

impl Config {
    /// Load and parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// The source-node identity this process indexes under.
    pub fn source_node(&self) -> SourceNode {
        SourceNode {
            node_id: self.ethereum.node_id.clone(),
            client_name: self.ethereum.client_name.clone(),
            genesis_block: self.ethereum.genesis_block,
            network_id: self.ethereum.network_id,
            chain_id: self.ethereum.chain_id,
        }
    }
}

/// The `[ethereum]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EthereumSection {
    /// Stable identifier of the node instance.
    #[serde(rename = "nodeID")]
    pub node_id: String,
    /// Client name and version reported by the node.
    #[serde(rename = "clientName", default = "default_client_name")]
    pub client_name: String,
    /// Hash of the chain's genesis block.
    #[serde(rename = "genesisBlock")]
    pub genesis_block: B256,
    /// Network id the node is attached to.
    #[serde(rename = "networkID", default = "default_one")]
    pub network_id: u64,
    /// Chain id used for sender recovery.
    #[serde(rename = "chainID", default = "default_one")]
    pub chain_id: u64,
}

/// The `[sync]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSection {
    /// Whether the live path runs.
    #[serde(default)]
    pub on: bool,
    /// WebSocket endpoint of the upstream node.
    #[serde(rename = "wsPath", default = "default_ws_path")]
    pub ws_path: String,
    /// Concurrent pipeline workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self { on: false, ws_path: default_ws_path(), workers: default_workers() }
    }
}

/// The `[backfill]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackfillSection {
    /// Whether the gap-filler runs.
    #[serde(default)]
    pub on: bool,
    /// HTTP endpoint of the upstream node.
    #[serde(rename = "httpPath", default = "default_http_path")]
    pub http_path: String,
    /// Seconds between reconciliation ticks.
    #[serde(default = "default_frequency")]
    pub frequency: u64,
    /// Blocks fetched concurrently per batch.
    #[serde(rename = "batchSize", default = "default_batch_size")]
    pub batch_size: usize,
    /// Recent blocks left to the live subscriber.
    #[serde(rename = "validationWindow", default = "default_validation_window")]
    pub validation_window: u64,
}

impl BackfillSection {
    /// The runtime configuration for the controller.
    pub const fn runtime(&self) -> BackfillConfig {
        BackfillConfig {
            frequency: Duration::from_secs(self.frequency),
            batch_size: self.batch_size,
            validation_window: self.validation_window,
        }
    }
}

impl Default for BackfillSection {
    fn default() -> Self {
        Self {
            on: false,
            http_path: default_http_path(),
            frequency: default_frequency(),
            batch_size: default_batch_size(),
            validation_window: default_validation_window(),
        }
    }
}

/// The `[log]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// Filter directive for log output.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional file to write logs to instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self { level: default_log_level(), file: None }
    }
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_client_name() -> String {
    "geth".to_owned()
}

const fn default_one() -> u64 {
    1
}

fn default_ws_path() -> String {
    "ws://127.0.0.1:8546".to_owned()
}

const fn default_workers() -> usize {
    1
}

fn default_http_path() -> String {
    "http://127.0.0.1:8545".to_owned()
}

const fn default_frequency() -> u64 {
    15
}

const fn default_batch_size() -> usize {
    100
}

const fn default_validation_window() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_owned()
}
