//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use daiv_governance::TimelockRoles;
use daiv_types::{AccountId, ProtocolParams};

use crate::NodeError;

/// Timelock role holders, as listed in the configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// May cancel queued proposals.
    #[serde(default)]
    pub admin: Option<AccountId>,

    /// May cancel queued proposals.
    #[serde(default)]
    pub proposers: Vec<AccountId>,

    /// May execute queued proposals once their delay has passed.
    #[serde(default)]
    pub executors: Vec<AccountId>,
}

impl RoleConfig {
    pub fn to_roles(&self) -> TimelockRoles {
        TimelockRoles {
            admin: self.admin.clone(),
            proposers: self.proposers.iter().cloned().collect(),
            executors: self.executors.iter().cloned().collect(),
        }
    }
}

impl Default for RoleConfig {
    fn default() -> Self {
        let deployer = AccountId::new("admin");
        Self {
            admin: Some(deployer.clone()),
            proposers: vec![deployer.clone()],
            executors: vec![deployer],
        }
    }
}

/// Tokens and governance weight granted when a fresh store is initialised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    pub account: AccountId,
    #[serde(default)]
    pub balance: u64,
    #[serde(default)]
    pub voting_power: u64,
}

/// Configuration for a DAIV node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for LMDB storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Whether to enable the RPC server.
    #[serde(default = "default_true")]
    pub enable_rpc: bool,

    /// Address the RPC server binds to.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// RPC port (if enabled).
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Whether to serve Prometheus metrics at `/metrics`.
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Receives slashed stakes.
    #[serde(default = "default_treasury")]
    pub treasury: AccountId,

    #[serde(default)]
    pub roles: RoleConfig,

    /// Initial protocol parameters. Once a store exists, the governed values
    /// persisted in it take precedence.
    #[serde(default)]
    pub params: ProtocolParams,

    /// Allocations applied only when the store is empty.
    #[serde(default)]
    pub genesis: Vec<GenesisAllocation>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./daiv_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    7177
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_treasury() -> AccountId {
    AccountId::new("treasury")
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    /// Reject configurations the protocol cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if !self.treasury.is_valid() {
            return Err(NodeError::Config(format!(
                "invalid treasury account {:?}",
                self.treasury.as_str()
            )));
        }
        if self.roles.executors.is_empty() {
            return Err(NodeError::Config(
                "at least one timelock executor is required".into(),
            ));
        }
        if self.params.voting_period_secs == 0 {
            return Err(NodeError::Config("voting_period_secs must be positive".into()));
        }
        if let Some(bad) = self.genesis.iter().find(|g| !g.account.is_valid()) {
            return Err(NodeError::Config(format!(
                "invalid genesis account {:?}",
                bad.account.as_str()
            )));
        }
        Ok(())
    }

    /// Short governance timelines and a funded test account, for local use.
    pub fn dev() -> Self {
        Self {
            params: ProtocolParams::dev_defaults(),
            genesis: vec![GenesisAllocation {
                account: AccountId::new("admin"),
                balance: 1_000,
                voting_power: 1_000,
            }],
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            enable_rpc: default_true(),
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            enable_metrics: default_true(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            treasury: default_treasury(),
            roles: RoleConfig::default(),
            params: ProtocolParams::default(),
            genesis: Vec::new(),
        }
    }
}
