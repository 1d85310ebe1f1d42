// Wallet configuration with environment overrides
//
// Recognised variables:
// - HIDDEN_WALLET_SECURITY_LEVEL   basic | standard | high
// - HIDDEN_WALLET_NETWORK          mainnet-beta | devnet | testnet
// - HIDDEN_WALLET_RPC_URL
// - HIDDEN_WALLET_RELAY_NODES      comma-separated URLs
// - HIDDEN_WALLET_MASTER_KEY
// - HIDDEN_WALLET_MAX_RETRIES
// - HIDDEN_WALLET_COMMITMENT       processed | confirmed | finalized

use crate::ledger::Commitment;
use crate::level::SecurityLevel;
use crate::relay::{default_relay_nodes, ProxyNode, DEFAULT_MAX_RETRIES};
use crate::{HiddenWalletError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Network {
    #[default]
    #[serde(rename = "mainnet-beta")]
    MainnetBeta,
    #[serde(rename = "devnet")]
    Devnet,
    #[serde(rename = "testnet")]
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "mainnet-beta",
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
        }
    }

    /// Public RPC endpoint for the network
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = HiddenWalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet-beta" | "mainnet" => Ok(Network::MainnetBeta),
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(HiddenWalletError::InvalidConfig(format!(
                "unknown network '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub security_level: SecurityLevel,
    pub network: Network,
    /// Overrides the network's public endpoint
    pub rpc_url: Option<String>,
    /// Relay endpoints; empty means the default node set
    pub relay_nodes: Vec<String>,
    /// Master key for the key-protection service; random per process if unset
    pub master_key: Option<String>,
    pub max_retries: u32,
    pub commitment: Commitment,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            security_level: SecurityLevel::default(),
            network: Network::default(),
            rpc_url: None,
            relay_nodes: Vec::new(),
            master_key: None,
            max_retries: DEFAULT_MAX_RETRIES,
            commitment: Commitment::default(),
        }
    }
}

impl WalletConfig {
    /// Defaults overlaid with `HIDDEN_WALLET_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overlay values found through `lookup`; blank values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get("HIDDEN_WALLET_SECURITY_LEVEL") {
            self.security_level = value
                .parse()
                .map_err(|e| HiddenWalletError::InvalidConfig(format!("{}", e)))?;
        }
        if let Some(value) = get("HIDDEN_WALLET_NETWORK") {
            self.network = value.parse()?;
        }
        if let Some(value) = get("HIDDEN_WALLET_RPC_URL") {
            self.rpc_url = Some(value);
        }
        if let Some(value) = get("HIDDEN_WALLET_RELAY_NODES") {
            self.relay_nodes = value
                .split(',')
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect();
        }
        if let Some(value) = get("HIDDEN_WALLET_MASTER_KEY") {
            self.master_key = Some(value);
        }
        if let Some(value) = get("HIDDEN_WALLET_MAX_RETRIES") {
            self.max_retries = value.parse().map_err(|_| {
                HiddenWalletError::InvalidConfig(format!("invalid max retries '{}'", value))
            })?;
        }
        if let Some(value) = get("HIDDEN_WALLET_COMMITMENT") {
            self.commitment = value
                .parse()
                .map_err(|e| HiddenWalletError::InvalidConfig(format!("{}", e)))?;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let urls = self.rpc_url.iter().chain(self.relay_nodes.iter());
        for url in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(HiddenWalletError::InvalidConfig(format!(
                    "'{}' is not an http(s) URL",
                    url
                )));
            }
        }
        if matches!(&self.master_key, Some(key) if key.is_empty()) {
            return Err(HiddenWalletError::InvalidConfig(
                "master key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Endpoint used for direct (non-relayed) calls
    pub fn rpc_endpoint(&self) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.network.default_endpoint().to_string())
    }

    /// Relay node set: the configured URLs, or the default nodes
    pub fn relay_nodes(&self) -> Vec<ProxyNode> {
        if self.relay_nodes.is_empty() {
            default_relay_nodes()
        } else {
            self.relay_nodes.iter().map(ProxyNode::new).collect()
        }
    }
}
