// Configuration management for the hwallet CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/hidden-wallet/config.json
// - Linux: ~/.config/hidden-wallet/config.json
// - Windows: %APPDATA%\hidden-wallet\config.json
//
// HIDDEN_WALLET_* environment variables override the file at run time and
// are never written back.

use anyhow::{Context, Result};
use hiddenwallet_core::{Commitment, Network, SecurityLevel, WalletConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "hidden-wallet";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub wallet: WalletConfig,

    /// Keypair file of the signing identity
    pub keypair_path: Option<String>,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(APP_DIR);

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the data directory path (cross-platform)
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to determine data directory")?
            .join(APP_DIR);

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(data_dir)
    }

    /// Load the config from the platform location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_dir()?.join("config.json"))
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            Config::default()
        };
        config.path = Some(path.to_path_buf());
        if !path.exists() {
            config.save()?;
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = self.path.as_ref().context("Config has no file location")?;
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Wallet settings with environment overrides applied
    pub fn effective_wallet(&self) -> Result<WalletConfig> {
        let mut wallet = self.wallet.clone();
        wallet.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(wallet)
    }

    pub fn add_relay_node(&mut self, url: String) -> Result<bool> {
        if self.wallet.relay_nodes.contains(&url) {
            return Ok(false);
        }
        self.wallet.relay_nodes.push(url);
        if let Err(e) = self.wallet.validate() {
            self.wallet.relay_nodes.pop();
            return Err(e.into());
        }
        self.save()?;
        Ok(true)
    }

    pub fn remove_relay_node(&mut self, url: &str) -> Result<usize> {
        let before = self.wallet.relay_nodes.len();
        self.wallet.relay_nodes.retain(|n| n != url);
        self.save()?;
        Ok(before - self.wallet.relay_nodes.len())
    }

    /// Set a config value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |value: &str| {
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        };
        match key {
            "security_level" => {
                self.wallet.security_level = value.parse::<SecurityLevel>()?;
            }
            "network" => {
                self.wallet.network = value.parse::<Network>()?;
            }
            "rpc_url" => {
                self.wallet.rpc_url = optional(value);
            }
            "master_key" => {
                self.wallet.master_key = optional(value);
            }
            "max_retries" => {
                self.wallet.max_retries = value.parse().context("Invalid number")?;
            }
            "commitment" => {
                self.wallet.commitment = value.parse::<Commitment>()?;
            }
            "keypair_path" => {
                self.keypair_path = optional(value);
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        self.wallet.validate()?;
        self.save()?;
        Ok(())
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "security_level" => Some(self.wallet.security_level.to_string()),
            "network" => Some(self.wallet.network.to_string()),
            "rpc_url" => Some(self.wallet.rpc_endpoint()),
            "master_key" => self.wallet.master_key.as_ref().map(|_| "(set)".to_string()),
            "max_retries" => Some(self.wallet.max_retries.to_string()),
            "commitment" => Some(self.wallet.commitment.to_string()),
            "keypair_path" => self.keypair_path.clone(),
            _ => None,
        }
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            ("security_level".to_string(), self.wallet.security_level.to_string()),
            ("network".to_string(), self.wallet.network.to_string()),
            ("rpc_url".to_string(), self.wallet.rpc_endpoint()),
            (
                "master_key".to_string(),
                if self.wallet.master_key.is_some() { "(set)" } else { "(random per run)" }.to_string(),
            ),
            ("max_retries".to_string(), self.wallet.max_retries.to_string()),
            ("commitment".to_string(), self.wallet.commitment.to_string()),
            (
                "keypair_path".to_string(),
                self.keypair_path.clone().unwrap_or_else(|| "(none)".to_string()),
            ),
            ("relay_nodes".to_string(), self.wallet.relay_nodes.len().to_string()),
        ]
    }
}
