//! Configuration management for the ledger node

use crate::crypto::{DEFAULT_KEY_BITS, MIN_KEY_BITS};
use crate::error::{ChainError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_port: default_api_port(),
            bootstrap_peers: Vec::new(),
            peer_timeout_secs: default_peer_timeout_secs(),
        }
    }
}

impl NetworkConfig {
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    /// Resolve `bind_address` and `api_port` to a socket address. Accepts
    /// IPv4 and IPv6 literals as well as host names.
    pub async fn bind_socket_addr(&self) -> Result<SocketAddr> {
        tokio::net::lookup_host((self.bind_address.as_str(), self.api_port))
            .await?
            .next()
            .ok_or_else(|| {
                ChainError::Config(format!(
                    "network.bind_address {} did not resolve",
                    self.bind_address
                ))
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    /// Empty means a random node identifier is generated at startup.
    #[serde(default)]
    pub beneficiary_address: String,
    #[serde(default = "default_reward")]
    pub reward: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            beneficiary_address: String::new(),
            reward: default_reward(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            key_bits: default_key_bits(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Balances credited before any block, keyed by address.
    #[serde(default)]
    pub genesis_allocations: HashMap<String, u64>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_peer_timeout_secs() -> u64 {
    5
}

fn default_reward() -> u64 {
    1
}

fn default_key_bits() -> usize {
    DEFAULT_KEY_BITS
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.network.api_port == 0 {
            return Err(ChainError::Config(
                "network.api_port must be non-zero".to_string(),
            ));
        }
        if self.network.peer_timeout_secs == 0 {
            return Err(ChainError::Config(
                "network.peer_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.wallet.key_bits < MIN_KEY_BITS {
            return Err(ChainError::Config(format!(
                "wallet.key_bits must be at least {}, got {}",
                MIN_KEY_BITS, self.wallet.key_bits
            )));
        }
        Ok(())
    }
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config: Config = match fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(e) => return Err(e.into()),
    };

    config.validate()?;
    Ok(config)
}
