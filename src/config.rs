use std::path::PathBuf;
use std::time::Duration;

use ethers::types::Address;
use eyre::ContextCompat;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Args;
use crate::serde_utils;

pub const SEPOLIA_NETWORK_NAME: &str = "ethereum-sepolia";
pub const SEPOLIA_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
pub const SEPOLIA_EXPLORER_URL: &str = "https://sepolia.etherscan.io";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub token: TokenConfig,
    pub paths: PathsConfig,
    pub confirmation: ConfirmationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: Url,
    pub chain_id: Option<u64>,
    pub explorer_url: Option<Url>,
}

/// The externally deployed token handed to the vault constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub role: String,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub build_dir: PathBuf,
    pub deployments_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub confirmations: usize,
    pub timeout_secs: u64,
    pub poll_interval_millis: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: SEPOLIA_NETWORK_NAME.to_string(),
            rpc_url: Url::parse(SEPOLIA_RPC_URL).expect("valid default url"),
            chain_id: Some(SEPOLIA_CHAIN_ID),
            explorer_url: Some(
                Url::parse(SEPOLIA_EXPLORER_URL).expect("valid default url"),
            ),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            role: "USDC".to_string(),
            address: None,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from("build"),
            deployments_dir: PathBuf::from("deployments"),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            confirmations: 1,
            timeout_secs: 300,
            poll_interval_millis: 2_000,
        }
    }
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }
}

impl Config {
    /// Loads the config file named on the command line (if any) and applies
    /// the command line overrides on top of it.
    pub async fn load(args: &Args) -> eyre::Result<Self> {
        let config = match args.config.as_ref() {
            Some(path) => serde_utils::read_deserialize(path).await?,
            None => Self::default(),
        };

        config.with_overrides(args)
    }

    fn with_overrides(mut self, args: &Args) -> eyre::Result<Self> {
        if let Some(rpc_url) = args.rpc_url.as_ref() {
            self.network.rpc_url = rpc_url.clone();
        }

        if let Some(address) = args.token_address {
            self.token.address = Some(address);
        }

        if let Some(build_dir) = args.build_dir.as_ref() {
            self.paths.build_dir = build_dir.clone();
        }

        if let Some(deployments_dir) = args.deployments_dir.as_ref() {
            self.paths.deployments_dir = deployments_dir.clone();
        }

        self.token_address()?;

        Ok(self)
    }

    pub fn token_address(&self) -> eyre::Result<Address> {
        self.token.address.with_context(|| {
            format!(
                "Missing {} token address, pass --token-address or set token.address in the config",
                self.token.role
            )
        })
    }

    pub fn record_path(&self) -> PathBuf {
        self.paths
            .deployments_dir
            .join(format!("{}.json", self.network.name))
    }
}
