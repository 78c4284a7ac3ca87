//! Catalog configuration
//!
//! ## Configuration Sources (in precedence order)
//!
//! 1. Values set in code on [`CatalogConfig`]
//! 2. An explicit file passed to [`CatalogConfig::load_from_path`]
//! 3. `~/.config/app-catalog/config.yaml` via [`CatalogConfig::load`]
//! 4. Built-in defaults
//!
//! ```yaml
//! topic: tm_apps
//! service: ls_apps
//! network: testnet
//! accept_delayed_broadcast: false
//! hosts:
//!   - https://overlay.example.com
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Protocol the catalog's PushDrop keys are derived under
pub const PROTOCOL_NAME: &str = "metanet apps";

/// Security level for [`PROTOCOL_NAME`]
pub const PROTOCOL_SECURITY_LEVEL: u8 = 1;

pub const DEFAULT_KEY_ID: &str = "1";
pub const DEFAULT_TOPIC: &str = "tm_apps";
pub const DEFAULT_SERVICE: &str = "ls_apps";
pub const DEFAULT_WALLET_URL: &str = "http://localhost:3321";

const MAINNET_HOSTS: &[&str] = &[
    "https://overlay-us-1.bsvb.tech",
    "https://overlay-eu-1.bsvb.tech",
    "https://overlay-ap-1.bsvb.tech",
    "https://users.bapp.dev",
];
const TESTNET_HOSTS: &[&str] = &["https://testnet-users.bapp.dev"];
const LOCAL_HOSTS: &[&str] = &["http://localhost:8080"];

/// Overlay network preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Local,
}

impl Network {
    /// Overlay hosts used when none are configured
    pub fn default_hosts(self) -> Vec<String> {
        let hosts = match self {
            Network::Mainnet => MAINNET_HOSTS,
            Network::Testnet => TESTNET_HOSTS,
            Network::Local => LOCAL_HOSTS,
        };
        hosts.iter().map(|h| h.to_string()).collect()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Local => "local",
        })
    }
}

/// Settings for an [`AppCatalog`](crate::AppCatalog)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Key id the PushDrop locking key is derived with
    #[serde(default = "default_key_id")]
    pub key_id: String,

    /// Overlay topic listings are submitted to
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Overlay lookup service queried by `find_apps`
    #[serde(default = "default_service")]
    pub service: String,

    /// Network preset; asked from the wallet on each call when unset
    #[serde(default)]
    pub network: Option<Network>,

    /// Let the wallet return before the transaction is broadcast
    #[serde(default)]
    pub accept_delayed_broadcast: bool,

    /// Overlay hosts; empty means the network preset's defaults
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Base URL of the JSON wallet used when no wallet is supplied
    #[serde(default = "default_wallet_url")]
    pub wallet_url: String,

    /// Originator sent to the wallet with each request
    #[serde(default)]
    pub originator: Option<String>,

    /// Timeout for HTTP collaborators in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            key_id: default_key_id(),
            topic: default_topic(),
            service: default_service(),
            network: None,
            accept_delayed_broadcast: false,
            hosts: Vec::new(),
            wallet_url: default_wallet_url(),
            originator: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_key_id() -> String {
    DEFAULT_KEY_ID.to_string()
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

fn default_wallet_url() -> String {
    DEFAULT_WALLET_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl CatalogConfig {
    /// Load from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::default_config_path() {
            Some(path) => Self::load_from_path(&path),
            None => {
                tracing::debug!("No config directory available, using catalog defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file, falling back to defaults when it does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No catalog config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog config: {}", path.display()))?;

        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse catalog config: {}", path.display()))?;

        tracing::debug!("Loaded catalog config from {}", path.display());
        Ok(config)
    }

    /// Parse from YAML (JSON is accepted too)
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("Invalid catalog config")
    }

    /// Default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "app-catalog")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("app-catalog")))
            .map(|dir| dir.join("config.yaml"))
    }

    /// Check the configuration for values the overlay will reject
    pub fn validate(&self) -> Result<()> {
        if self.key_id.trim().is_empty() {
            anyhow::bail!("key_id must not be empty");
        }

        if !self.topic.starts_with("tm_") {
            anyhow::bail!(
                "Topic '{}' must start with 'tm_' (topic manager prefix)",
                self.topic
            );
        }

        if !self.service.starts_with("ls_") {
            anyhow::bail!(
                "Service '{}' must start with 'ls_' (lookup service prefix)",
                self.service
            );
        }

        for host in &self.hosts {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                anyhow::bail!("Overlay host '{}' must start with http:// or https://", host);
            }
        }

        if self.timeout_seconds == 0 {
            anyhow::bail!("timeout_seconds must be greater than zero");
        }

        Ok(())
    }

    /// Hosts to contact on `network`
    pub fn hosts_for(&self, network: Network) -> Vec<String> {
        if self.hosts.is_empty() {
            network.default_hosts()
        } else {
            self.hosts.clone()
        }
    }
}
