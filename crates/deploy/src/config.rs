use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    address_book::AddressBook,
    chain::{ChainId, ChainRegistry, L2Family},
    client::RpcClientConfig,
    error::DeployError,
    networks::NetworkCatalog,
    params::MessengerDefaults,
};

/// The default name for the bridgewire configuration file.
pub const CONFIG_FILENAME: &str = "Bridgewire.toml";

/// The default setup state file.
pub const DEFAULT_STATE_FILENAME: &str = "bridgewire-state.json";

/// Timing and gas settings of the setup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum time to wait for one confirmation.
    pub confirmation_timeout_secs: u64,
    /// Pause after each confirmed transaction.
    pub step_delay_secs: u64,
    /// Gas limit of the `setFxRootTunnel` call on Polygon.
    pub polygon_tunnel_gas_limit: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: 300,
            step_delay_secs: 5,
            polygon_tunnel_gas_limit: 100_000,
        }
    }
}

/// Immutable protocol tables, built once at start and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Chain sets per family. Disjointness is checked while loading.
    pub chains: ChainRegistry,
    pub address_book: AddressBook,
    pub messenger: MessengerDefaults,
    /// L2 networks and tokens layered on top of the built-in catalog.
    pub networks: NetworkCatalog,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            chains: ChainRegistry::default(),
            address_book: AddressBook::standard(),
            messenger: MessengerDefaults::default(),
            networks: NetworkCatalog::empty(),
        }
    }
}

impl ProtocolConfig {
    /// The built-in network catalog with configured entries applied.
    pub fn catalog(&self) -> NetworkCatalog {
        let mut catalog = NetworkCatalog::standard();
        catalog.extend(self.networks.clone());
        catalog
    }
}

/// Top-level configuration of the bridgewire tool.
///
/// Every section has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Where setup progress is persisted.
    pub state_path: PathBuf,
    /// Directory of compiled contract artifacts.
    pub artifacts_dir: PathBuf,

    /// L1 client. Required to run the setup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l1: Option<RpcClientConfig>,
    /// L2 client. Only Polygon setups use it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l2: Option<RpcClientConfig>,

    pub orchestrator: OrchestratorConfig,
    pub protocol: ProtocolConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_FILENAME),
            artifacts_dir: PathBuf::from("artifacts"),
            l1: None,
            l2: None,
            orchestrator: OrchestratorConfig::default(),
            protocol: ProtocolConfig::default(),
        }
    }
}

impl DeployConfig {
    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize bridgewire config to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Load the configuration from a TOML file, or from `Bridgewire.toml` inside a directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Configuration file or directory not found: {}", path.display());
        }

        let config_path = if path.is_dir() {
            path.join(CONFIG_FILENAME)
        } else {
            path.to_path_buf()
        };

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
        let config: Self =
            toml::from_str(&content).context("Failed to parse config file as TOML")?;
        tracing::info!(path = %config_path.display(), "Configuration loaded");
        Ok(config)
    }

    /// The L1 client settings, failing if none are configured.
    pub fn l1_client(&self) -> Result<&RpcClientConfig> {
        self.l1
            .as_ref()
            .context("No [l1] client configured, cannot send transactions")
    }

    /// The L2 client settings, failing if none are configured.
    pub fn require_l2_client(&self) -> Result<&RpcClientConfig, DeployError> {
        self.l2.as_ref().ok_or_else(|| {
            DeployError::invalid("no [l2] client configured, cannot send transactions on L2")
        })
    }

    /// The L2 client the L1 setup of `l2_chain_id` needs, if any.
    ///
    /// Only Polygon sends on L2 during the L1 setup. The node behind `[l2]`
    /// must hold the deployer account, so a missing section fails here,
    /// before anything is sent on L1.
    pub fn l2_client(
        &self,
        l1_chain_id: ChainId,
        l2_chain_id: ChainId,
    ) -> Result<Option<&RpcClientConfig>, DeployError> {
        if self.protocol.chains.l2_family(l2_chain_id)? != L2Family::Polygon {
            return Ok(None);
        }

        let polygon = self.protocol.address_book.polygon_for_chain(l1_chain_id)?;
        match &self.l2 {
            Some(l2) => Ok(Some(l2)),
            None => Err(DeployError::invalid(format!(
                "Polygon setup sends setFxRootTunnel on L2 but no [l2] client is configured; \
                 point [l2] at a node for {} that holds the deployer account",
                polygon.rpc_url
            ))),
        }
    }
}
