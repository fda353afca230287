//! Persisted setup progress.
//!
//! The state file uses the same camelCase keys as the deploy scripts that
//! preceded this tool, so existing config files can be pointed at directly.

use std::{
    collections::BTreeSet,
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use alloy_core::primitives::{Address, U256};
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{chain::ChainId, error::DeployError};

/// Named checkpoints of the setup sequence, in execution order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Milestone {
    DeployWrapper,
    SetFxRootTunnel,
    BindWrapper,
    RelayL1BridgeCaller,
    RelayActiveChainIds,
    RelayAmmWrapper,
    CanonicalDeposit,
    SendToL2,
    Complete,
    L2ActiveChainIds,
    L2MintHTokens,
    L2AddLiquidity,
}

impl Milestone {
    /// Human readable step name used in logs and errors.
    pub const fn description(self) -> &'static str {
        match self {
            Self::DeployWrapper => "deploy messenger wrapper",
            Self::SetFxRootTunnel => "set fx root tunnel",
            Self::BindWrapper => "bind wrapper to L1 bridge",
            Self::RelayL1BridgeCaller => "relay L1 bridge caller",
            Self::RelayActiveChainIds => "relay active chain ids",
            Self::RelayAmmWrapper => "relay AMM wrapper",
            Self::CanonicalDeposit => "canonical bridge deposit",
            Self::SendToL2 => "send liquidity to L2",
            Self::Complete => "complete",
            Self::L2ActiveChainIds => "add active chain ids on L2",
            Self::L2MintHTokens => "mint L2 hop tokens",
            Self::L2AddLiquidity => "add AMM liquidity on L2",
        }
    }
}

/// Accumulated inputs and outputs of the setup sequence.
///
/// Every field is optional so a value can double as a partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1_chain_id: Option<ChainId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_chain_id: Option<ChainId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1_token_bridge_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1_messenger_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1_canonical_token_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1_bridge_address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_canonical_token_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_bridge_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_token_bridge_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_messenger_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_messenger_proxy_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_amm_wrapper_address: Option<Address>,
    #[serde(
        default,
        rename = "l2HopBridgeTokenAddress",
        skip_serializing_if = "Option::is_none"
    )]
    pub l2_h_token_address: Option<Address>,
    /// Router the L2 setup provides AMM liquidity through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_uniswap_router_address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l1_messenger_wrapper_address: Option<Address>,
    /// Replaces the registered Fx root when deploying a Polygon wrapper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx_root_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonder_address: Option<Address>,

    #[serde(default, with = "decimal", skip_serializing_if = "Option::is_none")]
    pub liquidity_provider_send_amount: Option<U256>,
    #[serde(default, with = "decimal", skip_serializing_if = "Option::is_none")]
    pub liquidity_provider_amm_amount: Option<U256>,

    /// Fingerprint of the inputs the completed milestones were run with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub completed: BTreeSet<Milestone>,
}

macro_rules! merge_fields {
    ($self:ident, $patch:ident, $($field:ident),+ $(,)?) => {
        $(
            if $patch.$field.is_some() {
                $self.$field = $patch.$field.clone();
            }
        )+
    };
}

impl SetupState {
    /// Apply `patch` on top of this state: set fields overwrite, markers union.
    pub fn merge(&mut self, patch: &SetupState) {
        merge_fields!(
            self,
            patch,
            l1_chain_id,
            l2_chain_id,
            l1_token_bridge_address,
            l1_messenger_address,
            l1_canonical_token_address,
            l1_bridge_address,
            l2_canonical_token_address,
            l2_bridge_address,
            l2_token_bridge_address,
            l2_messenger_address,
            l2_messenger_proxy_address,
            l2_amm_wrapper_address,
            l2_h_token_address,
            l2_uniswap_router_address,
            l1_messenger_wrapper_address,
            fx_root_address,
            bonder_address,
            liquidity_provider_send_amount,
            liquidity_provider_amm_amount,
            fingerprint,
        );
        self.completed.extend(patch.completed.iter().copied());
    }

    pub fn is_completed(&self, milestone: Milestone) -> bool {
        self.completed.contains(&milestone)
    }

    /// A patch that only records `milestone` as done.
    pub fn marker(milestone: Milestone) -> Self {
        Self {
            completed: BTreeSet::from([milestone]),
            ..Self::default()
        }
    }

    /// True if no input or progress has been recorded yet.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Unwrap a required state field, naming its persisted key on failure.
pub fn require<T>(value: Option<T>, key: &str) -> Result<T, DeployError> {
    value.ok_or_else(|| DeployError::invalid(format!("{key} is not set")))
}

/// Decimal string (de)serialization for optional token amounts.
mod decimal {
    use alloy_core::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Number(n)) => Ok(Some(U256::from(n))),
            Some(Repr::Text(s)) => s
                .trim()
                .parse::<U256>()
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid amount '{s}': {e}"))),
        }
    }
}

/// Persistence for [`SetupState`].
pub trait ConfigStore: Send + Sync {
    /// Current state. A store that was never written returns an empty state.
    fn read(&self) -> Result<SetupState>;

    /// Merge `patch` into the stored state and return the result.
    fn write(&self, patch: &SetupState) -> Result<SetupState>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for &T {
    fn read(&self) -> Result<SetupState> {
        (**self).read()
    }

    fn write(&self, patch: &SetupState) -> Result<SetupState> {
        (**self).write(patch)
    }
}

/// JSON file store.
///
/// Writes hold an exclusive lock on `<file>.lock` for the read-merge-write
/// cycle and replace the file atomically.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sidecar(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let lock_path = self.sidecar(".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", lock_path.display()))?;
        Ok(file)
    }

    fn load(&self) -> Result<SetupState> {
        if !self.path.exists() {
            return Ok(SetupState::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read setup state from {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(SetupState::default());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse setup state in {}", self.path.display()))
    }
}

impl ConfigStore for JsonFileStore {
    fn read(&self) -> Result<SetupState> {
        self.load()
    }

    fn write(&self, patch: &SetupState) -> Result<SetupState> {
        let lock = self.lock()?;

        let mut state = self.load()?;
        state.merge(patch);

        let json = serde_json::to_string_pretty(&state).context("Failed to serialize setup state")?;
        let tmp = self.sidecar(".tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write setup state to {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        FileExt::unlock(&lock).context("Failed to release setup state lock")?;
        tracing::debug!(path = %self.path.display(), "Setup state saved");
        Ok(state)
    }
}

/// In-memory store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<SetupState>,
    writes: Mutex<Vec<SetupState>>,
}

impl MemoryStore {
    pub fn new(state: SetupState) -> Self {
        Self {
            state: Mutex::new(state),
            writes: Mutex::default(),
        }
    }

    /// Every patch written so far, oldest first.
    pub fn writes(&self) -> Vec<SetupState> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self) -> Result<SetupState> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("Setup state lock poisoned"))?;
        Ok(state.clone())
    }

    fn write(&self, patch: &SetupState) -> Result<SetupState> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("Setup state lock poisoned"))?;
        state.merge(patch);
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(patch.clone());
        }
        Ok(state.clone())
    }
}
