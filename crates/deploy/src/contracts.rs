//! Contract bindings, administrative messages and the contract factory.
//!
//! The engine never inspects contract behavior. It only needs call payloads
//! for a handful of entry points and creation code for the messenger wrapper.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use alloy_core::{
    json_abi::JsonAbi,
    primitives::{Address, Bytes, U256},
    sol_types::{SolCall, SolValue},
};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    chain::{ChainId, L2Family},
    error::DeployError,
    params::DeploymentParameters,
};

alloy_core::sol! {
    interface IL1Bridge {
        function setCrossDomainMessengerWrapper(uint256 chainId, address crossDomainMessengerWrapper);
        function sendToL2(
            uint256 chainId,
            address recipient,
            uint256 amount,
            uint256 amountOutMin,
            uint256 deadline,
            address relayer,
            uint256 relayerFee
        );
    }

    interface IL2BridgeAdmin {
        function setL1BridgeCaller(address l1BridgeCaller);
        function addActiveChainIds(uint256[] chainIds);
        function setAmmWrapper(address ammWrapper);
    }

    interface IMintableERC20 {
        function mint(address account, uint256 amount);
        function approve(address spender, uint256 amount) returns (bool);
    }

    interface IFxMessengerProxy {
        function setFxRootTunnel(address fxRootTunnel);
    }

    interface IMessengerWrapper {
        function sendCrossDomainMessage(bytes message);
    }

    interface IArbitrumInbox {
        function createRetryableTicket(
            address destAddr,
            uint256 l2CallValue,
            uint256 maxSubmissionCost,
            address excessFeeRefundAddress,
            address callValueRefundAddress,
            uint256 maxGas,
            uint256 gasPriceBid,
            bytes data
        ) returns (uint256);
    }

    interface IArbitrumTokenBridge {
        function depositAsERC20(
            address erc20,
            address destination,
            uint256 amount,
            uint256 maxSubmissionCost,
            uint256 maxGas,
            uint256 gasPriceBid,
            bytes callHookData
        ) returns (uint256);
    }

    interface IOptimismMessenger {
        function sendMessage(address target, bytes message, uint32 gasLimit);
    }

    interface IOptimismTokenBridge {
        function depositERC20To(
            address l1Token,
            address l2Token,
            address to,
            uint256 amount,
            uint32 l2Gas,
            bytes data
        );
    }

    interface IAmb {
        function requireToPassMessage(address target, bytes data, uint256 gas) returns (bytes32);
    }

    interface IOmnibridge {
        function relayTokens(address token, address receiver, uint256 value);
    }

    interface IRootChainManager {
        function depositFor(address user, address rootToken, bytes depositData);
    }

    interface IUniswapRouter {
        function addLiquidity(
            address tokenA,
            address tokenB,
            uint256 amountADesired,
            uint256 amountBDesired,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) returns (uint256 amountA, uint256 amountB, uint256 liquidity);
    }
}

/// Administrative call delivered to the L2 bridge through the canonical messenger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminMessage {
    SetL1BridgeCaller(Address),
    AddActiveChainIds(Vec<ChainId>),
    SetAmmWrapper(Address),
}

impl AdminMessage {
    /// Name of the L2 bridge entry point this message calls.
    pub const fn entry_point(&self) -> &'static str {
        match self {
            Self::SetL1BridgeCaller(_) => "setL1BridgeCaller",
            Self::AddActiveChainIds(_) => "addActiveChainIds",
            Self::SetAmmWrapper(_) => "setAmmWrapper",
        }
    }

    /// ABI-encoded call payload.
    pub fn encode(&self) -> Bytes {
        let data = match self {
            Self::SetL1BridgeCaller(caller) => IL2BridgeAdmin::setL1BridgeCallerCall {
                l1BridgeCaller: *caller,
            }
            .abi_encode(),
            Self::AddActiveChainIds(ids) => IL2BridgeAdmin::addActiveChainIdsCall {
                chainIds: ids.iter().map(ChainId::as_u256).collect(),
            }
            .abi_encode(),
            Self::SetAmmWrapper(wrapper) => IL2BridgeAdmin::setAmmWrapperCall {
                ammWrapper: *wrapper,
            }
            .abi_encode(),
        };
        data.into()
    }
}

/// A contract address together with the calldata to send to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
}

impl ContractCall {
    pub fn new(to: Address, call: impl SolCall) -> Self {
        Self {
            to,
            data: call.abi_encode().into(),
        }
    }
}

/// Addresses and limits needed to route a relay through a family's L1 messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayRoute {
    pub family: L2Family,
    /// Canonical L1 messenger (inbox, cross-domain messenger or AMB).
    pub l1_messenger: Address,
    /// Messenger wrapper deployed for this L2.
    pub wrapper: Address,
    /// Destination contract on L2.
    pub l2_target: Address,
    /// Sender, used as the refund address for Arbitrum tickets.
    pub sender: Address,
    pub gas_limit: u64,
}

impl RelayRoute {
    /// The L1 call that enqueues `message` for delivery to the L2 target.
    pub fn call(&self, message: &AdminMessage) -> Result<ContractCall, DeployError> {
        let payload = message.encode();
        let call = match self.family {
            L2Family::Arbitrum => ContractCall::new(
                self.l1_messenger,
                IArbitrumInbox::createRetryableTicketCall {
                    destAddr: self.l2_target,
                    l2CallValue: U256::ZERO,
                    maxSubmissionCost: U256::ZERO,
                    excessFeeRefundAddress: self.sender,
                    callValueRefundAddress: Address::ZERO,
                    maxGas: U256::from(self.gas_limit),
                    gasPriceBid: U256::ZERO,
                    data: payload,
                },
            ),
            L2Family::Optimism => ContractCall::new(
                self.l1_messenger,
                IOptimismMessenger::sendMessageCall {
                    target: self.l2_target,
                    message: payload,
                    gasLimit: gas_u32(self.gas_limit, "Optimism relay")?,
                },
            ),
            L2Family::XDai => ContractCall::new(
                self.l1_messenger,
                IAmb::requireToPassMessageCall {
                    target: self.l2_target,
                    data: payload,
                    gas: U256::from(self.gas_limit),
                },
            ),
            // The Fx tunnel delivers to its configured child, so the wrapper is the entry point.
            L2Family::Polygon => ContractCall::new(
                self.wrapper,
                IMessengerWrapper::sendCrossDomainMessageCall { message: payload },
            ),
        };
        Ok(call)
    }
}

/// Inputs of a family-specific canonical bridge deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalDeposit {
    pub family: L2Family,
    /// Canonical token bridge on L1 (root chain manager on Polygon).
    pub token_bridge: Address,
    pub l1_token: Address,
    pub l2_token: Address,
    pub recipient: Address,
    pub amount: U256,
    pub gas_limit: u64,
}

impl CanonicalDeposit {
    pub fn call(&self) -> Result<ContractCall, DeployError> {
        let call_data = match self.family {
            L2Family::Arbitrum => IArbitrumTokenBridge::depositAsERC20Call {
                erc20: self.l1_token,
                destination: self.recipient,
                amount: self.amount,
                maxSubmissionCost: U256::ZERO,
                maxGas: U256::from(self.gas_limit),
                gasPriceBid: U256::ZERO,
                callHookData: Bytes::new(),
            }
            .abi_encode(),
            L2Family::Optimism => IOptimismTokenBridge::depositERC20ToCall {
                l1Token: self.l1_token,
                l2Token: self.l2_token,
                to: self.recipient,
                amount: self.amount,
                l2Gas: gas_u32(self.gas_limit, "Optimism deposit")?,
                data: Bytes::new(),
            }
            .abi_encode(),
            L2Family::XDai => IOmnibridge::relayTokensCall {
                token: self.l1_token,
                receiver: self.recipient,
                value: self.amount,
            }
            .abi_encode(),
            L2Family::Polygon => IRootChainManager::depositForCall {
                user: self.recipient,
                rootToken: self.l1_token,
                depositData: self.amount.abi_encode().into(),
            }
            .abi_encode(),
        };

        Ok(ContractCall {
            to: self.token_bridge,
            data: call_data.into(),
        })
    }
}

/// Narrow a gas limit to the 32-bit field some entry points take.
fn gas_u32(gas_limit: u64, what: &str) -> Result<u32, DeployError> {
    u32::try_from(gas_limit).map_err(|_| {
        DeployError::invalid(format!(
            "{what} gas limit {gas_limit} does not fit in 32 bits"
        ))
    })
}

/// Contracts the engine deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    MessengerWrapper(L2Family),
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessengerWrapper(family) => write!(f, "{family} messenger wrapper"),
        }
    }
}

impl ContractKind {
    /// Compiled artifact name.
    pub const fn artifact_name(&self) -> &'static str {
        match self {
            Self::MessengerWrapper(L2Family::Arbitrum) => "ArbitrumMessengerWrapper",
            Self::MessengerWrapper(L2Family::Optimism) => "OptimismMessengerWrapper",
            Self::MessengerWrapper(L2Family::XDai) => "XDaiMessengerWrapper",
            Self::MessengerWrapper(L2Family::Polygon) => "PolygonMessengerWrapper",
        }
    }
}

/// Produces contract-creation payloads.
pub trait ContractFactory {
    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    fn deploy_data(&self, kind: ContractKind, params: &DeploymentParameters) -> Result<Bytes>;
}

impl<T: ContractFactory + ?Sized> ContractFactory for &T {
    fn deploy_data(&self, kind: ContractKind, params: &DeploymentParameters) -> Result<Bytes> {
        (**self).deploy_data(kind, params)
    }
}

#[derive(Deserialize)]
struct ArtifactFile {
    abi: JsonAbi,
    bytecode: ArtifactBytecode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    Hex(Bytes),
    Object { object: Bytes },
}

impl ArtifactBytecode {
    fn into_bytes(self) -> Bytes {
        match self {
            Self::Hex(code) | Self::Object { object: code } => code,
        }
    }
}

/// A compiled contract artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Load `<dir>/<name>.json` (hardhat or forge layout).
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(format!("{name}.json"));
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact: {}", path.display()))?;
        let file: ArtifactFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact: {}", path.display()))?;

        let bytecode = file.bytecode.into_bytes();
        if bytecode.is_empty() {
            anyhow::bail!("Artifact {} has no creation bytecode", path.display());
        }

        Ok(Self {
            abi: file.abi,
            bytecode,
        })
    }

    /// Creation bytecode with `params` coerced to the constructor inputs and appended.
    pub fn deploy_data(&self, params: &DeploymentParameters) -> Result<Bytes> {
        let inputs = self
            .abi
            .constructor
            .as_ref()
            .map(|c| c.inputs.as_slice())
            .unwrap_or_default();
        let args = params.abi_encode_for(inputs)?;

        let mut data = self.bytecode.to_vec();
        data.extend_from_slice(&args);
        Ok(data.into())
    }
}

/// [`ContractFactory`] backed by a directory of compiled artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactFactory {
    dir: PathBuf,
}

impl ArtifactFactory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ContractFactory for ArtifactFactory {
    fn deploy_data(&self, kind: ContractKind, params: &DeploymentParameters) -> Result<Bytes> {
        let artifact = Artifact::load(&self.dir, kind.artifact_name())?;
        artifact
            .deploy_data(params)
            .with_context(|| format!("Failed to encode constructor arguments for the {kind}"))
    }
}
