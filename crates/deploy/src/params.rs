//! Family-specific argument lists for the messenger wrapper constructor and the
//! L2 bridge initializer.
//!
//! Both lists bind positionally to the target contract, so every family has a
//! fixed record type here and the flattening into [`DeploymentParameters`]
//! happens in one place per record.

use std::fmt;

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, Specifier},
    json_abi,
    primitives::{Address, U256},
};
use anyhow::Context;
use derive_more::{Deref, From};
use serde::{Deserialize, Serialize};

use crate::{
    address_book::AddressBook,
    chain::{ChainId, ChainRegistry, L2Family},
    error::DeployError,
};

/// Default gas limits and fees baked into the wrapper and L2 bridge arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerDefaults {
    /// Gas limit forwarded by the Arbitrum and Optimism wrappers.
    pub wrapper_gas_limit: u64,
    /// Gas price bid forwarded with Arbitrum retryable tickets.
    pub wrapper_gas_price: u64,
    /// Call value forwarded with Arbitrum retryable tickets.
    pub wrapper_call_value: u64,
    /// Gas limit of the xDai (AMB) wrapper.
    pub xdai_wrapper_gas_limit: u64,
    /// Outbound gas limit set on Optimism and xDai L2 bridges.
    pub l2_bridge_gas_limit: u64,
    /// Gas limit requested for administrative relays through the L1 messenger.
    pub relay_gas_limit: u64,
}

impl Default for MessengerDefaults {
    fn default() -> Self {
        Self {
            wrapper_gas_limit: 600_000,
            wrapper_gas_price: 0,
            wrapper_call_value: 0,
            xdai_wrapper_gas_limit: 1_000_000,
            l2_bridge_gas_limit: 1_500_000,
            relay_gas_limit: 5_000_000,
        }
    }
}

/// One positional call argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Param {
    Address(Address),
    Uint(U256),
    /// A textual value handed to the contract as-is.
    Text(String),
    ChainIds(Vec<ChainId>),
    Addresses(Vec<Address>),
}

impl Param {
    /// The natural Solidity value of this argument.
    pub fn to_sol_value(&self) -> DynSolValue {
        match self {
            Self::Address(a) => DynSolValue::Address(*a),
            Self::Uint(v) => DynSolValue::Uint(*v, 256),
            Self::Text(s) => DynSolValue::String(s.clone()),
            Self::ChainIds(ids) => DynSolValue::Array(
                ids.iter().map(|id| DynSolValue::Uint(id.as_u256(), 256)).collect(),
            ),
            Self::Addresses(addrs) => {
                DynSolValue::Array(addrs.iter().map(|a| DynSolValue::Address(*a)).collect())
            }
        }
    }

    /// Coerce this argument to a declared Solidity type.
    ///
    /// A textual argument bound to a numeric slot is parsed, the same way a
    /// decimal chain ID string reaches a `uint256` constructor parameter.
    pub fn coerce(&self, ty: &DynSolType) -> anyhow::Result<DynSolValue> {
        let value = ty
            .coerce_str(&self.to_string())
            .with_context(|| format!("cannot pass '{self}' as {ty}"))?;
        Ok(value)
    }
}

impl From<Address> for Param {
    fn from(a: Address) -> Self {
        Self::Address(a)
    }
}

impl From<u64> for Param {
    fn from(v: u64) -> Self {
        Self::Uint(U256::from(v))
    }
}

impl From<ChainId> for Param {
    fn from(id: ChainId) -> Self {
        Self::Uint(id.as_u256())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(a) => write!(f, "{a}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::ChainIds(ids) => write_list(f, ids),
            Self::Addresses(addrs) => write_list(f, addrs),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

/// Ordered argument list for one deployment or call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deref, From)]
pub struct DeploymentParameters(Vec<Param>);

impl DeploymentParameters {
    /// True if `address` appears anywhere in the list, including inside arrays.
    pub fn mentions(&self, address: Address) -> bool {
        self.0.iter().any(|p| match p {
            Param::Address(a) => *a == address,
            Param::Addresses(addrs) => addrs.contains(&address),
            Param::Text(s) => s.eq_ignore_ascii_case(&address.to_string()),
            _ => false,
        })
    }

    /// ABI-encode the arguments using their natural Solidity types.
    pub fn abi_encode(&self) -> Vec<u8> {
        DynSolValue::Tuple(self.0.iter().map(Param::to_sol_value).collect()).abi_encode_params()
    }

    /// ABI-encode the arguments against declared inputs, coercing each one.
    pub fn abi_encode_for(&self, inputs: &[json_abi::Param]) -> anyhow::Result<Vec<u8>> {
        if inputs.len() != self.0.len() {
            anyhow::bail!(
                "expected {} arguments, resolved {}",
                inputs.len(),
                self.0.len()
            );
        }

        let values = inputs
            .iter()
            .zip(&self.0)
            .map(|(input, param)| {
                let ty = input
                    .resolve()
                    .with_context(|| format!("unsupported parameter type {}", input.ty))?;
                param
                    .coerce(&ty)
                    .with_context(|| format!("argument '{}'", input.name))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(DynSolValue::Tuple(values).abi_encode_params())
    }
}

impl fmt::Display for DeploymentParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, &self.0)
    }
}

/// Constructor arguments of a messenger wrapper, one shape per family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapperArgs {
    Arbitrum {
        l1_bridge: Address,
        l2_bridge: Address,
        l1_messenger: Address,
        gas_limit: u64,
        gas_price: u64,
        call_value: u64,
    },
    Optimism {
        l1_bridge: Address,
        l2_bridge: Address,
        l1_messenger: Address,
        gas_limit: u64,
    },
    XDai {
        l1_bridge: Address,
        l2_bridge: Address,
        l1_messenger: Address,
        gas_limit: u64,
        l2_chain_id: ChainId,
        amb_proxy: Address,
    },
    Polygon {
        l1_bridge: Address,
        checkpoint_manager: Address,
        fx_root: Address,
        fx_child_tunnel: Address,
    },
}

impl WrapperArgs {
    pub const fn family(&self) -> L2Family {
        match self {
            Self::Arbitrum { .. } => L2Family::Arbitrum,
            Self::Optimism { .. } => L2Family::Optimism,
            Self::XDai { .. } => L2Family::XDai,
            Self::Polygon { .. } => L2Family::Polygon,
        }
    }

    /// Flatten into the constructor's positional argument list.
    pub fn to_params(&self) -> DeploymentParameters {
        let params: Vec<Param> = match *self {
            Self::Arbitrum {
                l1_bridge,
                l2_bridge,
                l1_messenger,
                gas_limit,
                gas_price,
                call_value,
            } => vec![
                l1_bridge.into(),
                l2_bridge.into(),
                l1_messenger.into(),
                gas_limit.into(),
                gas_price.into(),
                call_value.into(),
            ],
            Self::Optimism {
                l1_bridge,
                l2_bridge,
                l1_messenger,
                gas_limit,
            } => vec![
                l1_bridge.into(),
                l2_bridge.into(),
                l1_messenger.into(),
                gas_limit.into(),
            ],
            Self::XDai {
                l1_bridge,
                l2_bridge,
                l1_messenger,
                gas_limit,
                l2_chain_id,
                amb_proxy,
            } => vec![
                l1_bridge.into(),
                l2_bridge.into(),
                l1_messenger.into(),
                gas_limit.into(),
                Param::Text(l2_chain_id.to_string()),
                amb_proxy.into(),
            ],
            Self::Polygon {
                l1_bridge,
                checkpoint_manager,
                fx_root,
                fx_child_tunnel,
            } => vec![
                l1_bridge.into(),
                checkpoint_manager.into(),
                fx_root.into(),
                fx_child_tunnel.into(),
            ],
        };
        params.into()
    }
}

/// Family-specific fields of the L2 bridge initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L2BridgeExtra {
    Arbitrum,
    Optimism { default_gas_limit: u64 },
    XDai { l1_chain_id: ChainId, default_gas_limit: u64 },
    Polygon,
}

/// Initializer arguments of the L2 bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2BridgeArgs {
    /// The authorized messenger: the raw L2 messenger, or the messenger proxy on Polygon.
    pub messenger: Address,
    pub governance: Address,
    pub h_token: Address,
    pub l1_bridge: Address,
    pub extra: L2BridgeExtra,
    pub active_chain_ids: Vec<ChainId>,
    pub bonders: Vec<Address>,
}

impl L2BridgeArgs {
    /// Fixed prefix, then family extras, then the chain ID and bonder lists.
    pub fn to_params(&self) -> DeploymentParameters {
        let mut params: Vec<Param> = vec![
            self.messenger.into(),
            self.governance.into(),
            self.h_token.into(),
            self.l1_bridge.into(),
        ];

        match self.extra {
            L2BridgeExtra::Arbitrum | L2BridgeExtra::Polygon => {}
            L2BridgeExtra::Optimism { default_gas_limit } => {
                params.push(default_gas_limit.into());
            }
            L2BridgeExtra::XDai {
                l1_chain_id,
                default_gas_limit,
            } => {
                params.push(l1_chain_id.into());
                params.push(default_gas_limit.into());
            }
        }

        params.push(Param::ChainIds(self.active_chain_ids.clone()));
        params.push(Param::Addresses(self.bonders.clone()));
        params.into()
    }
}

/// Inputs of [`ParameterResolver::resolve_wrapper_args`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapperRequest {
    pub l1_chain_id: ChainId,
    pub l2_chain_id: ChainId,
    pub l1_bridge: Address,
    pub l2_bridge: Address,
    /// Canonical L1 messenger. Unused on Polygon.
    pub l1_messenger: Option<Address>,
    /// Fx child tunnel (the L2 messenger proxy). Required on Polygon only.
    pub l2_tunnel: Option<Address>,
    /// Replaces the registered Fx root on Polygon.
    pub fx_root_override: Option<Address>,
}

/// Inputs of [`ParameterResolver::resolve_l2_bridge_args`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2BridgeRequest {
    pub l1_chain_id: ChainId,
    pub l2_chain_id: ChainId,
    pub l2_messenger: Address,
    /// Required on Polygon, where the proxy is the authorized caller.
    pub l2_messenger_proxy: Option<Address>,
    pub governance: Address,
    pub h_token: Address,
    pub l1_bridge: Address,
    pub active_chain_ids: Vec<ChainId>,
    pub bonders: Vec<Address>,
}

/// Produces family-specific argument lists from the chain registry and the
/// address book.
#[derive(Debug, Clone, Copy)]
pub struct ParameterResolver<'a> {
    chains: &'a ChainRegistry,
    address_book: &'a AddressBook,
    defaults: &'a MessengerDefaults,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(
        chains: &'a ChainRegistry,
        address_book: &'a AddressBook,
        defaults: &'a MessengerDefaults,
    ) -> Self {
        Self {
            chains,
            address_book,
            defaults,
        }
    }

    /// Messenger wrapper constructor arguments for the L2 chain's family.
    pub fn resolve_wrapper_args(&self, req: &WrapperRequest) -> Result<WrapperArgs, DeployError> {
        let family = self.chains.l2_family(req.l2_chain_id)?;
        let l1_messenger = || {
            req.l1_messenger.ok_or_else(|| {
                DeployError::invalid(format!("the {family} wrapper needs the L1 messenger address"))
            })
        };

        let args = match family {
            L2Family::Arbitrum => WrapperArgs::Arbitrum {
                l1_bridge: req.l1_bridge,
                l2_bridge: req.l2_bridge,
                l1_messenger: l1_messenger()?,
                gas_limit: self.defaults.wrapper_gas_limit,
                gas_price: self.defaults.wrapper_gas_price,
                call_value: self.defaults.wrapper_call_value,
            },
            L2Family::Optimism => WrapperArgs::Optimism {
                l1_bridge: req.l1_bridge,
                l2_bridge: req.l2_bridge,
                l1_messenger: l1_messenger()?,
                gas_limit: self.defaults.wrapper_gas_limit,
            },
            L2Family::XDai => WrapperArgs::XDai {
                l1_bridge: req.l1_bridge,
                l2_bridge: req.l2_bridge,
                l1_messenger: l1_messenger()?,
                gas_limit: self.defaults.xdai_wrapper_gas_limit,
                l2_chain_id: req.l2_chain_id,
                amb_proxy: self.address_book.xdai_for_chain(req.l1_chain_id)?.amb_proxy,
            },
            L2Family::Polygon => {
                let polygon = self.address_book.polygon_for_chain(req.l1_chain_id)?;
                let fx_child_tunnel = req
                    .l2_tunnel
                    .filter(|a| !a.is_zero())
                    .ok_or(DeployError::MissingProxyAddress {
                        chain: req.l2_chain_id,
                    })?;
                WrapperArgs::Polygon {
                    l1_bridge: req.l1_bridge,
                    checkpoint_manager: polygon.checkpoint_manager,
                    fx_root: req.fx_root_override.unwrap_or(polygon.fx_root),
                    fx_child_tunnel,
                }
            }
        };

        tracing::debug!(
            l2_chain_id = %req.l2_chain_id,
            %family,
            "Resolved messenger wrapper arguments"
        );
        Ok(args)
    }

    /// L2 bridge initializer arguments for the L2 chain's family.
    pub fn resolve_l2_bridge_args(&self, req: &L2BridgeRequest) -> Result<L2BridgeArgs, DeployError> {
        let family = self.chains.l2_family(req.l2_chain_id)?;

        let (messenger, extra) = match family {
            L2Family::Arbitrum => (req.l2_messenger, L2BridgeExtra::Arbitrum),
            L2Family::Optimism => (
                req.l2_messenger,
                L2BridgeExtra::Optimism {
                    default_gas_limit: self.defaults.l2_bridge_gas_limit,
                },
            ),
            L2Family::XDai => (
                req.l2_messenger,
                L2BridgeExtra::XDai {
                    l1_chain_id: req.l1_chain_id,
                    default_gas_limit: self.defaults.l2_bridge_gas_limit,
                },
            ),
            L2Family::Polygon => {
                let proxy = req
                    .l2_messenger_proxy
                    .filter(|a| !a.is_zero())
                    .ok_or(DeployError::MissingProxyAddress {
                        chain: req.l2_chain_id,
                    })?;
                (proxy, L2BridgeExtra::Polygon)
            }
        };

        Ok(L2BridgeArgs {
            messenger,
            governance: req.governance,
            h_token: req.h_token,
            l1_bridge: req.l1_bridge,
            extra,
            active_chain_ids: req.active_chain_ids.clone(),
            bonders: req.bonders.clone(),
        })
    }
}
