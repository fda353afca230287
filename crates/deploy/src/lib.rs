//! bridgewire-deploy - Setup engine for multi-chain token bridge deployments.
//!
//! This crate classifies an L1/L2 chain pair into a messaging family, derives
//! the family-specific arguments needed to wire a bridge to that family's
//! canonical messenger, and runs the resumable L1 and L2 setup sequences.

pub mod address_book;
pub mod chain;
pub mod client;
pub mod config;
pub mod contracts;
mod error;
mod fingerprint;
pub mod networks;
pub mod orchestrator;
pub mod params;
mod rpc;
pub mod store;

pub use address_book::{AddressBook, CanonicalAddressSet, PolygonAddresses, XDaiAddresses};
pub use chain::{ChainFamily, ChainId, ChainRegistry, ChainSets, L1Network, L2Family};
pub use client::{
    ChainClient, ChainClients, ClientRole, PendingTx, RpcChainClient, RpcClientConfig, SignerRole,
    TxReceipt, TxRequest,
};
pub use config::{
    CONFIG_FILENAME, DEFAULT_STATE_FILENAME, DeployConfig, OrchestratorConfig, ProtocolConfig,
};
pub use contracts::{AdminMessage, ArtifactFactory, ContractFactory, ContractKind};
pub use error::DeployError;
pub use fingerprint::SetupFingerprint;
pub use networks::{L2NetworkData, NetworkCatalog, PlanRequest, TokenData};
pub use orchestrator::{
    L2SetupOutcome, L2SetupPlan, Orchestrator, SetupOutcome, SetupPlan, wrapper_deploy_data,
};
pub use params::{
    DeploymentParameters, L2BridgeArgs, L2BridgeRequest, MessengerDefaults, Param,
    ParameterResolver, WrapperArgs, WrapperRequest,
};
pub use store::{ConfigStore, JsonFileStore, MemoryStore, Milestone, SetupState};
