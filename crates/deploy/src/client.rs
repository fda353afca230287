//! Chain client boundary and its JSON-RPC adapter.

use std::{collections::BTreeMap, future::Future, time::Duration};

use alloy_core::primitives::{Address, B256, Bytes, U64, U256};
use anyhow::{Context, Result};
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::rpc::{self, ReceiptObject, TransactionObject};

/// Identity a transaction is signed with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SignerRole {
    Deployer,
    Governance,
}

/// A transaction to submit. `to == None` creates a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: SignerRole,
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<U256>,
}

impl TxRequest {
    /// A call to an existing contract.
    pub fn call(from: SignerRole, to: Address, data: Bytes) -> Self {
        Self {
            from,
            to: Some(to),
            data,
            value: U256::ZERO,
            gas_limit: None,
            gas_price: None,
        }
    }

    /// A contract creation.
    pub fn create(from: SignerRole, init_code: Bytes) -> Self {
        Self {
            from,
            to: None,
            data: init_code,
            value: U256::ZERO,
            gas_limit: None,
            gas_price: None,
        }
    }

    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// Handle to a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingTx {
    pub tx_hash: B256,
}

/// Inclusion result of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub success: bool,
    pub contract_address: Option<Address>,
}

/// Capability to sign, submit and confirm transactions on one network.
pub trait ChainClient: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Address of the identity behind `role`.
    fn signer(&self, role: SignerRole) -> Result<Address>;

    /// Current gas price.
    fn gas_price(&self) -> impl Future<Output = Result<U256>> + Send;

    /// Sign and broadcast a transaction.
    fn submit(&self, tx: TxRequest) -> impl Future<Output = Result<PendingTx>> + Send;

    /// Block until the transaction has one confirmation.
    ///
    /// A reverted transaction still returns a receipt with `success == false`.
    fn wait_for_confirmation(
        &self,
        pending: PendingTx,
    ) -> impl Future<Output = Result<TxReceipt>> + Send;
}

impl<T: ChainClient> ChainClient for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn signer(&self, role: SignerRole) -> Result<Address> {
        (**self).signer(role)
    }

    fn gas_price(&self) -> impl Future<Output = Result<U256>> + Send {
        (**self).gas_price()
    }

    fn submit(&self, tx: TxRequest) -> impl Future<Output = Result<PendingTx>> + Send {
        (**self).submit(tx)
    }

    fn wait_for_confirmation(
        &self,
        pending: PendingTx,
    ) -> impl Future<Output = Result<TxReceipt>> + Send {
        (**self).wait_for_confirmation(pending)
    }
}

/// Logical network a client serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ClientRole {
    L1,
    L2,
}

/// Clients handed to the orchestrator, selected once per run.
#[derive(Debug, Clone)]
pub struct ChainClients<C> {
    pub l1: C,
    /// Only Polygon setups send anything on the L2 network.
    pub l2: Option<C>,
}

impl<C> ChainClients<C> {
    pub fn l1_only(l1: C) -> Self {
        Self { l1, l2: None }
    }

    pub fn with_l2(l1: C, l2: C) -> Self {
        Self { l1, l2: Some(l2) }
    }

    pub fn get(&self, role: ClientRole) -> Option<&C> {
        match role {
            ClientRole::L1 => Some(&self.l1),
            ClientRole::L2 => self.l2.as_ref(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

/// Settings of one JSON-RPC backed client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcClientConfig {
    /// Name used in logs and errors.
    pub name: String,
    /// Node endpoint. The node holds the signing keys.
    pub url: Url,
    /// Interval between receipt polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Unlocked account per signer role.
    #[serde(default)]
    pub signers: BTreeMap<SignerRole, Address>,
}

impl RpcClientConfig {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
            poll_interval_ms: default_poll_interval_ms(),
            signers: BTreeMap::new(),
        }
    }

    pub fn with_signer(mut self, role: SignerRole, address: Address) -> Self {
        self.signers.insert(role, address);
        self
    }
}

/// Outcome of one receipt poll that did not yield a receipt.
#[derive(Debug)]
enum ReceiptPoll {
    Pending,
    Rpc(anyhow::Error),
}

/// [`ChainClient`] that talks to a node with unlocked accounts over JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    config: RpcClientConfig,
    http: reqwest::Client,
}

impl RpcChainClient {
    pub fn new(config: RpcClientConfig) -> Result<Self> {
        Ok(Self {
            config,
            http: rpc::create_client()?,
        })
    }

    pub fn config(&self) -> &RpcClientConfig {
        &self.config
    }

    async fn fetch_receipt(&self, tx_hash: B256) -> Result<Option<ReceiptObject>> {
        rpc::json_rpc_call(
            &self.http,
            &self.config.url,
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx_hash)],
        )
        .await
    }
}

impl ChainClient for RpcChainClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn signer(&self, role: SignerRole) -> Result<Address> {
        self.config
            .signers
            .get(&role)
            .copied()
            .with_context(|| format!("No {role} signer configured for {}", self.config.name))
    }

    async fn gas_price(&self) -> Result<U256> {
        rpc::json_rpc_call(&self.http, &self.config.url, "eth_gasPrice", vec![])
            .await
            .with_context(|| format!("Failed to fetch gas price from {}", self.config.name))
    }

    async fn submit(&self, tx: TxRequest) -> Result<PendingTx> {
        let object = TransactionObject {
            from: self.signer(tx.from)?,
            to: tx.to,
            data: tx.data,
            value: tx.value,
            gas: tx.gas_limit.map(U64::from),
            gas_price: tx.gas_price,
        };

        let tx_hash: B256 = rpc::json_rpc_call(
            &self.http,
            &self.config.url,
            "eth_sendTransaction",
            vec![serde_json::to_value(&object).context("Failed to encode transaction")?],
        )
        .await
        .with_context(|| format!("Failed to send transaction on {}", self.config.name))?;

        tracing::debug!(chain = %self.config.name, %tx_hash, "Transaction sent");
        Ok(PendingTx { tx_hash })
    }

    async fn wait_for_confirmation(&self, pending: PendingTx) -> Result<TxReceipt> {
        let tx_hash = pending.tx_hash;
        let backoff = ConstantBuilder::default()
            .with_delay(Duration::from_millis(self.config.poll_interval_ms))
            .without_max_times();

        // Only a missing receipt is retried. Transport and node errors surface immediately.
        let receipt = (|| async {
            self.fetch_receipt(tx_hash)
                .await
                .map_err(ReceiptPoll::Rpc)?
                .ok_or(ReceiptPoll::Pending)
        })
        .retry(backoff)
        .when(|err| matches!(err, ReceiptPoll::Pending))
        .notify(|_, _| {
            tracing::trace!(chain = %self.config.name, %tx_hash, "Waiting for receipt...");
        })
        .await
        .map_err(|err| match err {
            ReceiptPoll::Rpc(err) => err,
            ReceiptPoll::Pending => anyhow::anyhow!("Transaction {tx_hash} not yet included"),
        })
        .with_context(|| format!("Failed to fetch receipt of {tx_hash} from {}", self.config.name))?;

        let block_number = receipt
            .block_number
            .context("Receipt has no block number")?
            .to::<u64>();

        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number,
            success: receipt.succeeded(),
            contract_address: receipt.contract_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::address;

    use super::*;

    #[test]
    fn test_tx_request_builders() {
        let tx = TxRequest::create(SignerRole::Deployer, Bytes::from_static(&[0x60]))
            .with_gas_price(U256::from(7u64))
            .with_gas_limit(100_000);
        assert!(tx.is_create());
        assert_eq!(tx.gas_price, Some(U256::from(7u64)));
        assert_eq!(tx.gas_limit, Some(100_000));

        let to = address!("0000000000000000000000000000000000000042");
        let tx = TxRequest::call(SignerRole::Governance, to, Bytes::new());
        assert!(!tx.is_create());
        assert_eq!(tx.to, Some(to));
    }

    #[test]
    fn test_signer_lookup() {
        let deployer = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let config = RpcClientConfig::new("l1", Url::parse("http://localhost:8545").unwrap())
            .with_signer(SignerRole::Deployer, deployer);
        let client = RpcChainClient::new(config).unwrap();

        assert_eq!(client.signer(SignerRole::Deployer).unwrap(), deployer);
        let err = client.signer(SignerRole::Governance).unwrap_err();
        assert_eq!(err.to_string(), "No governance signer configured for l1");
    }

    #[test]
    fn test_rpc_client_config_from_toml() {
        let config: RpcClientConfig = toml::from_str(
            r#"
            name = "kovan"
            url = "http://localhost:8545"

            [signers]
            deployer = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            governance = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
            "#,
        )
        .unwrap();

        assert_eq!(config.poll_interval_ms, 2_000);
        assert_eq!(config.signers.len(), 2);
    }

    #[tokio::test]
    async fn test_receipt_wait_surfaces_connection_errors() {
        let config = RpcClientConfig::new("l1", Url::parse("http://127.0.0.1:1").unwrap());
        let client = RpcChainClient::new(config).unwrap();
        let pending = PendingTx {
            tx_hash: B256::repeat_byte(0x11),
        };

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.wait_for_confirmation(pending),
        )
        .await
        .expect("connection errors should not be retried");

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to send eth_getTransactionReceipt request"));
    }

    #[test]
    fn test_chain_clients_roles() {
        let clients = ChainClients::l1_only("l1");
        assert_eq!(clients.get(ClientRole::L1), Some(&"l1"));
        assert_eq!(clients.get(ClientRole::L2), None);

        let clients = ChainClients::with_l2("l1", "l2");
        assert_eq!(clients.get(ClientRole::L2), Some(&"l2"));
    }
}
