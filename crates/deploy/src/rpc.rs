//! JSON-RPC plumbing shared by the chain client adapter.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U64, U256};
use anyhow::Context;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// Node-side errors are surfaced with their message and, when present, the
/// revert data.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {method} request"))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {method} response"))?;

    if let Some(error) = result.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown");
        match error.get("data").and_then(|d| d.as_str()) {
            Some(data) => anyhow::bail!("RPC error: {message} (data: {data})"),
            None => anyhow::bail!("RPC error: {message}"),
        }
    }

    let result_value = result
        .get("result")
        .with_context(|| format!("No result in {method} response"))?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {method} result"))
}

/// `eth_sendTransaction` request object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionObject {
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    pub data: Bytes,
    #[serde(skip_serializing_if = "U256::is_zero")]
    pub value: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

/// The subset of `eth_getTransactionReceipt` the engine reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptObject {
    pub transaction_hash: B256,
    pub block_number: Option<U64>,
    /// Absent on pre-Byzantium receipts, which are treated as successful.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
}

impl ReceiptObject {
    pub fn succeeded(&self) -> bool {
        self.status.is_none_or(|s| !s.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::address;

    use super::*;

    #[test]
    fn test_receipt_object_parses_hex_quantities() {
        let receipt: ReceiptObject = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "blockNumber": "0x1b4",
            "status": "0x1",
            "contractAddress": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "gasUsed": "0x5208"
        }))
        .unwrap();

        assert_eq!(receipt.block_number, Some(U64::from(436u64)));
        assert!(receipt.succeeded());
        assert_eq!(
            receipt.contract_address,
            Some(address!("5FbDB2315678afecb367f032d93F642f64180aa3"))
        );
    }

    #[test]
    fn test_receipt_object_reverted() {
        let receipt: ReceiptObject = serde_json::from_value(serde_json::json!({
            "transactionHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "blockNumber": "0x10",
            "status": "0x0",
            "contractAddress": null
        }))
        .unwrap();

        assert!(!receipt.succeeded());
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn test_transaction_object_omits_unset_fields() {
        let tx = TransactionObject {
            from: address!("0000000000000000000000000000000000000001"),
            to: None,
            data: Bytes::from_static(&[0x60, 0x80]),
            value: U256::ZERO,
            gas: None,
            gas_price: Some(U256::from(1_000_000_000u64)),
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("to").is_none());
        assert!(json.get("value").is_none());
        assert!(json.get("gas").is_none());
        assert_eq!(json["gasPrice"], "0x3b9aca00");
        assert_eq!(json["data"], "0x6080");
    }
}
