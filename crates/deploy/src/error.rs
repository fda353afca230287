//! Error taxonomy for parameter resolution and setup orchestration.

use alloy_core::primitives::B256;

use crate::chain::{ChainFamily, ChainId, L2Family};

/// Errors raised by the classifier, the address book, the resolver and the
/// orchestrator.
///
/// Every variant is fatal for the current run. None of them is retried.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The chain ID is not part of any known chain set.
    #[error("unknown chain {0}: not listed as an L1 or in any L2 family")]
    UnknownChain(ChainId),

    /// Two chain sets claim the same chain ID.
    #[error("chain {chain} is listed both as {first} and as {second}")]
    OverlappingChainSets {
        chain: ChainId,
        first: ChainFamily,
        second: ChainFamily,
    },

    /// No canonical infrastructure is registered for this L1 network.
    #[error(
        "unsupported L1 network {network}{}",
        .family.map(|f| format!(" for the {f} family")).unwrap_or_default()
    )]
    UnsupportedNetwork {
        network: String,
        family: Option<L2Family>,
    },

    /// Polygon needs the L2 messenger proxy before anything is sent.
    #[error("L2 messenger proxy address is not set for Polygon chain {chain}")]
    MissingProxyAddress { chain: ChainId },

    /// A submitted transaction reverted, was not included, or could not be sent.
    #[error("transaction failed on {chain} during {step}: {reason}")]
    TransactionFailed {
        chain: String,
        step: String,
        reason: String,
    },

    /// The confirmation wait exceeded the configured timeout.
    #[error("timed out after {timeout_secs}s waiting for {tx_hash} on {chain} during {step}")]
    ConfirmationTimeout {
        chain: String,
        step: String,
        tx_hash: B256,
        timeout_secs: u64,
    },

    /// Malformed or missing caller input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl DeployError {
    /// Shorthand for [`DeployError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Build a [`DeployError::TransactionFailed`] from any displayable cause.
    pub fn tx_failed(
        chain: impl Into<String>,
        step: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::TransactionFailed {
            chain: chain.into(),
            step: step.into(),
            reason: format!("{reason:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_network_message() {
        let err = DeployError::UnsupportedNetwork {
            network: "kovan".to_string(),
            family: Some(L2Family::Polygon),
        };
        assert_eq!(
            err.to_string(),
            "unsupported L1 network kovan for the polygon family"
        );

        let err = DeployError::UnsupportedNetwork {
            network: "31337".to_string(),
            family: None,
        };
        assert_eq!(err.to_string(), "unsupported L1 network 31337");
    }

    #[test]
    fn test_tx_failed_keeps_cause_chain() {
        let cause = anyhow::anyhow!("execution reverted").context("eth_sendTransaction");
        let err = DeployError::tx_failed("l1", "bind messenger wrapper", cause);
        assert_eq!(
            err.to_string(),
            "transaction failed on l1 during bind messenger wrapper: eth_sendTransaction: execution reverted"
        );
    }
}
