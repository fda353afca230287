//! Canonical infrastructure addresses per L1 network.
//!
//! Only the Polygon and xDai families need network-specific addresses to build
//! their messenger wrappers. Arbitrum and Optimism wrappers have a uniform
//! shape and are never looked up here.

use std::collections::BTreeMap;

use alloy_core::primitives::{Address, address};
use serde::{Deserialize, Serialize};

use crate::{
    chain::{ChainId, L1Network, L2Family},
    error::DeployError,
};

/// Polygon (Fx portal) infrastructure registered against one L1 network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonAddresses {
    /// Root chain checkpoint manager.
    pub checkpoint_manager: Address,
    /// Fx root on L1.
    pub fx_root: Address,
    /// Fx child on the Polygon chain.
    pub fx_child: Address,
    /// Predicate for plain (non-mintable) ERC-20 deposits.
    pub erc20_predicate: Address,
    /// Predicate for mintable ERC-20 deposits.
    pub mintable_erc20_predicate: Address,
    /// RPC endpoint of the paired Polygon chain.
    pub rpc_url: String,
    /// The one test-network token that goes through the plain predicate.
    ///
    /// Ignored on mainnet, where every token uses the plain predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testnet_usdc: Option<Address>,
}

/// xDai (AMB) infrastructure registered against one L1 network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XDaiAddresses {
    /// Arbitrary message bridge proxy on L1.
    pub amb_proxy: Address,
}

/// The family-specific address set returned by [`AddressBook::addresses_for`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalAddressSet {
    Polygon(PolygonAddresses),
    XDai(XDaiAddresses),
}

/// Static registry of canonical infrastructure, keyed by L1 network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    #[serde(default)]
    pub polygon: BTreeMap<L1Network, PolygonAddresses>,
    #[serde(default)]
    pub xdai: BTreeMap<L1Network, XDaiAddresses>,
}

impl Default for AddressBook {
    fn default() -> Self {
        Self::standard()
    }
}

impl AddressBook {
    /// The built-in address book: Polygon on mainnet and goerli, xDai on
    /// mainnet and kovan.
    pub fn standard() -> Self {
        let polygon = BTreeMap::from([
            (
                L1Network::Mainnet,
                PolygonAddresses {
                    checkpoint_manager: address!("86E4Dc95c7FBdBf52e33D563BbDB00823894C287"),
                    fx_root: address!("fe5e5D361b2ad62c541bAb87C45a0B9B018389a2"),
                    fx_child: address!("8397259c983751DAf40400790063935a11afa28a"),
                    erc20_predicate: address!("40ec5B33f54e0E8A33A975908C5BA1c14e5BbbDf"),
                    mintable_erc20_predicate: address!("9923263fA127b3d1484cFD649df8f1831c2A74e4"),
                    rpc_url: "https://polygon-rpc.com".to_string(),
                    testnet_usdc: None,
                },
            ),
            (
                L1Network::Goerli,
                PolygonAddresses {
                    checkpoint_manager: address!("2890bA17EfE978480615e330ecB65333b880928e"),
                    fx_root: address!("3d1d3E34f7fB6D26245E6640E1c50710eFFf15bA"),
                    fx_child: address!("Cf73231F28B7331BBe3124B907840A94851f9f11"),
                    erc20_predicate: address!("dD6596F2029e6233DEFfaCa316e6A95217d4Dc34"),
                    mintable_erc20_predicate: address!("37c3bfC05d5ebF9EBb3FF80ce0bd0133Bf221BC8"),
                    rpc_url: "https://rpc-mumbai.maticvigil.com".to_string(),
                    testnet_usdc: Some(address!("98339D8C260052B7ad81c28c16C0b98420f2B46a")),
                },
            ),
        ]);

        let xdai = BTreeMap::from([
            (
                L1Network::Mainnet,
                XDaiAddresses {
                    amb_proxy: address!("4C36d2919e407f0Cc2Ee3c993ccF8ac26d9CE64e"),
                },
            ),
            (
                L1Network::Kovan,
                XDaiAddresses {
                    amb_proxy: address!("FE446bEF1DbF7AFE24E81e05BC8B271C1BA9a560"),
                },
            ),
        ]);

        Self { polygon, xdai }
    }

    /// Addresses a family needs on the given L1 network.
    ///
    /// Fails closed for networks without an entry and for families that have
    /// no network-specific infrastructure.
    pub fn addresses_for(
        &self,
        network: L1Network,
        family: L2Family,
    ) -> Result<CanonicalAddressSet, DeployError> {
        match family {
            L2Family::Polygon => self.polygon(network).cloned().map(CanonicalAddressSet::Polygon),
            L2Family::XDai => self.xdai(network).copied().map(CanonicalAddressSet::XDai),
            L2Family::Arbitrum | L2Family::Optimism => Err(unsupported(network, family)),
        }
    }

    /// Polygon addresses for an L1 network.
    pub fn polygon(&self, network: L1Network) -> Result<&PolygonAddresses, DeployError> {
        self.polygon
            .get(&network)
            .ok_or_else(|| unsupported(network, L2Family::Polygon))
    }

    /// xDai addresses for an L1 network.
    pub fn xdai(&self, network: L1Network) -> Result<&XDaiAddresses, DeployError> {
        self.xdai
            .get(&network)
            .ok_or_else(|| unsupported(network, L2Family::XDai))
    }

    /// Polygon addresses for an L1 chain ID.
    pub fn polygon_for_chain(&self, l1_chain_id: ChainId) -> Result<&PolygonAddresses, DeployError> {
        self.polygon(L1Network::try_from_chain_id(l1_chain_id)?)
    }

    /// xDai addresses for an L1 chain ID.
    pub fn xdai_for_chain(&self, l1_chain_id: ChainId) -> Result<&XDaiAddresses, DeployError> {
        self.xdai(L1Network::try_from_chain_id(l1_chain_id)?)
    }

    /// The Polygon predicate that must be approved to deposit `token`.
    ///
    /// On mainnet this is always the plain ERC-20 predicate. On a test network
    /// only the registered test USDC uses the plain predicate and every other
    /// token is mintable.
    pub fn polygon_predicate(&self, network: L1Network, token: Address) -> Result<Address, DeployError> {
        let addresses = self.polygon(network)?;
        if network.is_mainnet() || addresses.testnet_usdc == Some(token) {
            Ok(addresses.erc20_predicate)
        } else {
            Ok(addresses.mintable_erc20_predicate)
        }
    }
}

fn unsupported(network: L1Network, family: L2Family) -> DeployError {
    DeployError::UnsupportedNetwork {
        network: network.to_string(),
        family: Some(family),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_selection_on_testnet() {
        let book = AddressBook::standard();
        let goerli = book.polygon(L1Network::Goerli).unwrap().clone();
        let usdc = goerli.testnet_usdc.unwrap();

        assert_eq!(
            book.polygon_predicate(L1Network::Goerli, usdc).unwrap(),
            goerli.erc20_predicate
        );

        let other_token = address!("0000000000000000000000000000000000000abc");
        assert_eq!(
            book.polygon_predicate(L1Network::Goerli, other_token).unwrap(),
            goerli.mintable_erc20_predicate
        );
    }

    #[test]
    fn test_predicate_selection_on_mainnet_ignores_token() {
        let book = AddressBook::standard();
        let mainnet = book.polygon(L1Network::Mainnet).unwrap().clone();

        for token in [
            Address::ZERO,
            address!("98339D8C260052B7ad81c28c16C0b98420f2B46a"),
            address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        ] {
            assert_eq!(
                book.polygon_predicate(L1Network::Mainnet, token).unwrap(),
                mainnet.erc20_predicate
            );
        }
    }

    #[test]
    fn test_lookups_fail_closed() {
        let book = AddressBook::standard();

        assert!(matches!(
            book.polygon(L1Network::Kovan),
            Err(DeployError::UnsupportedNetwork {
                family: Some(L2Family::Polygon),
                ..
            })
        ));
        assert!(matches!(
            book.xdai(L1Network::Goerli),
            Err(DeployError::UnsupportedNetwork { .. })
        ));
        assert!(matches!(
            book.addresses_for(L1Network::Mainnet, L2Family::Arbitrum),
            Err(DeployError::UnsupportedNetwork { .. })
        ));
        assert!(matches!(
            book.xdai_for_chain(ChainId::from_u64(31337)),
            Err(DeployError::UnsupportedNetwork { family: None, .. })
        ));
    }

    #[test]
    fn test_addresses_for_family() {
        let book = AddressBook::standard();
        match book.addresses_for(L1Network::Kovan, L2Family::XDai).unwrap() {
            CanonicalAddressSet::XDai(xdai) => assert_eq!(
                xdai.amb_proxy,
                address!("FE446bEF1DbF7AFE24E81e05BC8B271C1BA9a560")
            ),
            other => panic!("unexpected address set: {other:?}"),
        }
    }

    #[test]
    fn test_address_book_toml_roundtrip() {
        let book = AddressBook::standard();
        let encoded = toml::to_string(&book).unwrap();
        let decoded: AddressBook = toml::from_str(&encoded).unwrap();
        assert_eq!(book, decoded);
    }
}
