//! Known L2 deployments per L1 network and the planning step that turns an
//! operator's (network, token) choice into setup inputs.

use std::{collections::BTreeMap, str::FromStr};

use alloy_core::primitives::{Address, U256, address};
use serde::{Deserialize, Serialize};

use crate::{
    chain::{ChainId, L1Network, ids},
    error::DeployError,
    store::SetupState,
};

/// Canonical tokens and seed liquidity of one token on one L2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub l1_canonical_token: Address,
    pub l2_canonical_token: Address,
    /// Amount bridged to seed liquidity, in the token's base unit.
    pub liquidity_provider_send_amount: U256,
}

/// Canonical infrastructure of one L2 network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2NetworkData {
    pub l2_chain_id: ChainId,
    pub l1_messenger: Address,
    pub l1_token_bridge: Address,
    pub l2_messenger: Address,
    pub l2_token_bridge: Address,
    /// Keyed by token symbol.
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenData>,
}

/// L2 deployments keyed by L1 network and then by L2 network name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkCatalog(BTreeMap<L1Network, BTreeMap<String, L2NetworkData>>);

impl Default for NetworkCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl NetworkCatalog {
    /// Built-in Kovan deployments. Tokens come from configuration.
    pub fn standard() -> Self {
        let kovan = BTreeMap::from([
            (
                "sokol".to_string(),
                L2NetworkData {
                    l2_chain_id: ids::XDAI_SOKOL,
                    l1_messenger: address!("Fe446bEF1DbF7AFE24E81e05BC8B271C1BA9a560"),
                    l1_token_bridge: address!("A960d095470f7509955d5402e36d9DB984B5C8E2"),
                    l2_messenger: address!("Fe446bEF1DbF7AFE24E81e05BC8B271C1BA9a560"),
                    l2_token_bridge: address!("40CdfF886715A4012fAD0219D15C98bB149AeF0e"),
                    tokens: BTreeMap::new(),
                },
            ),
            (
                "arbitrum".to_string(),
                L2NetworkData {
                    l2_chain_id: ids::ARBITRUM_TESTNET_4,
                    l1_messenger: address!("D71d47AD1b63981E9dB8e4A78C0b30170da8a601"),
                    l1_token_bridge: address!("2948ac43e4aff448f6af0f7a11f18bb6062dd271"),
                    l2_messenger: address!("0000000000000000000000000000000000000064"),
                    l2_token_bridge: address!("E49CCf3e19d847f8FF4d6962684A3242abF63f07"),
                    tokens: BTreeMap::new(),
                },
            ),
            (
                "optimism".to_string(),
                L2NetworkData {
                    l2_chain_id: ids::OPTIMISM_TESTNET_1,
                    l1_messenger: address!("78b88FD62FBdBf67b9C5C6528CF84E9d30BB28e0"),
                    l1_token_bridge: address!("C48528a44f2D961D179D69434645E54ac85732a1"),
                    l2_messenger: address!("4200000000000000000000000000000000000007"),
                    l2_token_bridge: address!("7B2ab06D22Cd230102215532928f60770376a2B3"),
                    tokens: BTreeMap::new(),
                },
            ),
        ]);

        Self(BTreeMap::from([(L1Network::Kovan, kovan)]))
    }

    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Add or replace an L2 network entry.
    pub fn insert(&mut self, l1: L1Network, name: impl Into<String>, data: L2NetworkData) {
        self.0.entry(l1).or_default().insert(name.into(), data);
    }

    /// Overlay `other` on top of this catalog, entry by entry.
    ///
    /// Tokens of an L2 that exists on both sides are merged as well.
    pub fn extend(&mut self, other: NetworkCatalog) {
        for (l1, l2s) in other.0 {
            let entries = self.0.entry(l1).or_default();
            for (name, data) in l2s {
                match entries.get_mut(&name) {
                    Some(existing) => {
                        let mut data = data;
                        let mut tokens = std::mem::take(&mut existing.tokens);
                        tokens.append(&mut data.tokens);
                        *existing = L2NetworkData { tokens, ..data };
                    }
                    None => {
                        entries.insert(name, data);
                    }
                }
            }
        }
    }

    /// Look up an L2 network by name, case-insensitively.
    pub fn l2_network(&self, l1: L1Network, name: &str) -> Result<&L2NetworkData, DeployError> {
        let entries = self.0.get(&l1).ok_or_else(|| DeployError::UnsupportedNetwork {
            network: l1.to_string(),
            family: None,
        })?;

        entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, data)| data)
            .ok_or_else(|| DeployError::invalid(format!("unknown L2 network '{name}' on {l1}")))
    }

    /// Every (L1, L2 name) pair in the catalog.
    pub fn entries(&self) -> impl Iterator<Item = (L1Network, &str, &L2NetworkData)> {
        self.0
            .iter()
            .flat_map(|(l1, l2s)| l2s.iter().map(move |(name, data)| (*l1, name.as_str(), data)))
    }

    /// Resolve an operator request into the setup inputs it implies.
    pub fn plan(&self, request: &PlanRequest) -> Result<SetupState, DeployError> {
        let l1_name = non_empty(&request.l1_network, "L1 network name")?;
        let l2_name = non_empty(&request.l2_network, "L2 network name")?;
        let symbol = non_empty(&request.token, "token symbol")?;
        let bonder = match request.bonder.as_deref() {
            Some(raw) => parse_address(raw, "bonder address")?,
            None => Address::ZERO,
        };

        let l1 = L1Network::from_str(l1_name).map_err(|_| DeployError::UnsupportedNetwork {
            network: l1_name.to_string(),
            family: None,
        })?;
        let network = self.l2_network(l1, l2_name)?;
        let token = network
            .tokens
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(symbol))
            .map(|(_, data)| data)
            .ok_or_else(|| {
                DeployError::invalid(format!("unknown token '{symbol}' on {l1}/{l2_name}"))
            })?;

        let send_amount = token.liquidity_provider_send_amount;

        tracing::info!(
            l1_network = %l1,
            l2_network = %l2_name,
            token = %symbol,
            l2_chain_id = %network.l2_chain_id,
            "Planned setup inputs"
        );

        Ok(SetupState {
            l1_chain_id: Some(l1.chain_id()),
            l2_chain_id: Some(network.l2_chain_id),
            l1_bridge_address: request.l1_bridge,
            l1_messenger_address: Some(network.l1_messenger),
            l1_token_bridge_address: Some(network.l1_token_bridge),
            l2_messenger_address: Some(network.l2_messenger),
            l2_token_bridge_address: Some(network.l2_token_bridge),
            l1_canonical_token_address: Some(token.l1_canonical_token),
            l2_canonical_token_address: Some(token.l2_canonical_token),
            liquidity_provider_send_amount: Some(send_amount),
            liquidity_provider_amm_amount: Some(send_amount / U256::from(2u64)),
            bonder_address: Some(bonder),
            ..SetupState::default()
        })
    }
}

/// Operator input to [`NetworkCatalog::plan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRequest {
    pub l1_network: String,
    pub l2_network: String,
    pub token: String,
    /// Defaults to the zero address.
    pub bonder: Option<String>,
    pub l1_bridge: Option<Address>,
}

fn non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str, DeployError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DeployError::invalid(format!("{what} is empty")));
    }
    Ok(value)
}

/// Parse a 0x-prefixed, 40 hex character address.
pub fn parse_address(raw: &str, what: &str) -> Result<Address, DeployError> {
    let raw = raw.trim();
    if !raw.starts_with("0x") || raw.len() != 42 {
        return Err(DeployError::invalid(format!(
            "{what} must be 0x-prefixed and 40 hex chars, got '{raw}'"
        )));
    }

    Address::from_str(raw)
        .map_err(|e| DeployError::invalid(format!("{what} '{raw}' is not valid hex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAI_L1: Address = address!("436e3FfB93A4763575E5C0F6b3c97D5489E050da");
    const DAI_L2: Address = address!("7d669A64deb8a4A51eEa755bb0E19FD39CE25Ae9");

    fn catalog() -> NetworkCatalog {
        let mut catalog = NetworkCatalog::standard();
        let mut extra = NetworkCatalog::empty();
        let mut optimism = catalog
            .l2_network(L1Network::Kovan, "optimism")
            .unwrap()
            .clone();
        optimism.tokens.insert(
            "DAI".to_string(),
            TokenData {
                l1_canonical_token: DAI_L1,
                l2_canonical_token: DAI_L2,
                liquidity_provider_send_amount: U256::from(1_000_001u64),
            },
        );
        extra.insert(L1Network::Kovan, "optimism", optimism);
        catalog.extend(extra);
        catalog
    }

    fn request() -> PlanRequest {
        PlanRequest {
            l1_network: "Kovan".to_string(),
            l2_network: "OPTIMISM".to_string(),
            token: "dai".to_string(),
            bonder: Some("0x00000000000000000000000000000000000000b0".to_string()),
            l1_bridge: Some(address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")),
        }
    }

    #[test]
    fn test_plan_fills_setup_inputs() {
        let state = catalog().plan(&request()).unwrap();

        assert_eq!(state.l1_chain_id, Some(ids::KOVAN));
        assert_eq!(state.l2_chain_id, Some(ids::OPTIMISM_TESTNET_1));
        assert_eq!(
            state.l2_messenger_address,
            Some(address!("4200000000000000000000000000000000000007"))
        );
        assert_eq!(state.l1_canonical_token_address, Some(DAI_L1));
        assert_eq!(state.l2_canonical_token_address, Some(DAI_L2));
        assert_eq!(state.liquidity_provider_send_amount, Some(U256::from(1_000_001u64)));
        assert_eq!(state.liquidity_provider_amm_amount, Some(U256::from(500_000u64)));
        assert_eq!(
            state.bonder_address,
            Some(address!("00000000000000000000000000000000000000b0"))
        );
        assert!(state.completed.is_empty());
    }

    #[test]
    fn test_plan_defaults_bonder_to_zero() {
        let mut req = request();
        req.bonder = None;
        let state = catalog().plan(&req).unwrap();
        assert_eq!(state.bonder_address, Some(Address::ZERO));
    }

    #[test]
    fn test_plan_validates_input() {
        let mut req = request();
        req.token = "  ".to_string();
        assert!(matches!(catalog().plan(&req), Err(DeployError::InvalidArgument(_))));

        let mut req = request();
        req.bonder = Some("0x1234".to_string());
        assert!(matches!(catalog().plan(&req), Err(DeployError::InvalidArgument(_))));

        let mut req = request();
        req.bonder = Some(format!("0x{}", "zz".repeat(20)));
        assert!(matches!(catalog().plan(&req), Err(DeployError::InvalidArgument(_))));

        let mut req = request();
        req.l2_network = "polygon".to_string();
        assert!(matches!(catalog().plan(&req), Err(DeployError::InvalidArgument(_))));

        let mut req = request();
        req.token = "USDC".to_string();
        assert!(matches!(catalog().plan(&req), Err(DeployError::InvalidArgument(_))));
    }

    #[test]
    fn test_plan_rejects_unknown_l1() {
        let mut req = request();
        req.l1_network = "ropsten".to_string();
        assert!(matches!(
            catalog().plan(&req),
            Err(DeployError::UnsupportedNetwork { .. })
        ));

        req.l1_network = "goerli".to_string();
        assert!(matches!(
            catalog().plan(&req),
            Err(DeployError::UnsupportedNetwork { .. })
        ));
    }

    #[test]
    fn test_extend_keeps_builtin_entries() {
        let catalog = catalog();
        let names: Vec<_> = catalog.entries().map(|(_, name, _)| name).collect();
        assert_eq!(names, vec!["arbitrum", "optimism", "sokol"]);
    }

    #[test]
    fn test_catalog_from_toml() {
        let catalog: NetworkCatalog = toml::from_str(
            r#"
            [kovan.optimism]
            l2_chain_id = 69
            l1_messenger = "0x78b88FD62FBdBf67b9C5C6528CF84E9d30BB28e0"
            l1_token_bridge = "0xC48528a44f2D961D179D69434645E54ac85732a1"
            l2_messenger = "0x4200000000000000000000000000000000000007"
            l2_token_bridge = "0x7B2ab06D22Cd230102215532928f60770376a2B3"

            [kovan.optimism.tokens.DAI]
            l1_canonical_token = "0x436e3FfB93A4763575E5C0F6b3c97D5489E050da"
            l2_canonical_token = "0x7d669A64deb8a4A51eEa755bb0E19FD39CE25Ae9"
            liquidity_provider_send_amount = "1000000000000000000000"
            "#,
        )
        .unwrap();

        let optimism = catalog.l2_network(L1Network::Kovan, "optimism").unwrap();
        assert_eq!(optimism.tokens.len(), 1);
        assert_eq!(
            optimism.tokens["DAI"].liquidity_provider_send_amount,
            U256::from(10u64).pow(U256::from(21u64))
        );
    }
}
