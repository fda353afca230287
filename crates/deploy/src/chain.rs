//! Chain identifiers and chain-family classification.
//!
//! A chain ID belongs to exactly one family. The family decides which
//! canonical messenger the bridge has to be wired to, so an unknown chain
//! is rejected instead of being mapped to a default family.

use std::{collections::BTreeMap, fmt, str::FromStr};

use alloy_core::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Identifier of a single chain.
///
/// Serialized as a decimal string. Accepts decimal or `0x` hex strings and
/// plain JSON/TOML integers when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "ChainIdRepr", into = "String")]
pub struct ChainId(U256);

impl ChainId {
    /// Build a chain ID from a `u64`.
    pub const fn from_u64(id: u64) -> Self {
        Self(U256::from_limbs([id, 0, 0, 0]))
    }

    /// The chain ID as a 256-bit integer, as passed to contracts.
    pub const fn as_u256(&self) -> U256 {
        self.0
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self::from_u64(id)
    }
}

impl From<U256> for ChainId {
    fn from(id: U256) -> Self {
        Self(id)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ChainId {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str(s.trim())
            .map(Self)
            .map_err(|e| DeployError::invalid(format!("invalid chain ID '{s}': {e}")))
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChainIdRepr {
    Number(u64),
    Text(String),
}

impl TryFrom<ChainIdRepr> for ChainId {
    type Error = DeployError;

    fn try_from(repr: ChainIdRepr) -> Result<Self, Self::Error> {
        match repr {
            ChainIdRepr::Number(id) => Ok(Self::from_u64(id)),
            ChainIdRepr::Text(s) => s.parse(),
        }
    }
}

/// Well-known chain IDs.
pub mod ids {
    use super::ChainId;

    pub const MAINNET: ChainId = ChainId::from_u64(1);
    pub const GOERLI: ChainId = ChainId::from_u64(5);
    pub const KOVAN: ChainId = ChainId::from_u64(42);

    pub const ARBITRUM_TESTNET_2: ChainId = ChainId::from_u64(152709604825713);
    pub const ARBITRUM_TESTNET_3: ChainId = ChainId::from_u64(79377087078960);
    pub const ARBITRUM_TESTNET_4: ChainId = ChainId::from_u64(212984383488152);

    pub const OPTIMISM_TESTNET_1: ChainId = ChainId::from_u64(69);
    pub const OPTIMISM_SYNTHETIX_DEMO: ChainId = ChainId::from_u64(420);

    pub const XDAI_SOKOL: ChainId = ChainId::from_u64(77);
    pub const XDAI: ChainId = ChainId::from_u64(100);

    pub const POLYGON_MUMBAI: ChainId = ChainId::from_u64(80001);
    pub const POLYGON: ChainId = ChainId::from_u64(137);
}

/// The messaging family a chain belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ChainFamily {
    L1,
    Arbitrum,
    Optimism,
    #[serde(rename = "xdai")]
    #[strum(to_string = "xdai")]
    XDai,
    Polygon,
}

impl ChainFamily {
    /// The rollup/sidechain family, or `None` for L1.
    pub const fn l2(self) -> Option<L2Family> {
        match self {
            Self::L1 => None,
            Self::Arbitrum => Some(L2Family::Arbitrum),
            Self::Optimism => Some(L2Family::Optimism),
            Self::XDai => Some(L2Family::XDai),
            Self::Polygon => Some(L2Family::Polygon),
        }
    }
}

/// The four L2 messaging families.
///
/// Parameter resolution only accepts this type, so an L1 classification can
/// never reach a family-specific resolver.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum L2Family {
    Arbitrum,
    Optimism,
    #[serde(rename = "xdai")]
    #[strum(to_string = "xdai")]
    XDai,
    Polygon,
}

impl From<L2Family> for ChainFamily {
    fn from(family: L2Family) -> Self {
        match family {
            L2Family::Arbitrum => Self::Arbitrum,
            L2Family::Optimism => Self::Optimism,
            L2Family::XDai => Self::XDai,
            L2Family::Polygon => Self::Polygon,
        }
    }
}

/// L1 networks that carry canonical infrastructure.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum L1Network {
    Mainnet,
    Goerli,
    Kovan,
}

impl L1Network {
    /// The chain ID of this network.
    pub const fn chain_id(self) -> ChainId {
        match self {
            Self::Mainnet => ids::MAINNET,
            Self::Goerli => ids::GOERLI,
            Self::Kovan => ids::KOVAN,
        }
    }

    /// Look up the network for an L1 chain ID.
    pub fn from_chain_id(chain_id: ChainId) -> Option<Self> {
        <Self as strum::IntoEnumIterator>::iter().find(|n| n.chain_id() == chain_id)
    }

    /// Like [`L1Network::from_chain_id`], failing closed.
    pub fn try_from_chain_id(chain_id: ChainId) -> Result<Self, DeployError> {
        Self::from_chain_id(chain_id).ok_or_else(|| DeployError::UnsupportedNetwork {
            network: chain_id.to_string(),
            family: None,
        })
    }

    pub const fn is_mainnet(self) -> bool {
        matches!(self, Self::Mainnet)
    }
}

/// The raw chain sets, one per family, as read from configuration.
///
/// A family left out of the configuration keeps its built-in set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSets {
    pub l1: Vec<ChainId>,
    pub arbitrum: Vec<ChainId>,
    pub optimism: Vec<ChainId>,
    pub xdai: Vec<ChainId>,
    pub polygon: Vec<ChainId>,
}

impl Default for ChainSets {
    fn default() -> Self {
        use ids::*;
        Self {
            l1: vec![MAINNET, GOERLI, KOVAN],
            arbitrum: vec![ARBITRUM_TESTNET_2, ARBITRUM_TESTNET_3, ARBITRUM_TESTNET_4],
            optimism: vec![OPTIMISM_TESTNET_1, OPTIMISM_SYNTHETIX_DEMO],
            xdai: vec![XDAI_SOKOL, XDAI],
            polygon: vec![POLYGON_MUMBAI, POLYGON],
        }
    }
}

impl ChainSets {
    fn by_family(&self) -> [(ChainFamily, &[ChainId]); 5] {
        [
            (ChainFamily::L1, self.l1.as_slice()),
            (ChainFamily::Arbitrum, self.arbitrum.as_slice()),
            (ChainFamily::Optimism, self.optimism.as_slice()),
            (ChainFamily::XDai, self.xdai.as_slice()),
            (ChainFamily::Polygon, self.polygon.as_slice()),
        ]
    }
}

/// Validated chain classifier.
///
/// Built once from [`ChainSets`]; the disjointness of the sets is checked at
/// construction and never again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChainSets", into = "ChainSets")]
pub struct ChainRegistry {
    sets: ChainSets,
    index: BTreeMap<ChainId, ChainFamily>,
}

impl ChainRegistry {
    /// Validate the chain sets and build the lookup index.
    pub fn new(sets: ChainSets) -> Result<Self, DeployError> {
        let mut index = BTreeMap::new();
        for (family, chains) in sets.by_family() {
            for &chain in chains {
                match index.insert(chain, family) {
                    Some(first) if first != family => {
                        return Err(DeployError::OverlappingChainSets {
                            chain,
                            first,
                            second: family,
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(Self { sets, index })
    }

    /// Classify a chain ID. Unknown chains fail with [`DeployError::UnknownChain`].
    pub fn classify(&self, chain_id: ChainId) -> Result<ChainFamily, DeployError> {
        self.index
            .get(&chain_id)
            .copied()
            .ok_or(DeployError::UnknownChain(chain_id))
    }

    /// True iff the chain is in the L1 set.
    pub fn is_l1(&self, chain_id: ChainId) -> bool {
        self.index.get(&chain_id) == Some(&ChainFamily::L1)
    }

    /// Classify a chain that must be an L2.
    pub fn l2_family(&self, chain_id: ChainId) -> Result<L2Family, DeployError> {
        self.classify(chain_id)?.l2().ok_or_else(|| {
            DeployError::invalid(format!("chain {chain_id} is an L1, expected an L2 chain"))
        })
    }

    /// Every supported chain ID, L1 first, in set order.
    pub fn all_chain_ids(&self) -> Vec<ChainId> {
        let mut seen = std::collections::BTreeSet::new();
        self.sets
            .by_family()
            .into_iter()
            .flat_map(|(_, chains)| chains.iter().copied())
            .filter(|chain| seen.insert(*chain))
            .collect()
    }

    pub fn sets(&self) -> &ChainSets {
        &self.sets
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        let sets = ChainSets::default();
        let index = sets
            .by_family()
            .into_iter()
            .flat_map(|(family, chains)| chains.iter().map(move |&c| (c, family)))
            .collect();
        Self { sets, index }
    }
}

impl TryFrom<ChainSets> for ChainRegistry {
    type Error = DeployError;

    fn try_from(sets: ChainSets) -> Result<Self, Self::Error> {
        Self::new(sets)
    }
}

impl From<ChainRegistry> for ChainSets {
    fn from(registry: ChainRegistry) -> Self {
        registry.sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reference_sets() {
        let registry = ChainRegistry::default();
        let expected = [
            (ids::MAINNET, ChainFamily::L1),
            (ids::GOERLI, ChainFamily::L1),
            (ids::KOVAN, ChainFamily::L1),
            (ids::ARBITRUM_TESTNET_2, ChainFamily::Arbitrum),
            (ids::ARBITRUM_TESTNET_3, ChainFamily::Arbitrum),
            (ids::ARBITRUM_TESTNET_4, ChainFamily::Arbitrum),
            (ids::OPTIMISM_TESTNET_1, ChainFamily::Optimism),
            (ids::OPTIMISM_SYNTHETIX_DEMO, ChainFamily::Optimism),
            (ids::XDAI_SOKOL, ChainFamily::XDai),
            (ids::XDAI, ChainFamily::XDai),
            (ids::POLYGON_MUMBAI, ChainFamily::Polygon),
            (ids::POLYGON, ChainFamily::Polygon),
        ];
        for (chain, family) in expected {
            assert_eq!(registry.classify(chain).unwrap(), family, "chain {chain}");
        }
    }

    #[test]
    fn test_classify_unknown_chain_fails() {
        let registry = ChainRegistry::default();
        for chain in [0u64, 10, 31337, 11155111] {
            let err = registry.classify(ChainId::from(chain)).unwrap_err();
            assert!(matches!(err, DeployError::UnknownChain(c) if c == ChainId::from(chain)));
        }
    }

    #[test]
    fn test_is_l1() {
        let registry = ChainRegistry::default();
        assert!(registry.is_l1(ids::KOVAN));
        assert!(!registry.is_l1(ids::XDAI));
        assert!(!registry.is_l1(ChainId::from_u64(31337)));
    }

    #[test]
    fn test_l2_family_rejects_l1() {
        let registry = ChainRegistry::default();
        assert_eq!(registry.l2_family(ids::XDAI_SOKOL).unwrap(), L2Family::XDai);
        assert!(matches!(
            registry.l2_family(ids::MAINNET),
            Err(DeployError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_overlapping_sets_rejected() {
        let mut sets = ChainSets::default();
        sets.polygon.push(ids::XDAI);

        let err = ChainRegistry::new(sets).unwrap_err();
        assert!(matches!(
            err,
            DeployError::OverlappingChainSets {
                first: ChainFamily::XDai,
                second: ChainFamily::Polygon,
                ..
            }
        ));
    }

    #[test]
    fn test_overlap_rejected_on_deserialize() {
        let toml = r#"
            l1 = [1, 42]
            arbitrum = []
            optimism = ["42"]
            xdai = []
            polygon = []
        "#;
        assert!(toml::from_str::<ChainRegistry>(toml).is_err());
    }

    #[test]
    fn test_chain_id_parsing() {
        assert_eq!("42".parse::<ChainId>().unwrap(), ids::KOVAN);
        assert_eq!("0x2a".parse::<ChainId>().unwrap(), ids::KOVAN);
        assert!("kovan".parse::<ChainId>().is_err());

        let json: Vec<ChainId> = serde_json::from_str(r#"[42, "212984383488152"]"#).unwrap();
        assert_eq!(json, vec![ids::KOVAN, ids::ARBITRUM_TESTNET_4]);
        assert_eq!(
            serde_json::to_string(&ids::ARBITRUM_TESTNET_4).unwrap(),
            r#""212984383488152""#
        );
    }

    #[test]
    fn test_l1_network_lookup() {
        assert_eq!(L1Network::from_chain_id(ids::KOVAN), Some(L1Network::Kovan));
        assert_eq!(L1Network::from_chain_id(ids::POLYGON), None);
        assert!(matches!(
            L1Network::try_from_chain_id(ChainId::from_u64(31337)),
            Err(DeployError::UnsupportedNetwork { family: None, .. })
        ));
        assert_eq!("Kovan".parse::<L1Network>().unwrap(), L1Network::Kovan);
    }

    #[test]
    fn test_all_chain_ids_deduplicated() {
        let registry = ChainRegistry::default();
        let all = registry.all_chain_ids();
        assert_eq!(all.len(), 12);
        assert_eq!(all[0], ids::MAINNET);
    }
}
