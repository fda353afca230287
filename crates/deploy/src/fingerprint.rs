use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{chain::ChainId, store::SetupState};

/// Setup inputs that the completed milestones depend on.
///
/// Changing any of these after the wrapper is deployed means the recorded
/// progress no longer describes the requested setup. Amounts and the AMM
/// wrapper are excluded since they only affect milestones that run after them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupFingerprint {
    pub l1_chain_id: Option<ChainId>,
    pub l2_chain_id: Option<ChainId>,
    pub l1_bridge: Option<Address>,
    pub l2_bridge: Option<Address>,
    pub l1_messenger: Option<Address>,
    pub l2_messenger_proxy: Option<Address>,
    pub fx_root: Option<Address>,
}

impl SetupFingerprint {
    /// Extract the fingerprinted inputs from a setup state.
    pub fn from_state(state: &SetupState) -> Self {
        Self {
            l1_chain_id: state.l1_chain_id,
            l2_chain_id: state.l2_chain_id,
            l1_bridge: state.l1_bridge_address,
            l2_bridge: state.l2_bridge_address,
            l1_messenger: state.l1_messenger_address,
            l2_messenger_proxy: state.l2_messenger_proxy_address,
            fx_root: state.fx_root_address,
        }
    }

    /// Compute a SHA-256 hash of these inputs.
    ///
    /// Fields are fed in declaration order, each prefixed with a presence
    /// byte, so an unset field never collides with a set one.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for chain_id in [self.l1_chain_id, self.l2_chain_id] {
            update_optional(&mut hasher, chain_id.map(|id| id.as_u256().to_be_bytes::<32>()));
        }
        for address in [
            self.l1_bridge,
            self.l2_bridge,
            self.l1_messenger,
            self.l2_messenger_proxy,
            self.fx_root,
        ] {
            update_optional(&mut hasher, address.map(|a| a.into_array()));
        }
        hex::encode(hasher.finalize())
    }
}

fn update_optional<const N: usize>(hasher: &mut Sha256, value: Option<[u8; N]>) {
    match value {
        Some(bytes) => {
            hasher.update([1u8]);
            hasher.update(bytes);
        }
        None => hasher.update([0u8]),
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::address;

    use super::*;
    use crate::chain::ids;

    fn state() -> SetupState {
        SetupState {
            l1_chain_id: Some(ids::KOVAN),
            l2_chain_id: Some(ids::OPTIMISM_TESTNET_1),
            l1_bridge_address: Some(address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")),
            l2_bridge_address: Some(address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")),
            l1_messenger_address: Some(address!("cccccccccccccccccccccccccccccccccccccccc")),
            ..SetupState::default()
        }
    }

    #[test]
    fn test_hash_determinism() {
        let hash1 = SetupFingerprint::from_state(&state()).compute_hash();
        let hash2 = SetupFingerprint::from_state(&state()).compute_hash();

        assert_eq!(hash1, hash2, "Hash should be deterministic");
        assert_eq!(hash1.len(), 64, "SHA-256 hash should be 64 hex characters");
    }

    #[test]
    fn test_hash_changes_with_l2_chain_id() {
        let mut other = state();
        other.l2_chain_id = Some(ids::XDAI_SOKOL);

        assert_ne!(
            SetupFingerprint::from_state(&state()).compute_hash(),
            SetupFingerprint::from_state(&other).compute_hash(),
            "Hash should change when l2_chain_id changes"
        );
    }

    #[test]
    fn test_hash_changes_with_l1_bridge() {
        let mut other = state();
        other.l1_bridge_address = Some(address!("dddddddddddddddddddddddddddddddddddddddd"));

        assert_ne!(
            SetupFingerprint::from_state(&state()).compute_hash(),
            SetupFingerprint::from_state(&other).compute_hash(),
            "Hash should change when the L1 bridge changes"
        );
    }

    #[test]
    fn test_hash_distinguishes_unset_fields() {
        let mut moved = state();
        moved.l1_messenger_address = None;
        moved.fx_root_address = Some(address!("cccccccccccccccccccccccccccccccccccccccc"));

        assert_ne!(
            SetupFingerprint::from_state(&state()).compute_hash(),
            SetupFingerprint::from_state(&moved).compute_hash(),
            "Hash should depend on which field a value is in"
        );
    }

    #[test]
    fn test_hash_ignores_outputs_and_amounts() {
        let mut other = state();
        other.l1_messenger_wrapper_address = Some(address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"));
        other.l2_amm_wrapper_address = Some(address!("ffffffffffffffffffffffffffffffffffffffff"));
        other.liquidity_provider_send_amount = Some(alloy_core::primitives::U256::from(10u64));

        assert_eq!(
            SetupFingerprint::from_state(&state()).compute_hash(),
            SetupFingerprint::from_state(&other).compute_hash(),
            "Hash should only track setup inputs"
        );
    }
}
