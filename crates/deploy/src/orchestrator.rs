//! The L1 and L2 setup sequences.
//!
//! Milestones run strictly in order. Each one is persisted as soon as its last
//! transaction confirms, and a re-run skips every milestone already recorded.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use anyhow::Result;

use crate::{
    address_book::AddressBook,
    chain::{ChainId, L1Network, L2Family},
    client::{ChainClient, ChainClients, SignerRole, TxReceipt, TxRequest},
    config::{OrchestratorConfig, ProtocolConfig},
    contracts::{
        AdminMessage, CanonicalDeposit, ContractCall, ContractFactory, ContractKind,
        IFxMessengerProxy, IL1Bridge, IMintableERC20, IUniswapRouter, RelayRoute,
    },
    error::DeployError,
    fingerprint::SetupFingerprint,
    params::{ParameterResolver, WrapperRequest},
    store::{ConfigStore, Milestone, SetupState, require},
};

/// Validated inputs of one setup run.
///
/// Built before any transaction is sent so that every input error surfaces
/// up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPlan {
    pub l1_chain_id: ChainId,
    pub l2_chain_id: ChainId,
    pub l1_network: L1Network,
    pub family: L2Family,
    pub l1_bridge: Address,
    pub l2_bridge: Address,
    /// Canonical L1 messenger. Polygon relays through the wrapper instead.
    pub l1_messenger: Option<Address>,
    pub l1_token_bridge: Address,
    pub l1_canonical_token: Address,
    pub l2_canonical_token: Address,
    /// Fx child tunnel on Polygon.
    pub l2_messenger_proxy: Option<Address>,
    pub l2_amm_wrapper: Address,
    pub fx_root_override: Option<Address>,
    pub liquidity_amount: U256,
}

impl SetupPlan {
    /// Classify the chains and check that every input the sequence needs is set.
    pub fn from_state(state: &SetupState, protocol: &ProtocolConfig) -> Result<Self, DeployError> {
        let l1_chain_id = require(state.l1_chain_id, "l1ChainId")?;
        let l2_chain_id = require(state.l2_chain_id, "l2ChainId")?;

        let l1_network = l1_network(protocol, l1_chain_id)?;
        let family = protocol.chains.l2_family(l2_chain_id)?;

        let l2_messenger_proxy = state.l2_messenger_proxy_address.filter(|a| !a.is_zero());
        let l1_messenger = match family {
            L2Family::Polygon => {
                if l2_messenger_proxy.is_none() {
                    return Err(DeployError::MissingProxyAddress { chain: l2_chain_id });
                }
                // Fails closed before anything is sent on a network without Fx contracts.
                protocol.address_book.polygon(l1_network)?;
                None
            }
            _ => Some(require(state.l1_messenger_address, "l1MessengerAddress")?),
        };

        let liquidity_amount = require(
            state.liquidity_provider_send_amount,
            "liquidityProviderSendAmount",
        )?;

        Ok(Self {
            l1_chain_id,
            l2_chain_id,
            l1_network,
            family,
            l1_bridge: require(state.l1_bridge_address, "l1BridgeAddress")?,
            l2_bridge: require(state.l2_bridge_address, "l2BridgeAddress")?,
            l1_messenger,
            l1_token_bridge: require(state.l1_token_bridge_address, "l1TokenBridgeAddress")?,
            l1_canonical_token: require(
                state.l1_canonical_token_address,
                "l1CanonicalTokenAddress",
            )?,
            l2_canonical_token: require(
                state.l2_canonical_token_address,
                "l2CanonicalTokenAddress",
            )?,
            l2_messenger_proxy,
            l2_amm_wrapper: require(state.l2_amm_wrapper_address, "l2AmmWrapperAddress")?,
            fx_root_override: state.fx_root_address,
            liquidity_amount,
        })
    }

    pub fn wrapper_request(&self) -> WrapperRequest {
        WrapperRequest {
            l1_chain_id: self.l1_chain_id,
            l2_chain_id: self.l2_chain_id,
            l1_bridge: self.l1_bridge,
            l2_bridge: self.l2_bridge,
            l1_messenger: self.l1_messenger,
            l2_tunnel: self.l2_messenger_proxy,
            fx_root_override: self.fx_root_override,
        }
    }

    /// Spender of the canonical deposit: the Polygon predicate, or the token bridge.
    pub fn deposit_spender(&self, book: &AddressBook) -> Result<Address, DeployError> {
        match self.family {
            L2Family::Polygon => book.polygon_predicate(self.l1_network, self.l1_canonical_token),
            _ => Ok(self.l1_token_bridge),
        }
    }

    /// Caller the L2 bridge must accept messages from.
    ///
    /// Polygon messages arrive unwrapped, so the L1 bridge itself is the caller.
    pub fn l1_bridge_caller(&self, wrapper: Address) -> Address {
        match self.family {
            L2Family::Polygon => self.l1_bridge,
            _ => wrapper,
        }
    }
}

/// The L1 network of `chain_id`, rejecting L2 and unknown chains.
fn l1_network(protocol: &ProtocolConfig, chain_id: ChainId) -> Result<L1Network, DeployError> {
    if !protocol.chains.is_l1(chain_id) {
        protocol.chains.classify(chain_id)?;
        return Err(DeployError::invalid(format!(
            "chain {chain_id} is not an L1 chain"
        )));
    }
    L1Network::try_from_chain_id(chain_id)
}

/// Validated inputs of the L2 setup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2SetupPlan {
    pub l1_network: L1Network,
    pub l2_chain_id: ChainId,
    pub family: L2Family,
    pub l2_bridge: Address,
    /// Hop token paired in the AMM. Bridges without a separate token mint it themselves.
    pub h_token: Address,
    pub l2_canonical_token: Address,
    pub router: Address,
    pub amm_amount: U256,
}

impl L2SetupPlan {
    pub fn from_state(state: &SetupState, protocol: &ProtocolConfig) -> Result<Self, DeployError> {
        let l1_network = l1_network(protocol, require(state.l1_chain_id, "l1ChainId")?)?;
        let l2_chain_id = require(state.l2_chain_id, "l2ChainId")?;
        let family = protocol.chains.l2_family(l2_chain_id)?;
        let l2_bridge = require(state.l2_bridge_address, "l2BridgeAddress")?;

        Ok(Self {
            l1_network,
            l2_chain_id,
            family,
            l2_bridge,
            h_token: state.l2_h_token_address.unwrap_or(l2_bridge),
            l2_canonical_token: require(
                state.l2_canonical_token_address,
                "l2CanonicalTokenAddress",
            )?,
            router: require(state.l2_uniswap_router_address, "l2UniswapRouterAddress")?,
            amm_amount: require(
                state.liquidity_provider_amm_amount,
                "liquidityProviderAmmAmount",
            )?,
        })
    }
}

/// Result of a setup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    pub family: L2Family,
    pub messenger_wrapper: Address,
    /// Milestones executed by this run.
    pub executed: Vec<Milestone>,
    /// Milestones skipped because an earlier run completed them.
    pub skipped: Vec<Milestone>,
    /// Hashes of every transaction this run confirmed, in order.
    pub transactions: Vec<B256>,
}

/// Result of an L2 setup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2SetupOutcome {
    pub family: L2Family,
    pub executed: Vec<Milestone>,
    pub skipped: Vec<Milestone>,
    pub transactions: Vec<B256>,
}

/// Drives the setup sequence against injected clients, factory and store.
pub struct Orchestrator<'a, C, F, S> {
    protocol: &'a ProtocolConfig,
    config: OrchestratorConfig,
    clients: ChainClients<C>,
    factory: F,
    store: S,
}

/// Bookkeeping of one run.
#[derive(Default)]
struct RunLog {
    executed: Vec<Milestone>,
    skipped: Vec<Milestone>,
    transactions: Vec<B256>,
}

impl<'a, C, F, S> Orchestrator<'a, C, F, S>
where
    C: ChainClient,
    F: ContractFactory,
    S: ConfigStore,
{
    pub fn new(
        protocol: &'a ProtocolConfig,
        config: OrchestratorConfig,
        clients: ChainClients<C>,
        factory: F,
        store: S,
    ) -> Self {
        Self {
            protocol,
            config,
            clients,
            factory,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run every milestone that is not yet recorded as complete.
    pub async fn run(&self) -> Result<SetupOutcome> {
        let state = self.store.read()?;
        let plan = SetupPlan::from_state(&state, self.protocol)?;
        let l1 = &self.clients.l1;

        let l2 = match plan.family {
            L2Family::Polygon => Some(self.clients.l2.as_ref().ok_or_else(|| {
                DeployError::invalid("Polygon setup needs an L2 client to set the root tunnel")
            })?),
            _ => None,
        };

        let fingerprint = SetupFingerprint::from_state(&state).compute_hash();
        match &state.fingerprint {
            Some(recorded) if *recorded != fingerprint && !state.completed.is_empty() => {
                return Err(DeployError::invalid(format!(
                    "setup inputs changed since the recorded progress (recorded {recorded}, now {fingerprint}); clear `completed` to start over"
                ))
                .into());
            }
            _ => {}
        }

        tracing::info!(
            l1_chain_id = %plan.l1_chain_id,
            l2_chain_id = %plan.l2_chain_id,
            family = %plan.family,
            completed = state.completed.len(),
            "Starting L1 setup"
        );

        let mut log = RunLog::default();
        let deployer = l1.signer(SignerRole::Deployer)?;
        let governance = l1.signer(SignerRole::Governance)?;
        let resolver = ParameterResolver::new(
            &self.protocol.chains,
            &self.protocol.address_book,
            &self.protocol.messenger,
        );

        // Deploy messenger wrapper
        let wrapper = if self.skip(&state, Milestone::DeployWrapper, &mut log) {
            require(state.l1_messenger_wrapper_address, "l1MessengerWrapperAddress")?
        } else {
            let args = resolver.resolve_wrapper_args(&plan.wrapper_request())?;
            let params = args.to_params();
            tracing::debug!(args = %params, "Messenger wrapper constructor arguments");

            let init_code = self
                .factory
                .deploy_data(ContractKind::MessengerWrapper(plan.family), &params)?;
            let receipt = self
                .send(
                    l1,
                    Milestone::DeployWrapper.description(),
                    TxRequest::create(SignerRole::Deployer, init_code),
                    &mut log,
                )
                .await?;
            let wrapper = receipt.contract_address.ok_or_else(|| {
                DeployError::tx_failed(
                    l1.name(),
                    Milestone::DeployWrapper.description(),
                    format!("receipt of {} has no contract address", receipt.tx_hash),
                )
            })?;

            tracing::info!(%wrapper, family = %plan.family, "Messenger wrapper deployed");
            self.complete(
                Milestone::DeployWrapper,
                SetupState {
                    l1_messenger_wrapper_address: Some(wrapper),
                    fingerprint: Some(fingerprint.clone()),
                    ..SetupState::default()
                },
                &mut log,
            )?;
            wrapper
        };

        // Polygon: register the wrapper as root tunnel on the L2 proxy
        if let Some((l2, proxy)) = l2.zip(plan.l2_messenger_proxy) {
            if !self.skip(&state, Milestone::SetFxRootTunnel, &mut log) {
                let call = ContractCall::new(
                    proxy,
                    IFxMessengerProxy::setFxRootTunnelCall {
                        fxRootTunnel: wrapper,
                    },
                );
                self.send(
                    l2,
                    Milestone::SetFxRootTunnel.description(),
                    TxRequest::call(SignerRole::Deployer, call.to, call.data)
                        .with_gas_limit(self.config.polygon_tunnel_gas_limit),
                    &mut log,
                )
                .await?;
                self.complete(Milestone::SetFxRootTunnel, SetupState::default(), &mut log)?;
            }
        }

        // Bind wrapper to the L1 bridge
        if !self.skip(&state, Milestone::BindWrapper, &mut log) {
            let call = ContractCall::new(
                plan.l1_bridge,
                IL1Bridge::setCrossDomainMessengerWrapperCall {
                    chainId: plan.l2_chain_id.as_u256(),
                    crossDomainMessengerWrapper: wrapper,
                },
            );
            self.send_call(l1, Milestone::BindWrapper, SignerRole::Governance, call, &mut log)
                .await?;
            self.complete(Milestone::BindWrapper, SetupState::default(), &mut log)?;
        }

        // Administrative relays to the L2 bridge
        let route = RelayRoute {
            family: plan.family,
            l1_messenger: plan.l1_messenger.unwrap_or(wrapper),
            wrapper,
            l2_target: plan.l2_bridge,
            sender: governance,
            gas_limit: self.protocol.messenger.relay_gas_limit,
        };
        let relays = [
            (
                Milestone::RelayL1BridgeCaller,
                AdminMessage::SetL1BridgeCaller(plan.l1_bridge_caller(wrapper)),
            ),
            (
                Milestone::RelayActiveChainIds,
                AdminMessage::AddActiveChainIds(self.protocol.chains.all_chain_ids()),
            ),
            (
                Milestone::RelayAmmWrapper,
                AdminMessage::SetAmmWrapper(plan.l2_amm_wrapper),
            ),
        ];
        for (milestone, message) in relays {
            if self.skip(&state, milestone, &mut log) {
                continue;
            }
            tracing::info!(entry_point = message.entry_point(), "Relaying message to L2 bridge");
            let call = route.call(&message)?;
            self.send_call(l1, milestone, SignerRole::Governance, call, &mut log)
                .await?;
            self.complete(milestone, SetupState::default(), &mut log)?;
        }

        // Seed liquidity through the canonical bridge
        let amount = plan.liquidity_amount;
        let mint_test_tokens = !plan.l1_network.is_mainnet();
        if !self.skip(&state, Milestone::CanonicalDeposit, &mut log) {
            let milestone = Milestone::CanonicalDeposit;
            if mint_test_tokens {
                self.mint(l1, plan.l1_canonical_token, deployer, amount, milestone, &mut log)
                    .await?;
            }
            let spender = plan.deposit_spender(&self.protocol.address_book)?;
            self.approve(l1, plan.l1_canonical_token, spender, amount, milestone, &mut log)
                .await?;

            let deposit = CanonicalDeposit {
                family: plan.family,
                token_bridge: plan.l1_token_bridge,
                l1_token: plan.l1_canonical_token,
                l2_token: plan.l2_canonical_token,
                recipient: deployer,
                amount,
                gas_limit: self.protocol.messenger.relay_gas_limit,
            };
            self.send_call(l1, milestone, SignerRole::Deployer, deposit.call()?, &mut log)
                .await?;
            self.complete(milestone, SetupState::default(), &mut log)?;
        }

        // Send liquidity through the protocol's own bridge
        if !self.skip(&state, Milestone::SendToL2, &mut log) {
            let milestone = Milestone::SendToL2;
            if mint_test_tokens {
                self.mint(l1, plan.l1_canonical_token, deployer, amount, milestone, &mut log)
                    .await?;
            }
            self.approve(l1, plan.l1_canonical_token, plan.l1_bridge, amount, milestone, &mut log)
                .await?;

            let call = ContractCall::new(
                plan.l1_bridge,
                IL1Bridge::sendToL2Call {
                    chainId: plan.l2_chain_id.as_u256(),
                    recipient: deployer,
                    amount,
                    amountOutMin: U256::ZERO,
                    deadline: U256::ZERO,
                    relayer: Address::ZERO,
                    relayerFee: U256::ZERO,
                },
            );
            self.send_call(l1, milestone, SignerRole::Deployer, call, &mut log)
                .await?;
            self.complete(milestone, SetupState::default(), &mut log)?;
        }

        if !self.skip(&state, Milestone::Complete, &mut log) {
            self.complete(
                Milestone::Complete,
                SetupState {
                    l1_messenger_wrapper_address: Some(wrapper),
                    ..SetupState::default()
                },
                &mut log,
            )?;
        }

        tracing::info!(
            %wrapper,
            executed = log.executed.len(),
            skipped = log.skipped.len(),
            "L1 setup complete"
        );

        Ok(SetupOutcome {
            family: plan.family,
            messenger_wrapper: wrapper,
            executed: log.executed,
            skipped: log.skipped,
            transactions: log.transactions,
        })
    }

    /// Run the L2 side: register chain ids on the L2 bridge, mint hop tokens
    /// on test networks and seed the hop token AMM.
    pub async fn run_l2(&self) -> Result<L2SetupOutcome> {
        let state = self.store.read()?;
        let plan = L2SetupPlan::from_state(&state, self.protocol)?;
        let l2 = self
            .clients
            .l2
            .as_ref()
            .ok_or_else(|| DeployError::invalid("L2 setup needs an L2 client"))?;
        let provider = l2.signer(SignerRole::Deployer)?;
        l2.signer(SignerRole::Governance)?;

        tracing::info!(
            l2_chain_id = %plan.l2_chain_id,
            family = %plan.family,
            router = %plan.router,
            completed = state.completed.len(),
            "Starting L2 setup"
        );

        let mut log = RunLog::default();
        let amount = plan.amm_amount;

        if !self.skip(&state, Milestone::L2ActiveChainIds, &mut log) {
            let message = AdminMessage::AddActiveChainIds(self.protocol.chains.all_chain_ids());
            let call = ContractCall {
                to: plan.l2_bridge,
                data: message.encode(),
            };
            self.send_call(l2, Milestone::L2ActiveChainIds, SignerRole::Governance, call, &mut log)
                .await?;
            self.complete(Milestone::L2ActiveChainIds, SetupState::default(), &mut log)?;
        }

        // Stands in for the L1 deposit when no watcher relays it
        let mint_h_tokens = !plan.l1_network.is_mainnet();
        if mint_h_tokens && !self.skip(&state, Milestone::L2MintHTokens, &mut log) {
            let milestone = Milestone::L2MintHTokens;
            self.mint(l2, plan.h_token, provider, amount, milestone, &mut log)
                .await?;
            self.complete(milestone, SetupState::default(), &mut log)?;
        }

        if !self.skip(&state, Milestone::L2AddLiquidity, &mut log) {
            let milestone = Milestone::L2AddLiquidity;
            self.approve(l2, plan.l2_canonical_token, plan.router, amount, milestone, &mut log)
                .await?;
            self.approve(l2, plan.h_token, plan.router, amount, milestone, &mut log)
                .await?;

            let call = ContractCall::new(
                plan.router,
                IUniswapRouter::addLiquidityCall {
                    tokenA: plan.h_token,
                    tokenB: plan.l2_canonical_token,
                    amountADesired: amount,
                    amountBDesired: amount,
                    amountAMin: U256::ZERO,
                    amountBMin: U256::ZERO,
                    to: provider,
                    deadline: U256::MAX,
                },
            );
            self.send_call(l2, milestone, SignerRole::Deployer, call, &mut log)
                .await?;
            self.complete(milestone, SetupState::default(), &mut log)?;
        }

        tracing::info!(
            executed = log.executed.len(),
            skipped = log.skipped.len(),
            "L2 setup complete"
        );

        Ok(L2SetupOutcome {
            family: plan.family,
            executed: log.executed,
            skipped: log.skipped,
            transactions: log.transactions,
        })
    }

    fn skip(&self, state: &SetupState, milestone: Milestone, log: &mut RunLog) -> bool {
        let done = state.is_completed(milestone);
        if done {
            tracing::warn!(milestone = %milestone, "Skipping milestone completed by an earlier run");
            log.skipped.push(milestone);
        }
        done
    }

    fn complete(&self, milestone: Milestone, patch: SetupState, log: &mut RunLog) -> Result<()> {
        let mut patch = patch;
        patch.completed.insert(milestone);
        self.store.write(&patch)?;
        log.executed.push(milestone);
        tracing::info!(milestone = %milestone, "Milestone complete");
        Ok(())
    }

    async fn mint(
        &self,
        client: &C,
        token: Address,
        account: Address,
        amount: U256,
        milestone: Milestone,
        log: &mut RunLog,
    ) -> Result<TxReceipt> {
        let call = ContractCall::new(token, IMintableERC20::mintCall { account, amount });
        tracing::debug!(%token, %amount, chain = client.name(), "Minting test tokens");
        self.send_call(client, milestone, SignerRole::Deployer, call, log)
            .await
    }

    async fn approve(
        &self,
        client: &C,
        token: Address,
        spender: Address,
        amount: U256,
        milestone: Milestone,
        log: &mut RunLog,
    ) -> Result<TxReceipt> {
        let call = ContractCall::new(token, IMintableERC20::approveCall { spender, amount });
        tracing::debug!(%token, %spender, chain = client.name(), "Approving token spender");
        self.send_call(client, milestone, SignerRole::Deployer, call, log)
            .await
    }

    async fn send_call(
        &self,
        client: &C,
        milestone: Milestone,
        from: SignerRole,
        call: ContractCall,
        log: &mut RunLog,
    ) -> Result<TxReceipt> {
        self.send(
            client,
            milestone.description(),
            TxRequest::call(from, call.to, call.data),
            log,
        )
        .await
    }

    /// Fetch a gas price, submit, wait for one confirmation, then pause.
    async fn send(
        &self,
        client: &C,
        step: &str,
        tx: TxRequest,
        log: &mut RunLog,
    ) -> Result<TxReceipt> {
        let chain = client.name();
        let gas_price = client
            .gas_price()
            .await
            .map_err(|e| DeployError::tx_failed(chain, step, e))?;
        let pending = client
            .submit(tx.with_gas_price(gas_price))
            .await
            .map_err(|e| DeployError::tx_failed(chain, step, e))?;

        let timeout_secs = self.config.confirmation_timeout_secs;
        let receipt = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            client.wait_for_confirmation(pending),
        )
        .await
        .map_err(|_| DeployError::ConfirmationTimeout {
            chain: chain.to_string(),
            step: step.to_string(),
            tx_hash: pending.tx_hash,
            timeout_secs,
        })?
        .map_err(|e| DeployError::tx_failed(chain, step, e))?;

        if !receipt.success {
            return Err(DeployError::tx_failed(
                chain,
                step,
                format!(
                    "transaction {} reverted in block {}",
                    receipt.tx_hash, receipt.block_number
                ),
            )
            .into());
        }

        tracing::info!(
            chain,
            step,
            tx_hash = %receipt.tx_hash,
            block = receipt.block_number,
            "Transaction confirmed"
        );
        log.transactions.push(receipt.tx_hash);

        tokio::time::sleep(Duration::from_secs(self.config.step_delay_secs)).await;
        Ok(receipt)
    }
}

/// Creation payload of the messenger wrapper for the given state, without sending anything.
pub fn wrapper_deploy_data<F: ContractFactory>(
    state: &SetupState,
    protocol: &ProtocolConfig,
    factory: &F,
) -> Result<Bytes> {
    let plan = SetupPlan::from_state(state, protocol)?;
    let resolver = ParameterResolver::new(
        &protocol.chains,
        &protocol.address_book,
        &protocol.messenger,
    );
    let params = resolver.resolve_wrapper_args(&plan.wrapper_request())?.to_params();
    factory.deploy_data(ContractKind::MessengerWrapper(plan.family), &params)
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::address;

    use super::*;
    use crate::chain::ids;

    fn optimism_state() -> SetupState {
        SetupState {
            l1_chain_id: Some(ids::KOVAN),
            l2_chain_id: Some(ids::OPTIMISM_TESTNET_1),
            l1_bridge_address: Some(address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")),
            l2_bridge_address: Some(address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")),
            l1_messenger_address: Some(address!("cccccccccccccccccccccccccccccccccccccccc")),
            l1_token_bridge_address: Some(address!("dddddddddddddddddddddddddddddddddddddddd")),
            l1_canonical_token_address: Some(address!("1111111111111111111111111111111111111111")),
            l2_canonical_token_address: Some(address!("2222222222222222222222222222222222222222")),
            l2_amm_wrapper_address: Some(address!("3333333333333333333333333333333333333333")),
            liquidity_provider_send_amount: Some(U256::from(1_000u64)),
            ..SetupState::default()
        }
    }

    #[test]
    fn test_plan_from_complete_state() {
        let plan = SetupPlan::from_state(&optimism_state(), &ProtocolConfig::default()).unwrap();
        assert_eq!(plan.family, L2Family::Optimism);
        assert_eq!(plan.l1_network, L1Network::Kovan);
        assert_eq!(
            plan.deposit_spender(&AddressBook::standard()).unwrap(),
            address!("dddddddddddddddddddddddddddddddddddddddd")
        );
        let wrapper = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
        assert_eq!(plan.l1_bridge_caller(wrapper), wrapper);
    }

    #[test]
    fn test_plan_names_missing_key() {
        let mut state = optimism_state();
        state.l2_amm_wrapper_address = None;
        let err = SetupPlan::from_state(&state, &ProtocolConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: l2AmmWrapperAddress is not set");
    }

    #[test]
    fn test_plan_polygon_requires_proxy() {
        let mut state = optimism_state();
        state.l1_chain_id = Some(ids::GOERLI);
        state.l2_chain_id = Some(ids::POLYGON_MUMBAI);
        state.l2_messenger_proxy_address = Some(Address::ZERO);

        let err = SetupPlan::from_state(&state, &ProtocolConfig::default()).unwrap_err();
        assert!(matches!(err, DeployError::MissingProxyAddress { chain } if chain == ids::POLYGON_MUMBAI));

        let proxy = address!("4444444444444444444444444444444444444444");
        state.l2_messenger_proxy_address = Some(proxy);
        let plan = SetupPlan::from_state(&state, &ProtocolConfig::default()).unwrap();
        assert_eq!(plan.l1_messenger, None);
        assert_eq!(plan.l1_bridge_caller(proxy), plan.l1_bridge);

        let book = AddressBook::standard();
        assert_eq!(
            plan.deposit_spender(&book).unwrap(),
            book.polygon(L1Network::Goerli).unwrap().mintable_erc20_predicate
        );
    }

    #[test]
    fn test_plan_polygon_on_kovan_fails_closed() {
        let mut state = optimism_state();
        state.l2_chain_id = Some(ids::POLYGON_MUMBAI);
        state.l2_messenger_proxy_address = Some(address!("4444444444444444444444444444444444444444"));

        let err = SetupPlan::from_state(&state, &ProtocolConfig::default()).unwrap_err();
        assert!(matches!(err, DeployError::UnsupportedNetwork { .. }));
    }

    #[test]
    fn test_plan_rejects_swapped_chains() {
        let mut state = optimism_state();
        state.l1_chain_id = Some(ids::OPTIMISM_TESTNET_1);
        state.l2_chain_id = Some(ids::KOVAN);
        let err = SetupPlan::from_state(&state, &ProtocolConfig::default()).unwrap_err();
        assert!(matches!(err, DeployError::InvalidArgument(_)));

        state.l1_chain_id = Some(ChainId::from_u64(31337));
        let err = SetupPlan::from_state(&state, &ProtocolConfig::default()).unwrap_err();
        assert!(matches!(err, DeployError::UnknownChain(_)));
    }

    #[test]
    fn test_l2_plan_pairs_bridge_when_no_h_token() {
        let mut state = optimism_state();
        let router = address!("5555555555555555555555555555555555555555");
        state.l2_uniswap_router_address = Some(router);
        state.liquidity_provider_amm_amount = Some(U256::from(500u64));

        let plan = L2SetupPlan::from_state(&state, &ProtocolConfig::default()).unwrap();
        assert_eq!(plan.h_token, address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));
        assert_eq!(plan.router, router);
        assert_eq!(plan.amm_amount, U256::from(500u64));

        let h_token = address!("6666666666666666666666666666666666666666");
        state.l2_h_token_address = Some(h_token);
        let plan = L2SetupPlan::from_state(&state, &ProtocolConfig::default()).unwrap();
        assert_eq!(plan.h_token, h_token);
    }

    #[test]
    fn test_l2_plan_names_missing_router() {
        let mut state = optimism_state();
        state.liquidity_provider_amm_amount = Some(U256::from(500u64));
        let err = L2SetupPlan::from_state(&state, &ProtocolConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: l2UniswapRouterAddress is not set");
    }
}
