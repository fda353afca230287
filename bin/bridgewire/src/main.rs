//! bridgewire wires a token bridge to the canonical messenger of an L2 network.

mod cli;

use std::path::{Path, PathBuf};

use alloy_core::{hex, primitives::Address};
use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use strum::IntoEnumIterator;

use bridgewire_deploy::{
    ArtifactFactory, CONFIG_FILENAME, ChainClients, ConfigStore, DeployConfig, DeploymentParameters,
    JsonFileStore, L2BridgeRequest, Milestone, Orchestrator, ParameterResolver, PlanRequest,
    RpcChainClient, SetupState, SignerRole, WrapperRequest, store::require,
};
use cli::{ArgsTarget, Cli, Command};

/// Resolve the config argument to a file path.
fn config_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(CONFIG_FILENAME)
    } else {
        path.to_path_buf()
    }
}

/// Layer built-in defaults, the TOML file and `BRIDGEWIRE_*` environment variables.
fn load_config(path: &Path) -> Result<DeployConfig> {
    Figment::from(Serialized::defaults(DeployConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BRIDGEWIRE_").split("__"))
        .extract()
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config_path = config_file(&cli.config);
    let mut config = load_config(&config_path)?;
    if let Some(state) = cli.state {
        config.state_path = state;
    }
    let store = JsonFileStore::new(config.state_path.clone());

    match cli.command {
        Command::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists, pass --force to overwrite it",
                    config_path.display()
                );
            }
            config.save_to_file(&config_path)?;
        }
        Command::Classify { chain_id } => {
            let family = config.protocol.chains.classify(chain_id)?;
            println!("{family}");
        }
        Command::Plan {
            l1_network,
            l2_network,
            token,
            bonder,
            l1_bridge,
        } => {
            let patch = config.protocol.catalog().plan(&PlanRequest {
                l1_network,
                l2_network,
                token,
                bonder,
                l1_bridge,
            })?;
            let state = store.write(&patch)?;

            tracing::info!(
                state_path = %store.path().display(),
                l1_chain_id = ?state.l1_chain_id,
                l2_chain_id = ?state.l2_chain_id,
                "Setup state seeded from the network catalog"
            );
            println!("{}", state_table(&state)?);
        }
        Command::Args {
            target,
            governance,
            abi,
        } => {
            let state = store.read()?;
            let params = resolve_args(&config, &state, target, governance)?;
            if abi {
                println!("{}", hex::encode_prefixed(params.abi_encode()));
            } else {
                println!("{params}");
            }
        }
        Command::SetupL1 => setup_l1(&config, store).await?,
        Command::SetupL2 { router } => {
            if let Some(router) = router {
                store.write(&SetupState {
                    l2_uniswap_router_address: Some(router),
                    ..SetupState::default()
                })?;
            }
            setup_l2(&config, store).await?
        }
        Command::Status => {
            let state = store.read()?;
            println!("{}", state_table(&state)?);
            println!("{}", milestone_table(&state));
        }
    }

    Ok(())
}

async fn setup_l1(config: &DeployConfig, store: JsonFileStore) -> Result<()> {
    let state = store.read()?;
    let l1_chain_id = require(state.l1_chain_id, "l1ChainId")?;
    let l2_chain_id = require(state.l2_chain_id, "l2ChainId")?;

    let l1 = RpcChainClient::new(config.l1_client()?.clone())?;
    let clients = match config.l2_client(l1_chain_id, l2_chain_id)? {
        Some(l2) => ChainClients::with_l2(l1, RpcChainClient::new(l2.clone())?),
        None => ChainClients::l1_only(l1),
    };
    let factory = ArtifactFactory::new(config.artifacts_dir.clone());

    let outcome = Orchestrator::new(
        &config.protocol,
        config.orchestrator,
        clients,
        factory,
        store,
    )
    .run()
    .await?;

    tracing::info!(
        family = %outcome.family,
        messenger_wrapper = %outcome.messenger_wrapper,
        transactions = outcome.transactions.len(),
        "L1 setup finished"
    );
    println!("{}", outcome.messenger_wrapper);
    Ok(())
}

async fn setup_l2(config: &DeployConfig, store: JsonFileStore) -> Result<()> {
    let l1 = RpcChainClient::new(config.l1_client()?.clone())?;
    let l2 = RpcChainClient::new(config.require_l2_client()?.clone())?;
    let factory = ArtifactFactory::new(config.artifacts_dir.clone());

    let outcome = Orchestrator::new(
        &config.protocol,
        config.orchestrator,
        ChainClients::with_l2(l1, l2),
        factory,
        store,
    )
    .run_l2()
    .await?;

    tracing::info!(
        family = %outcome.family,
        executed = outcome.executed.len(),
        skipped = outcome.skipped.len(),
        transactions = outcome.transactions.len(),
        "L2 setup finished"
    );
    Ok(())
}

fn resolve_args(
    config: &DeployConfig,
    state: &SetupState,
    target: ArgsTarget,
    governance: Option<Address>,
) -> Result<DeploymentParameters> {
    let protocol = &config.protocol;
    let resolver = ParameterResolver::new(&protocol.chains, &protocol.address_book, &protocol.messenger);
    let l1_chain_id = require(state.l1_chain_id, "l1ChainId")?;
    let l2_chain_id = require(state.l2_chain_id, "l2ChainId")?;
    let l1_bridge = require(state.l1_bridge_address, "l1BridgeAddress")?;

    let params = match target {
        ArgsTarget::Wrapper => resolver
            .resolve_wrapper_args(&WrapperRequest {
                l1_chain_id,
                l2_chain_id,
                l1_bridge,
                l2_bridge: require(state.l2_bridge_address, "l2BridgeAddress")?,
                l1_messenger: state.l1_messenger_address,
                l2_tunnel: state.l2_messenger_proxy_address,
                fx_root_override: state.fx_root_address,
            })?
            .to_params(),
        ArgsTarget::L2Bridge => {
            let governance = match governance {
                Some(governance) => governance,
                None => config
                    .l1_client()?
                    .signers
                    .get(&SignerRole::Governance)
                    .copied()
                    .context("No governance address given and no governance signer configured")?,
            };
            resolver
                .resolve_l2_bridge_args(&L2BridgeRequest {
                    l1_chain_id,
                    l2_chain_id,
                    l2_messenger: require(state.l2_messenger_address, "l2MessengerAddress")?,
                    l2_messenger_proxy: state.l2_messenger_proxy_address,
                    governance,
                    h_token: require(state.l2_h_token_address, "l2HopBridgeTokenAddress")?,
                    l1_bridge,
                    active_chain_ids: protocol.chains.all_chain_ids(),
                    bonders: state.bonder_address.into_iter().collect(),
                })?
                .to_params()
        }
    };

    Ok(params)
}

/// Every set field of the state, keyed by its persisted name.
fn state_table(state: &SetupState) -> Result<Table> {
    let value = serde_json::to_value(state).context("Failed to encode setup state")?;
    let mut table = Table::new();
    table.set_header(vec!["Key", "Value"]);

    if let serde_json::Value::Object(fields) = value {
        for (key, value) in fields {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Array(items) if key == "completed" => {
                    format!("{} milestones", items.len())
                }
                other => other.to_string(),
            };
            table.add_row(vec![key, value]);
        }
    }
    Ok(table)
}

fn milestone_table(state: &SetupState) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Milestone", "Step", "Done"]);
    for milestone in Milestone::iter() {
        let done = if state.is_completed(milestone) { "yes" } else { "no" };
        table.add_row(vec![
            milestone.to_string(),
            milestone.description().to_string(),
            done.to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use bridgewire_deploy::chain::ids;
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = TempDir::new("bridgewire-cli").unwrap();
        let config = load_config(&config_file(dir.path())).unwrap();
        assert_eq!(config.orchestrator, DeployConfig::default().orchestrator);
        assert_eq!(config.protocol, DeployConfig::default().protocol);
    }

    #[test]
    fn test_load_config_reads_toml() {
        let dir = TempDir::new("bridgewire-cli").unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "state_path = \"custom-state.json\"\n\n[orchestrator]\nstep_delay_secs = 1\n",
        )
        .unwrap();

        let config = load_config(&config_file(dir.path())).unwrap();
        assert_eq!(config.state_path, PathBuf::from("custom-state.json"));
        assert_eq!(config.orchestrator.step_delay_secs, 1);
        assert_eq!(config.orchestrator.confirmation_timeout_secs, 300);
    }

    #[test]
    fn test_state_table_lists_set_fields() {
        let mut state = SetupState {
            l1_chain_id: Some(ids::KOVAN),
            ..SetupState::default()
        };
        state.completed.insert(Milestone::DeployWrapper);

        let rendered = state_table(&state).unwrap().to_string();
        assert!(rendered.contains("l1ChainId"));
        assert!(rendered.contains("42"));
        assert!(rendered.contains("1 milestones"));
        assert!(!rendered.contains("l2ChainId"));

        let rendered = milestone_table(&state).to_string();
        assert!(rendered.contains("deploy-wrapper"));
        assert!(rendered.contains("send-to-l2"));
        assert!(rendered.contains("l2-add-liquidity"));
    }

    #[test]
    fn test_wrapper_args_need_bridge_addresses() {
        let state = SetupState {
            l1_chain_id: Some(ids::KOVAN),
            l2_chain_id: Some(ids::OPTIMISM_TESTNET_1),
            ..SetupState::default()
        };
        let err = resolve_args(&DeployConfig::default(), &state, ArgsTarget::Wrapper, None)
            .unwrap_err();
        assert!(err.to_string().contains("l1BridgeAddress is not set"));
    }
}
