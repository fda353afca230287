use std::path::PathBuf;

use alloy_core::primitives::Address;
use bridgewire_deploy::{CONFIG_FILENAME, ChainId};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// Which positional argument list `args` resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ArgsTarget {
    /// Constructor arguments of the L1 messenger wrapper.
    Wrapper,
    /// Initializer arguments of the L2 bridge.
    L2Bridge,
}

#[derive(Parser)]
#[command(name = "bridgewire")]
#[command(
    author,
    version,
    about = "Wire a token bridge to the canonical messenger of an L2 network"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "BRIDGEWIRE_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Bridgewire.toml configuration file, or a directory containing one.
    ///
    /// A missing file is not an error: built-in defaults and `BRIDGEWIRE_*`
    /// environment variables are used instead.
    #[arg(long, alias = "conf", global = true, env = "BRIDGEWIRE_CONFIG", default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Override the setup state file configured in `state_path`.
    #[arg(long, global = true, env = "BRIDGEWIRE_STATE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the effective configuration to the config path.
    Init {
        /// Overwrite an existing configuration file.
        #[arg(long)]
        force: bool,
    },

    /// Print the messaging family of a chain ID.
    Classify {
        /// Decimal or 0x-prefixed chain ID.
        chain_id: ChainId,
    },

    /// Seed the setup state from the network catalog.
    Plan {
        /// L1 network name (mainnet, goerli, kovan).
        #[arg(long, alias = "l1", env = "BRIDGEWIRE_L1_NETWORK")]
        l1_network: String,

        /// L2 network name as listed in the catalog (e.g. optimism, arbitrum, sokol).
        #[arg(long, alias = "l2", env = "BRIDGEWIRE_L2_NETWORK")]
        l2_network: String,

        /// Token symbol as listed under the L2 network.
        #[arg(long, env = "BRIDGEWIRE_TOKEN")]
        token: String,

        /// Bonder address. Defaults to the zero address.
        #[arg(long, env = "BRIDGEWIRE_BONDER")]
        bonder: Option<String>,

        /// Address of the already deployed L1 bridge.
        #[arg(long, env = "BRIDGEWIRE_L1_BRIDGE")]
        l1_bridge: Option<Address>,
    },

    /// Resolve and print a positional argument list without sending anything.
    Args {
        /// `wrapper` or `l2-bridge`.
        target: ArgsTarget,

        /// Governance address for the L2 bridge. Defaults to the configured L1 governance signer.
        #[arg(long)]
        governance: Option<Address>,

        /// Print the ABI-encoded tuple instead of the readable list.
        #[arg(long)]
        abi: bool,
    },

    /// Run the L1 setup sequence, resuming after the last completed milestone.
    SetupL1,

    /// Register chain ids on the L2 bridge and seed the hop token AMM.
    SetupL2 {
        /// Uniswap-style router on L2. Persisted as `l2UniswapRouterAddress`.
        #[arg(long, env = "BRIDGEWIRE_L2_ROUTER")]
        router: Option<Address>,
    },

    /// Print the persisted setup state and milestone markers.
    Status,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_args_target() {
        let cli = Cli::try_parse_from(["bridgewire", "args", "l2-bridge", "--abi"]).unwrap();
        match cli.command {
            Command::Args { target, abi, .. } => {
                assert_eq!(target, ArgsTarget::L2Bridge);
                assert!(abi);
            }
            _ => panic!("expected args command"),
        }
    }

    #[test]
    fn test_parse_setup_l2_router() {
        let cli = Cli::try_parse_from([
            "bridgewire",
            "setup-l2",
            "--router",
            "0x5555555555555555555555555555555555555555",
        ])
        .unwrap();
        match cli.command {
            Command::SetupL2 { router } => assert_eq!(
                router,
                Some(Address::repeat_byte(0x55))
            ),
            _ => panic!("expected setup-l2 command"),
        }
    }

    #[test]
    fn test_parse_classify_hex_chain_id() {
        let cli = Cli::try_parse_from(["bridgewire", "classify", "0x45"]).unwrap();
        match cli.command {
            Command::Classify { chain_id } => assert_eq!(chain_id, ChainId::from_u64(69)),
            _ => panic!("expected classify command"),
        }
    }
}
