use std::path::PathBuf;

use alloy::primitives::TxHash;
use clap::{Parser, Subcommand, ValueEnum};
use fastnum::UD64;
use serde::Deserialize;
use standard_sdk::{
    Chain,
    types::{OrderId, OrderSide, TradingPair},
};

pub(crate) const DEFAULT_RPC_THROTTLING: u32 = 15;

/// Environment variable holding the hex encoded signing key.
pub(crate) const PRIVATE_KEY_ENV: &str = "STANDARD_PRIVATE_KEY";

#[derive(Parser, Debug)]
#[command(name = "standard-cli", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// RPC endpoint to connect to [default: public endpoint of the network]
    #[arg(long, global = true)]
    pub rpc: Option<String>,

    /// Deployment to operate on [default: testnet]
    #[arg(long, global = true)]
    pub network: Option<Network>,

    /// RPC throttling (req/sec) [default: 15 for public endpoints and none
    /// for custom]
    #[arg(long, global = true)]
    pub rpc_throttle: Option<u32>,

    /// Signing key of the wallet placing and cancelling orders
    #[arg(long, global = true, env = PRIVATE_KEY_ENV, hide_env_values = true)]
    pub private_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Place an order
    Place {
        /// Trading pair as BASE-QUOTE, e.g. STT-USDC
        pair: TradingPair,
        /// buy or sell
        side: OrderSide,
        /// Amount of base token
        amount: UD64,
        /// Limit price, or reference price of a market order
        price: UD64,

        /// Cross the book at price plus/minus the configured slippage
        #[arg(long, default_value_t = false)]
        market: bool,

        /// Client order ID [default: derived from the current time]
        #[arg(long)]
        id: Option<String>,

        /// Wait for the placement to be confirmed
        #[arg(long, default_value_t = false)]
        wait: bool,
    },
    /// Cancel an order by its placement transaction and/or order ID
    Cancel {
        /// Trading pair as BASE-QUOTE
        pair: TradingPair,
        /// buy or sell
        side: OrderSide,

        /// Placement transaction, used to look up the order ID
        #[arg(long, required_unless_present = "order_id")]
        tx: Option<TxHash>,

        /// Order ID on the book
        #[arg(long)]
        order_id: Option<OrderId>,
    },
    /// Show the order events of a placement transaction
    Decode {
        /// Placement transaction
        #[arg(long)]
        tx: TxHash,
    },
    /// Show the pending nonce of the wallet
    Nonce,
}

/// Known deployments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    /// Public RPC endpoint.
    pub fn rpc(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.infra.mainnet.somnia.network",
            Network::Testnet => "https://dream-rpc.somnia.network",
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            Network::Mainnet => Chain::mainnet(),
            Network::Testnet => Chain::testnet(),
        }
    }
}
