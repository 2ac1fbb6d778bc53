//! Optional TOML configuration.
//!
//! Every setting falls back to the SDK defaults. Command line flags take
//! precedence over the file.
//!
//! ```toml
//! network = "testnet"
//! rpc = "https://dream-rpc.somnia.network"
//!
//! [[tokens]]
//! symbol = "WETH"
//! address = "0x..."
//! decimals = 18
//!
//! [gas]
//! margin_percent = 25
//!
//! [poll]
//! timeout_secs = 60
//!
//! [orders]
//! market_slippage = "0.005"
//! ```

use std::{path::Path, time::Duration};

use alloy::primitives::Address;
use anyhow::Context;
use fastnum::{UD64, udec64};
use serde::Deserialize;
use standard_sdk::{
    Chain,
    connector::ConnectorConfig,
    tx::{GasPolicy, PollPolicy},
    types::Token,
};
use tracing::debug;

use crate::args::Network;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub network: Option<Network>,
    pub rpc: Option<String>,
    pub rpc_throttle: Option<u32>,
    /// Overrides the exchange address of the network.
    pub exchange: Option<String>,
    /// Added to, or replacing, the tokens of the network.
    pub tokens: Vec<TokenConfig>,
    pub gas: GasConfig,
    pub poll: PollConfig,
    pub orders: OrdersConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
    #[serde(default)]
    pub native: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GasConfig {
    pub margin_percent: Option<u64>,
    pub min_gas_limit: Option<u64>,
    pub fallback_gas_limit: Option<u64>,
    pub fallback_gas_price_gwei: Option<u64>,
    pub gas_price_ttl_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    pub interval_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrdersConfig {
    pub confirm_in_lock: Option<bool>,
    pub is_maker: Option<bool>,
    /// Decimal string, e.g. "0.003".
    pub market_slippage: Option<String>,
}

impl Config {
    /// Reads `path`, or returns the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> { Ok(toml::from_str(content)?) }

    /// Deployment of `network` with the configured overrides.
    pub fn chain(&self, network: Network) -> anyhow::Result<Chain> {
        let mut chain = network.chain();
        if let Some(exchange) = &self.exchange {
            let exchange: Address = exchange.parse().context("parsing exchange address")?;
            chain = Chain::custom(
                chain.chain_id(),
                exchange,
                chain.tokens().to_vec(),
                chain.price_decimals(),
                chain.max_matches(),
            );
        }
        for token in &self.tokens {
            let address: Address = token
                .address
                .parse()
                .with_context(|| format!("parsing address of token {}", token.symbol))?;
            chain = chain.with_token(if token.native {
                Token::native(token.symbol.clone(), address, token.decimals)
            } else {
                Token::new(token.symbol.clone(), address, token.decimals)
            });
        }
        Ok(chain)
    }

    pub fn connector(&self) -> anyhow::Result<ConnectorConfig> {
        let defaults = ConnectorConfig::default();
        let gas = GasPolicy {
            margin_percent: self.gas.margin_percent.unwrap_or(defaults.gas.margin_percent),
            min_gas_limit: self.gas.min_gas_limit.unwrap_or(defaults.gas.min_gas_limit),
            fallback_gas_limit: self
                .gas
                .fallback_gas_limit
                .unwrap_or(defaults.gas.fallback_gas_limit),
            fallback_gas_price: self
                .gas
                .fallback_gas_price_gwei
                .map_or(defaults.gas.fallback_gas_price, |gwei| u128::from(gwei) * 1_000_000_000),
            gas_price_ttl: self
                .gas
                .gas_price_ttl_secs
                .map_or(defaults.gas.gas_price_ttl, Duration::from_secs),
        };
        let poll = PollPolicy {
            interval: self.poll.interval_ms.map_or(defaults.poll.interval, Duration::from_millis),
            timeout: self.poll.timeout_secs.map_or(defaults.poll.timeout, Duration::from_secs),
        };
        let market_slippage = match &self.orders.market_slippage {
            Some(slippage) => slippage
                .parse::<UD64>()
                .map_err(|err| anyhow::anyhow!("invalid market slippage {slippage}: {err}"))?,
            None => defaults.market_slippage,
        };
        anyhow::ensure!(
            market_slippage < udec64!(1),
            "market slippage {market_slippage} must be below 1"
        );
        Ok(ConnectorConfig {
            gas,
            poll,
            confirm_in_lock: self.orders.confirm_in_lock.unwrap_or(defaults.confirm_in_lock),
            is_maker: self.orders.is_maker.unwrap_or(defaults.is_maker),
            market_slippage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.connector().unwrap(), ConnectorConfig::default());
        let chain = config.chain(Network::Testnet).unwrap();
        assert_eq!(chain.chain_id(), 50312);
        assert_eq!(chain.exchange(), Chain::testnet().exchange());
    }

    #[test]
    fn test_overrides() {
        let config = Config::parse(
            r#"
            network = "mainnet"
            exchange = "0x00000000000000000000000000000000000000aa"

            [[tokens]]
            symbol = "WETH"
            address = "0x00000000000000000000000000000000000000bb"
            decimals = 18

            [gas]
            fallback_gas_price_gwei = 5

            [poll]
            interval_ms = 250
            timeout_secs = 10

            [orders]
            confirm_in_lock = true
            market_slippage = "0.01"
            "#,
        )
        .unwrap();
        assert_eq!(config.network, Some(Network::Mainnet));

        let chain = config.chain(Network::Mainnet).unwrap();
        assert_eq!(chain.chain_id(), 5031);
        assert_eq!(chain.exchange(), Address::with_last_byte(0xaa));
        assert_eq!(chain.token("weth").unwrap().decimals(), 18);
        assert!(chain.token("SOMI").is_some());

        let connector = config.connector().unwrap();
        assert_eq!(connector.gas.fallback_gas_price, 5_000_000_000);
        assert_eq!(connector.gas.margin_percent, 20);
        assert_eq!(connector.poll.interval, Duration::from_millis(250));
        assert_eq!(connector.poll.timeout, Duration::from_secs(10));
        assert!(connector.confirm_in_lock);
        assert_eq!(connector.market_slippage, udec64!(0.01));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(Config::parse("rpc_url = \"http://localhost:8545\"").is_err());
        let bad = Config::parse("[orders]\nmarket_slippage = \"lots\"").unwrap();
        assert!(bad.connector().is_err());
        let bad = Config::parse("[orders]\nmarket_slippage = \"1.5\"").unwrap();
        assert!(bad.connector().is_err());
    }
}
