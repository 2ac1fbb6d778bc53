mod order;
mod request;
mod tx;

use std::{fmt::Display, str::FromStr};

use alloy::primitives::Address;
pub use order::{OrderSide, OrderType};
pub use request::OrderRequest;
pub use tx::{CallRequest, Receipt, TxRequest};

use crate::{error::DexError, num};

/// Host-assigned order identifier, unique per connector instance.
pub type ClientOrderId = String;

/// Order id assigned by the matching engine, unique per order book side.
/// The contract stores it as `uint32`.
pub type OrderId = u64;

/// Token traded on the exchange.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    symbol: String,
    address: Address,
    decimals: u8,
    native: bool,
}

impl Token {
    /// ERC-20 token.
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self { symbol: symbol.into(), address, decimals, native: false }
    }

    /// Chain native token. Orders spending it attach value instead of
    /// transferring an ERC-20 amount; `address` is the wrapped token the order
    /// book is keyed by.
    pub fn native(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Self { symbol: symbol.into(), address, decimals, native: true }
    }

    pub fn symbol(&self) -> &str { &self.symbol }

    pub fn address(&self) -> Address { self.address }

    pub fn decimals(&self) -> u8 { self.decimals }

    pub fn is_native(&self) -> bool { self.native }

    pub fn converter(&self) -> num::Converter { num::Converter::new(self.decimals) }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{} ({})", self.symbol, self.address)
        } else {
            write!(f, "{}", self.symbol)
        }
    }
}

/// Trading pair as named by the host, `BASE-QUOTE`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self { base: base.into(), quote: quote.into() }
    }

    pub fn base(&self) -> &str { &self.base }

    pub fn quote(&self) -> &str { &self.quote }
}

impl Display for TradingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = DexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((base, quote))
                if !base.is_empty() && !quote.is_empty() && !base.eq_ignore_ascii_case(quote) =>
            {
                Ok(Self::new(base.to_uppercase(), quote.to_uppercase()))
            },
            _ => Err(DexError::InvalidArgument(format!("invalid trading pair: {}", s))),
        }
    }
}

impl TryFrom<String> for TradingPair {
    type Error = DexError;

    fn try_from(value: String) -> Result<Self, Self::Error> { TradingPair::from_str(&value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trading_pair_from_str() {
        let pair: TradingPair = "stt-USDC".parse().unwrap();
        assert_eq!(pair.base(), "STT");
        assert_eq!(pair.quote(), "USDC");
        assert_eq!(pair.to_string(), "STT-USDC");

        assert!("STT".parse::<TradingPair>().is_err());
        assert!("USDC-USDC".parse::<TradingPair>().is_err());
        assert!("-USDC".parse::<TradingPair>().is_err());
    }
}
