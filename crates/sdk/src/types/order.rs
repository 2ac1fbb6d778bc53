use std::{fmt::Display, str::FromStr};

use fastnum::{UD64, udec64};

use crate::error::DexError;

/// Side of the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Ask,
    Bid,
}

impl OrderSide {
    /// `isBid` flag of the matching engine entry points.
    pub fn is_bid(&self) -> bool { matches!(self, OrderSide::Bid) }
}

impl Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            match self {
                OrderSide::Ask => write!(f, "Sell"),
                OrderSide::Bid => write!(f, "Buy"),
            }
        } else {
            match self {
                OrderSide::Ask => write!(f, "Ask"),
                OrderSide::Bid => write!(f, "Bid"),
            }
        }
    }
}

impl FromStr for OrderSide {
    type Err = DexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" | "bid" => Ok(OrderSide::Bid),
            "sell" | "ask" => Ok(OrderSide::Ask),
            _ => Err(DexError::InvalidArgument(format!("invalid order side: {}", s))),
        }
    }
}

/// Type of the order.
///
/// The matching engine only accepts limit orders. A market order is sent as a
/// limit order priced through the book by the configured slippage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    /// Default slippage applied to market orders, 0.3%.
    pub const DEFAULT_SLIPPAGE: UD64 = udec64!(0.003);
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Limit => write!(f, "Limit"),
            OrderType::Market => write!(f, "Market"),
        }
    }
}
