use fastnum::{UD64, udec64};

use super::{OrderSide, OrderType, TradingPair};
use crate::error::DexError;

/// Order the host asks the connector to place.
///
/// `amount` is always denominated in the base token, `price` in quote per
/// base.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pair: TradingPair,
    side: OrderSide,
    r#type: OrderType,
    amount: UD64,
    price: UD64,
}

impl OrderRequest {
    pub fn new(
        pair: TradingPair,
        side: OrderSide,
        r#type: OrderType,
        amount: UD64,
        price: UD64,
    ) -> Self {
        Self { pair, side, r#type, amount, price }
    }

    pub fn limit(pair: TradingPair, side: OrderSide, amount: UD64, price: UD64) -> Self {
        Self::new(pair, side, OrderType::Limit, amount, price)
    }

    pub fn pair(&self) -> &TradingPair { &self.pair }

    pub fn side(&self) -> OrderSide { self.side }

    pub fn r#type(&self) -> OrderType { self.r#type }

    pub fn amount(&self) -> UD64 { self.amount }

    pub fn price(&self) -> UD64 { self.price }

    /// Limit price sent to the matching engine.
    ///
    /// Market orders cross the book by `slippage`: up for bids, down for asks.
    /// Slippage must be below 1.
    pub fn execution_price(&self, slippage: UD64) -> Result<UD64, DexError> {
        if self.r#type == OrderType::Market && slippage >= udec64!(1) {
            return Err(DexError::InvalidArgument(format!(
                "market slippage {slippage} must be below 1"
            )));
        }
        Ok(match (self.r#type, self.side) {
            (OrderType::Limit, _) => self.price,
            (OrderType::Market, OrderSide::Bid) => self.price * (udec64!(1) + slippage),
            (OrderType::Market, OrderSide::Ask) => self.price * (udec64!(1) - slippage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_price() {
        let pair = TradingPair::new("STT", "USDC");
        let slippage = OrderType::DEFAULT_SLIPPAGE;

        let limit = OrderRequest::limit(pair.clone(), OrderSide::Bid, udec64!(1), udec64!(100));
        assert_eq!(limit.execution_price(slippage).unwrap(), udec64!(100));

        let buy = OrderRequest::new(
            pair.clone(),
            OrderSide::Bid,
            OrderType::Market,
            udec64!(1),
            udec64!(100),
        );
        assert_eq!(buy.execution_price(slippage).unwrap(), udec64!(100.3));

        let sell =
            OrderRequest::new(pair, OrderSide::Ask, OrderType::Market, udec64!(1), udec64!(100));
        assert_eq!(sell.execution_price(slippage).unwrap(), udec64!(99.7));
        assert!(matches!(
            sell.execution_price(udec64!(1.5)),
            Err(DexError::InvalidArgument(_))
        ));
        assert!(matches!(sell.execution_price(udec64!(1)), Err(DexError::InvalidArgument(_))));

        // Slippage only applies to market orders
        assert_eq!(limit.execution_price(udec64!(1.5)).unwrap(), udec64!(100));
    }
}
