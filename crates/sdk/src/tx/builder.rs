use std::fmt::Display;

use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use fastnum::UD64;

use crate::{
    Chain,
    abi::matching_engine::MatchingEngine,
    error::DexError,
    num,
    types::{CallRequest, OrderId, OrderSide, Token},
};

/// Matching engine entry point an order is sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Bid paid in native quote, value attached.
    LimitBuyEth,
    /// Bid paid with an ERC-20 quote amount.
    LimitBuy,
    /// Ask of native base, value attached.
    LimitSellEth,
    /// Ask of an ERC-20 base amount.
    LimitSell,
}

impl EntryPoint {
    /// Selects the entry point from the side and which token is spent.
    pub fn select(side: OrderSide, base: &Token, quote: &Token) -> Self {
        match side {
            OrderSide::Bid if quote.is_native() => EntryPoint::LimitBuyEth,
            OrderSide::Bid => EntryPoint::LimitBuy,
            OrderSide::Ask if base.is_native() => EntryPoint::LimitSellEth,
            OrderSide::Ask => EntryPoint::LimitSell,
        }
    }

    pub fn selector(&self) -> [u8; 4] {
        match self {
            EntryPoint::LimitBuyEth => MatchingEngine::limitBuyETHCall::SELECTOR,
            EntryPoint::LimitBuy => MatchingEngine::limitBuyCall::SELECTOR,
            EntryPoint::LimitSellEth => MatchingEngine::limitSellETHCall::SELECTOR,
            EntryPoint::LimitSell => MatchingEngine::limitSellCall::SELECTOR,
        }
    }
}

impl Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryPoint::LimitBuyEth => write!(f, "limitBuyETH"),
            EntryPoint::LimitBuy => write!(f, "limitBuy"),
            EntryPoint::LimitSellEth => write!(f, "limitSellETH"),
            EntryPoint::LimitSell => write!(f, "limitSell"),
        }
    }
}

/// Encoded order placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderCall {
    pub entry_point: EntryPoint,
    pub request: CallRequest,
    /// Price in the engine's fixed-point precision.
    pub price: U256,
    /// Amount of the spent token in its base units.
    pub spend: U256,
}

/// Order on the book a cancellation targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelTarget {
    pub base: Address,
    pub quote: Address,
    pub side: OrderSide,
    pub order_id: OrderId,
}

impl CancelTarget {
    fn engine_order_id(&self) -> Result<u32, DexError> {
        u32::try_from(self.order_id).map_err(|_| {
            DexError::InvalidArgument(format!("order id {} out of range", self.order_id))
        })
    }
}

/// Encodes matching engine calls.
///
/// The `n` argument of the placement entry points is the maximum number of
/// resting orders the new order may match against, a protocol parameter of
/// the deployment. It is unrelated to the transaction nonce.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    exchange: Address,
    recipient: Address,
    price_converter: num::Converter,
    max_matches: u32,
    is_maker: bool,
}

impl TransactionBuilder {
    /// Builder for orders filled to `recipient`.
    pub fn new(chain: &Chain, recipient: Address) -> Self {
        Self {
            exchange: chain.exchange(),
            recipient,
            price_converter: num::Converter::new(chain.price_decimals()),
            max_matches: chain.max_matches(),
            is_maker: true,
        }
    }

    /// Whether unmatched remainders rest on the book, `true` by default.
    pub fn with_maker(mut self, is_maker: bool) -> Self {
        self.is_maker = is_maker;
        self
    }

    pub fn exchange(&self) -> Address { self.exchange }

    /// Encodes an order placement.
    ///
    /// Bids spend `amount * price` of quote, asks spend `amount` of base.
    /// Native value attached to a bid is rounded up so the order is never
    /// underfunded; all other amounts are truncated.
    pub fn build(
        &self,
        side: OrderSide,
        base: &Token,
        quote: &Token,
        amount: UD64,
        price: UD64,
    ) -> Result<OrderCall, DexError> {
        for token in [base, quote] {
            if token.address() == Address::ZERO {
                return Err(DexError::UnknownToken(token.symbol().to_string()));
            }
        }
        if base.address() == quote.address() {
            return Err(DexError::InvalidArgument(format!(
                "base and quote resolve to the same token {}",
                base.address()
            )));
        }
        if amount == UD64::ZERO || price == UD64::ZERO {
            return Err(DexError::InvalidArgument(format!(
                "amount and price must be positive, got {amount} @ {price}"
            )));
        }

        let raw_price = self.price_converter.to_unsigned(price)?;
        if raw_price.is_zero() {
            return Err(DexError::InvalidArgument(format!("price {price} below engine precision")));
        }

        let entry_point = EntryPoint::select(side, base, quote);
        let (data, spend, value) = match entry_point {
            EntryPoint::LimitBuyEth => {
                let value = quote.converter().to_unsigned_ceil(amount * price)?;
                let call = MatchingEngine::limitBuyETHCall {
                    base: base.address(),
                    price: raw_price,
                    isMaker: self.is_maker,
                    n: self.max_matches,
                    recipient: self.recipient,
                };
                (call.abi_encode(), value, value)
            },
            EntryPoint::LimitBuy => {
                let quote_amount = quote.converter().to_unsigned(amount * price)?;
                let call = MatchingEngine::limitBuyCall {
                    base: base.address(),
                    quote: quote.address(),
                    price: raw_price,
                    quoteAmount: quote_amount,
                    isMaker: self.is_maker,
                    n: self.max_matches,
                    recipient: self.recipient,
                };
                (call.abi_encode(), quote_amount, U256::ZERO)
            },
            EntryPoint::LimitSellEth => {
                let value = base.converter().to_unsigned(amount)?;
                let call = MatchingEngine::limitSellETHCall {
                    quote: quote.address(),
                    price: raw_price,
                    isMaker: self.is_maker,
                    n: self.max_matches,
                    recipient: self.recipient,
                };
                (call.abi_encode(), value, value)
            },
            EntryPoint::LimitSell => {
                let base_amount = base.converter().to_unsigned(amount)?;
                let call = MatchingEngine::limitSellCall {
                    base: base.address(),
                    quote: quote.address(),
                    price: raw_price,
                    baseAmount: base_amount,
                    isMaker: self.is_maker,
                    n: self.max_matches,
                    recipient: self.recipient,
                };
                (call.abi_encode(), base_amount, U256::ZERO)
            },
        };
        if spend.is_zero() {
            return Err(DexError::InvalidArgument(format!(
                "order {amount} @ {price} rounds to zero {}",
                if side.is_bid() { quote.symbol() } else { base.symbol() }
            )));
        }

        Ok(OrderCall {
            entry_point,
            request: CallRequest::new(self.exchange, data, value),
            price: raw_price,
            spend,
        })
    }

    /// Encodes `cancelOrder` for a single order.
    pub fn cancel_order(&self, target: &CancelTarget) -> Result<CallRequest, DexError> {
        let call = MatchingEngine::cancelOrderCall {
            base: target.base,
            quote: target.quote,
            isBid: target.side.is_bid(),
            orderId: target.engine_order_id()?,
        };
        Ok(CallRequest::new(self.exchange, call.abi_encode(), U256::ZERO))
    }

    /// Encodes the batched `cancelOrders` entry point.
    pub fn cancel_orders(&self, targets: &[CancelTarget]) -> Result<CallRequest, DexError> {
        let mut call = MatchingEngine::cancelOrdersCall {
            base: Vec::with_capacity(targets.len()),
            quote: Vec::with_capacity(targets.len()),
            isBid: Vec::with_capacity(targets.len()),
            orderIds: Vec::with_capacity(targets.len()),
        };
        for target in targets {
            call.base.push(target.base);
            call.quote.push(target.quote);
            call.isBid.push(target.side.is_bid());
            call.orderIds.push(target.engine_order_id()?);
        }
        Ok(CallRequest::new(self.exchange, call.abi_encode(), U256::ZERO))
    }

    /// Encodes the `getOrder` view used to probe whether an order still rests
    /// on the book.
    pub fn get_order(&self, target: &CancelTarget) -> Result<CallRequest, DexError> {
        let call = MatchingEngine::getOrderCall {
            base: target.base,
            quote: target.quote,
            isBid: target.side.is_bid(),
            orderId: target.engine_order_id()?,
        };
        Ok(CallRequest::view(self.exchange, call.abi_encode()))
    }
}
