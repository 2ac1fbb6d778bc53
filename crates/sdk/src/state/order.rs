use std::fmt::Display;

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};

use crate::{
    events::DecodeResult,
    tx::RevertReason,
    types::{ClientOrderId, OrderId, OrderSide, TradingPair},
};

/// Lifecycle state of a tracked order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderState {
    /// Client order id reserved, placement not broadcast yet.
    PendingSubmit,
    /// Placement broadcast, order id not known yet.
    AwaitingConfirmation,
    /// Resting on the book.
    Open,
    ImmediatelyFilled,
    Cancelled,
    Failed,
}

impl OrderState {
    /// No transition is permitted out of a terminal state.
    pub fn is_terminal(&self) -> bool { matches!(self, OrderState::Cancelled | OrderState::Failed) }
}

impl Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderState::PendingSubmit => write!(f, "PendingSubmit"),
            OrderState::AwaitingConfirmation => write!(f, "AwaitingConfirmation"),
            OrderState::Open => write!(f, "Open"),
            OrderState::ImmediatelyFilled => write!(f, "ImmediatelyFilled"),
            OrderState::Cancelled => write!(f, "Cancelled"),
            OrderState::Failed => write!(f, "Failed"),
        }
    }
}

/// How an order is identified on-chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderRef {
    /// Order id assigned by the matching engine.
    Id(OrderId),
    /// Placement transaction whose receipt has not yielded an id yet.
    Placeholder(TxHash),
}

impl Display for OrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderRef::Id(id) => write!(f, "#{id}"),
            OrderRef::Placeholder(tx_hash) => write!(f, "tx:{tx_hash}"),
        }
    }
}

/// Outcome of a placement, applied to a record by
/// [`super::OrderRegistry::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Placed(OrderId),
    ImmediatelyFilled,
    /// Placement succeeded but the receipt carries no order event.
    Unresolved,
    Failed(RevertReason),
}

impl From<DecodeResult> for Resolution {
    fn from(result: DecodeResult) -> Self {
        match result {
            DecodeResult::Placed { order_id } => Resolution::Placed(order_id),
            DecodeResult::ImmediatelyFilled => Resolution::ImmediatelyFilled,
            DecodeResult::NotFound => Resolution::Unresolved,
        }
    }
}

/// Order tracked by the connector.
///
/// The order id is present only once a placement event was decoded; before
/// that the placement transaction hash stands in as a placeholder, and an
/// immediately filled or failed order carries no reference at all.
#[derive(Clone, derive_more::Debug, PartialEq, Eq)]
pub struct OrderRecord {
    client_order_id: ClientOrderId,
    pair: TradingPair,
    order_ref: Option<OrderRef>,
    tx_hash: TxHash,
    base: Address,
    quote: Address,
    side: OrderSide,
    state: OrderState,
    failure: Option<RevertReason>,
    #[debug("{created_at}")]
    created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Record reserving `client_order_id` for a placement about to be signed.
    pub fn pending(
        client_order_id: ClientOrderId,
        pair: TradingPair,
        base: Address,
        quote: Address,
        side: OrderSide,
    ) -> Self {
        Self {
            client_order_id,
            pair,
            order_ref: None,
            tx_hash: TxHash::ZERO,
            base,
            quote,
            side,
            state: OrderState::PendingSubmit,
            failure: None,
            created_at: Utc::now(),
        }
    }

    /// Record of a just broadcast placement.
    pub fn submitted(
        client_order_id: ClientOrderId,
        pair: TradingPair,
        tx_hash: TxHash,
        base: Address,
        quote: Address,
        side: OrderSide,
    ) -> Self {
        let mut record = Self::pending(client_order_id, pair, base, quote, side);
        record.broadcast(tx_hash);
        record
    }

    pub fn client_order_id(&self) -> &ClientOrderId { &self.client_order_id }

    pub fn pair(&self) -> &TradingPair { &self.pair }

    pub fn order_ref(&self) -> Option<OrderRef> { self.order_ref }

    /// Resolved matching engine order id.
    pub fn order_id(&self) -> Option<OrderId> {
        match self.order_ref {
            Some(OrderRef::Id(id)) => Some(id),
            _ => None,
        }
    }

    /// Placement transaction, zero while [`OrderState::PendingSubmit`].
    pub fn tx_hash(&self) -> TxHash { self.tx_hash }

    pub fn base(&self) -> Address { self.base }

    pub fn quote(&self) -> Address { self.quote }

    pub fn side(&self) -> OrderSide { self.side }

    pub fn state(&self) -> OrderState { self.state }

    /// Revert reason of a failed placement.
    pub fn failure(&self) -> Option<&RevertReason> { self.failure.as_ref() }

    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub(crate) fn broadcast(&mut self, tx_hash: TxHash) {
        self.tx_hash = tx_hash;
        self.order_ref = Some(OrderRef::Placeholder(tx_hash));
        self.state = OrderState::AwaitingConfirmation;
    }

    pub(crate) fn apply(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Placed(order_id) => {
                self.order_ref = Some(OrderRef::Id(order_id));
                self.state = OrderState::Open;
            },
            Resolution::ImmediatelyFilled => {
                self.order_ref = None;
                self.state = OrderState::ImmediatelyFilled;
            },
            Resolution::Unresolved => {
                self.order_ref = Some(OrderRef::Placeholder(self.tx_hash));
                self.state = OrderState::AwaitingConfirmation;
            },
            Resolution::Failed(reason) => {
                self.order_ref = None;
                self.failure = Some(reason);
                self.state = OrderState::Failed;
            },
        }
    }

    pub(crate) fn set_state(&mut self, state: OrderState) { self.state = state }
}

impl Display for OrderRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} {:#} {} {}", self.client_order_id, self.side, self.pair, self.state)?;
        if let Some(order_ref) = self.order_ref {
            write!(f, " {order_ref}")?;
        }
        write!(f, "]")
    }
}

#[cfg(feature = "display")]
impl tabled::Tabled for OrderRecord {
    const LENGTH: usize = 7;

    fn fields(&self) -> Vec<std::borrow::Cow<'_, str>> {
        use colored::Colorize;

        vec![
            self.client_order_id.as_str().into(),
            self.pair.to_string().into(),
            match self.side {
                OrderSide::Ask => format!("{:#}", self.side).red().to_string().into(),
                OrderSide::Bid => format!("{:#}", self.side).green().to_string().into(),
            },
            match self.state {
                OrderState::Open => self.state.to_string().bright_green().to_string().into(),
                OrderState::Failed => self.state.to_string().bright_red().to_string().into(),
                _ => self.state.to_string().into(),
            },
            if let Some(order_id) = self.order_id() {
                order_id.to_string().into()
            } else {
                "-".to_string().into()
            },
            if self.state == OrderState::PendingSubmit {
                "-".into()
            } else {
                self.tx_hash.to_string().into()
            },
            self.created_at.format("%Y-%m-%d %H:%M:%S").to_string().into(),
        ]
    }

    fn headers() -> Vec<std::borrow::Cow<'static, str>> {
        vec![
            "Client Order ID".into(),
            "Pair".into(),
            "Side".into(),
            "State".into(),
            "Order ID".into(),
            "Tx Hash".into(),
            "Created".into(),
        ]
    }
}
