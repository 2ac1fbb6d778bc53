//! Order resolution from placement receipts.

use alloy::{primitives::Address, sol_types::SolEventInterface};
use tracing::debug;

use crate::{
    abi::matching_engine::MatchingEngine::MatchingEngineEvents,
    types::{OrderId, Receipt},
};

/// Order event emitted by the matching engine, reduced to what order
/// resolution needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderEvent {
    /// New resting order was created.
    Placed { order_id: OrderId },
    /// Order was matched against a resting one.
    Matched,
}

/// What a placement receipt says about the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeResult {
    Placed { order_id: OrderId },
    /// Order crossed the book entirely within its placement transaction and
    /// never rested on it.
    ImmediatelyFilled,
    /// Neither placement nor match events found.
    NotFound,
}

/// Order events in `receipt` emitted by `exchange`, in log order.
///
/// Logs of other contracts and logs that do not decode as matching engine
/// events are skipped.
pub fn order_events(receipt: &Receipt, exchange: Address) -> Vec<OrderEvent> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == exchange)
        .filter_map(|log| match MatchingEngineEvents::decode_log(log) {
            Ok(decoded) => Some(decoded.data),
            Err(err) => {
                debug!(tx_hash = %receipt.tx_hash, %err, "skipping undecodable exchange log");
                None
            },
        })
        .filter_map(|event| match event {
            MatchingEngineEvents::OrderPlaced(placed) => {
                Some(OrderEvent::Placed { order_id: OrderId::from(placed.id) })
            },
            MatchingEngineEvents::OrderMatched(_) => Some(OrderEvent::Matched),
            MatchingEngineEvents::OrderCanceled(_) => None,
        })
        .collect()
}

/// Resolves the order created by a placement transaction.
///
/// The first `OrderPlaced` wins. Without one, any `OrderMatched` means the
/// order was filled immediately.
pub fn decode(receipt: &Receipt, exchange: Address) -> DecodeResult {
    let mut matched = false;
    for event in order_events(receipt, exchange) {
        match event {
            OrderEvent::Placed { order_id } => return DecodeResult::Placed { order_id },
            OrderEvent::Matched => matched = true,
        }
    }
    if matched { DecodeResult::ImmediatelyFilled } else { DecodeResult::NotFound }
}
