use alloy::primitives::TxHash;
use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use super::{OrderRecord, OrderState, Resolution};
use crate::{error::DexError, types::ClientOrderId};

/// Orders tracked by the connector, keyed by client order id.
///
/// A placement reserves its client order id before any network call and the
/// record is completed once the transaction is broadcast. Records are only
/// mutated under the map's per-entry lock, so status reads may run
/// concurrently with confirmation and cancellation.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    orders: DashMap<ClientOrderId, OrderRecord>,
}

impl OrderRegistry {
    pub fn new() -> Self { Self::default() }

    /// Starts tracking `record`, failing if its client order id is taken,
    /// reserved ids included.
    pub fn track(&self, record: OrderRecord) -> Result<(), DexError> {
        match self.orders.entry(record.client_order_id().clone()) {
            Entry::Occupied(entry) => Err(DexError::DuplicateOrder(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(
                    client_order_id = %record.client_order_id(),
                    state = %record.state(),
                    "order recorded"
                );
                entry.insert(record);
                Ok(())
            },
        }
    }

    /// Completes a reserved record with its broadcast placement.
    ///
    /// # Panics
    ///
    /// When the record is not [`OrderState::PendingSubmit`].
    pub fn broadcast(&self, client_order_id: &str, tx_hash: TxHash) -> Option<OrderRecord> {
        let mut record = self.orders.get_mut(client_order_id)?;
        assert_eq!(
            record.state(),
            OrderState::PendingSubmit,
            "order {client_order_id} was already broadcast"
        );
        record.broadcast(tx_hash);
        Some(record.clone())
    }

    /// Drops the reservation of a placement that was never broadcast.
    pub fn release(&self, client_order_id: &str) -> bool {
        self.orders
            .remove_if(client_order_id, |_, record| record.state() == OrderState::PendingSubmit)
            .is_some()
    }

    pub fn contains(&self, client_order_id: &str) -> bool {
        self.orders.contains_key(client_order_id)
    }

    /// Applies a placement outcome, returning the updated record.
    ///
    /// # Panics
    ///
    /// When the record is in a terminal state and `resolution` would move it
    /// elsewhere.
    pub fn resolve(&self, client_order_id: &str, resolution: Resolution) -> Option<OrderRecord> {
        let mut record = self.orders.get_mut(client_order_id)?;
        let repeated_failure =
            matches!((record.state(), &resolution), (OrderState::Failed, Resolution::Failed(_)));
        assert!(
            !record.state().is_terminal() || repeated_failure,
            "order {client_order_id} is {} and cannot be resolved",
            record.state()
        );
        if !record.state().is_terminal() {
            record.apply(resolution);
        }
        Some(record.clone())
    }

    /// Removes the record once its cancellation is settled, marking it
    /// cancelled unless it already reached a terminal state.
    ///
    /// Returns `None` if the record was already cleared.
    pub fn clear(&self, client_order_id: &str) -> Option<OrderRecord> {
        let (_, mut record) = self.orders.remove(client_order_id)?;
        if !record.state().is_terminal() {
            record.set_state(OrderState::Cancelled);
        }
        debug!(%client_order_id, state = %record.state(), "order cleared");
        Some(record)
    }

    pub fn get(&self, client_order_id: &str) -> Option<OrderRecord> {
        self.orders.get(client_order_id).map(|record| record.clone())
    }

    /// Snapshot of all tracked records, oldest first.
    pub fn records(&self) -> Vec<OrderRecord> {
        let mut records: Vec<_> = self.orders.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by_key(|record| record.created_at());
        records
    }

    pub fn len(&self) -> usize { self.orders.len() }

    pub fn is_empty(&self) -> bool { self.orders.is_empty() }
}
