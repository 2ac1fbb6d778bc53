//! Tiered order cancellation.
//!
//! [`CancellationRouter`] tries its [`CancelChannel`]s in order, first success
//! wins. By default these are [`BatchCancel`] (`cancelOrders`, the entry point
//! the exchange SDK uses) followed by [`DirectCancel`] (`cancelOrder`). When
//! every channel fails the order is only dropped locally.

use std::{fmt::Display, sync::Arc};

use alloy::{
    primitives::{Address, TxHash},
    sol_types::SolCall,
};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    abi::matching_engine::MatchingEngine,
    error::DexError,
    events::{self, DecodeResult},
    rpc::ChainRpc,
    state::{OrderRecord, OrderRef, OrderState},
    tx::{CancelTarget, Confirmation, Pipeline, TransactionBuilder},
    types::{CallRequest, OrderId, TxRequest},
};

/// Why a cancellation ended without an on-chain cancel transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocalCancelReason {
    /// Order matched entirely when placed and never rested on the book.
    ImmediatelyFilled,
    /// Placement failed, nothing was created on-chain.
    NothingOnChain,
    /// Order id could not be recovered from the placement receipt.
    Unresolved,
    /// Order is no longer on the book.
    NotOnBook,
    /// Every channel failed. Exchange-side state is unknown.
    Exhausted,
}

impl Display for LocalCancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalCancelReason::ImmediatelyFilled => write!(f, "immediately filled"),
            LocalCancelReason::NothingOnChain => write!(f, "nothing on-chain"),
            LocalCancelReason::Unresolved => write!(f, "order id unresolved"),
            LocalCancelReason::NotOnBook => write!(f, "not on book"),
            LocalCancelReason::Exhausted => write!(f, "all channels failed"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Cancel transaction confirmed.
    Cancelled { tx_hash: TxHash, channel: &'static str },
    /// Local tracking stops, nothing was cancelled on-chain.
    LocallyCancelledOnly { reason: LocalCancelReason },
}

impl CancelOutcome {
    fn local(reason: LocalCancelReason) -> Self { CancelOutcome::LocallyCancelledOnly { reason } }
}

/// What a channel achieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelAttempt {
    Cancelled { tx_hash: TxHash },
    /// Channel found out there is nothing left to cancel.
    NotOnBook,
}

/// One way of cancelling a resting order.
pub trait CancelChannel: Send + Sync {
    /// Short name reported in [`CancelOutcome::Cancelled`].
    fn name(&self) -> &'static str;

    fn cancel<'a>(
        &'a self,
        target: &'a CancelTarget,
        shutdown: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<CancelAttempt, DexError>>;
}

/// Cancels through the batched `cancelOrders` entry point.
pub struct BatchCancel<R> {
    pipeline: Arc<Pipeline<R>>,
    builder: TransactionBuilder,
}

impl<R: ChainRpc> BatchCancel<R> {
    pub fn new(pipeline: Arc<Pipeline<R>>, builder: TransactionBuilder) -> Self {
        Self { pipeline, builder }
    }
}

impl<R: ChainRpc> CancelChannel for BatchCancel<R> {
    fn name(&self) -> &'static str { "batch" }

    fn cancel<'a>(
        &'a self,
        target: &'a CancelTarget,
        shutdown: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<CancelAttempt, DexError>> {
        Box::pin(async move {
            let call = self.builder.cancel_orders(std::slice::from_ref(target))?;
            let tx_hash = execute(&self.pipeline, &call, shutdown).await?;
            Ok(CancelAttempt::Cancelled { tx_hash })
        })
    }
}

/// Cancels through `cancelOrder`, after checking with `getOrder` that the
/// order still rests on the book.
pub struct DirectCancel<R> {
    pipeline: Arc<Pipeline<R>>,
    builder: TransactionBuilder,
    probe: bool,
}

impl<R: ChainRpc> DirectCancel<R> {
    pub fn new(pipeline: Arc<Pipeline<R>>, builder: TransactionBuilder) -> Self {
        Self { pipeline, builder, probe: true }
    }

    /// Whether to query `getOrder` before sending, `true` by default.
    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    /// `Some(false)` when the book reports no remaining deposit for the order.
    /// Probe failures yield `None`.
    async fn on_book(&self, target: &CancelTarget) -> Option<bool> {
        let call = self.builder.get_order(target).ok()?;
        let view = TxRequest::view(self.pipeline.address(), &call);
        let order = match self.pipeline.rpc().call(&view, None).await {
            Ok(data) => MatchingEngine::getOrderCall::abi_decode_returns(&data),
            Err(err) => {
                debug!(order_id = target.order_id, %err, "order probe failed");
                return None;
            },
        };
        match order {
            Ok(order) => Some(order.owner != Address::ZERO && !order.depositAmount.is_zero()),
            Err(err) => {
                debug!(order_id = target.order_id, %err, "order probe undecodable");
                None
            },
        }
    }
}

impl<R: ChainRpc> CancelChannel for DirectCancel<R> {
    fn name(&self) -> &'static str { "direct" }

    fn cancel<'a>(
        &'a self,
        target: &'a CancelTarget,
        shutdown: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<CancelAttempt, DexError>> {
        Box::pin(async move {
            if self.probe && self.on_book(target).await == Some(false) {
                return Ok(CancelAttempt::NotOnBook);
            }
            let call = self.builder.cancel_order(target)?;
            let tx_hash = execute(&self.pipeline, &call, shutdown).await?;
            Ok(CancelAttempt::Cancelled { tx_hash })
        })
    }
}

/// Sends `call` and waits for it under the wallet lock.
async fn execute<R: ChainRpc>(
    pipeline: &Pipeline<R>,
    call: &CallRequest,
    shutdown: &CancellationToken,
) -> Result<TxHash, DexError> {
    let (_, confirmation) = pipeline.begin().await.execute(call, shutdown).await?;
    match confirmation {
        Confirmation::Confirmed(receipt) => Ok(receipt.tx_hash),
        Confirmation::Reverted { receipt, reason } => {
            Err(DexError::TransactionReverted { tx_hash: receipt.tx_hash, reason })
        },
        Confirmation::TimedOut { tx_hash, timeout } => {
            Err(DexError::ConfirmationTimedOut { tx_hash, timeout })
        },
    }
}

/// Routes cancellations through an ordered list of channels.
///
/// Placement receipts needed to resolve placeholders are awaited with the
/// pipeline's poller, outside the wallet lock.
pub struct CancellationRouter<R> {
    pipeline: Arc<Pipeline<R>>,
    exchange: Address,
    channels: Vec<Box<dyn CancelChannel>>,
}

impl<R: ChainRpc> CancellationRouter<R> {
    pub fn new(
        pipeline: Arc<Pipeline<R>>,
        exchange: Address,
        channels: Vec<Box<dyn CancelChannel>>,
    ) -> Self {
        Self { pipeline, exchange, channels }
    }

    /// Batched channel first, direct channel second.
    pub fn with_default_channels(pipeline: Arc<Pipeline<R>>, builder: &TransactionBuilder) -> Self {
        let channels: Vec<Box<dyn CancelChannel>> = vec![
            Box::new(BatchCancel::new(pipeline.clone(), builder.clone())),
            Box::new(DirectCancel::new(pipeline.clone(), builder.clone())),
        ];
        Self::new(pipeline, builder.exchange(), channels)
    }

    /// Names of the channels, in the order they are tried.
    pub fn channels(&self) -> Vec<&'static str> {
        self.channels.iter().map(|channel| channel.name()).collect()
    }

    /// Cancels the order described by `record`.
    ///
    /// Channel failures are logged and the next channel is tried; only a
    /// shutdown aborts the routing.
    pub async fn cancel(
        &self,
        record: &OrderRecord,
        shutdown: &CancellationToken,
    ) -> Result<CancelOutcome, DexError> {
        let client_order_id = record.client_order_id();
        if record.state() == OrderState::ImmediatelyFilled {
            return Ok(CancelOutcome::local(LocalCancelReason::ImmediatelyFilled));
        }
        let order_id = match record.order_ref() {
            None => return Ok(CancelOutcome::local(LocalCancelReason::NothingOnChain)),
            Some(OrderRef::Id(order_id)) => order_id,
            Some(OrderRef::Placeholder(tx_hash)) => match self.resolve(tx_hash, shutdown).await? {
                Ok(order_id) => order_id,
                Err(reason) => {
                    info!(%client_order_id, %tx_hash, %reason, "nothing to cancel on-chain");
                    return Ok(CancelOutcome::local(reason));
                },
            },
        };

        let target = CancelTarget {
            base: record.base(),
            quote: record.quote(),
            side: record.side(),
            order_id,
        };
        for channel in &self.channels {
            match channel.cancel(&target, shutdown).await {
                Ok(CancelAttempt::Cancelled { tx_hash }) => {
                    info!(
                        %client_order_id,
                        order_id,
                        %tx_hash,
                        channel = channel.name(),
                        "order cancelled"
                    );
                    return Ok(CancelOutcome::Cancelled { tx_hash, channel: channel.name() });
                },
                Ok(CancelAttempt::NotOnBook) => {
                    info!(
                        %client_order_id,
                        order_id,
                        channel = channel.name(),
                        "order no longer on book"
                    );
                    return Ok(CancelOutcome::local(LocalCancelReason::NotOnBook));
                },
                Err(err @ DexError::Shutdown { .. }) => return Err(err),
                Err(err) => {
                    warn!(
                        %client_order_id,
                        order_id,
                        channel = channel.name(),
                        tx_hash = ?err.tx_hash(),
                        %err,
                        "cancellation channel failed"
                    );
                },
            }
        }

        let err = DexError::CancellationExhausted(client_order_id.clone());
        warn!(order_id, %err, "dropping order locally");
        Ok(CancelOutcome::local(LocalCancelReason::Exhausted))
    }

    /// Recovers the order id from a placement receipt, waiting for it if the
    /// placement is not mined yet.
    async fn resolve(
        &self,
        tx_hash: TxHash,
        shutdown: &CancellationToken,
    ) -> Result<Result<OrderId, LocalCancelReason>, DexError> {
        let receipt = match self.pipeline.confirm(tx_hash, shutdown).await? {
            Confirmation::Confirmed(receipt) => receipt,
            Confirmation::Reverted { .. } => return Ok(Err(LocalCancelReason::NothingOnChain)),
            Confirmation::TimedOut { .. } => return Ok(Err(LocalCancelReason::Unresolved)),
        };
        Ok(match events::decode(&receipt, self.exchange) {
            DecodeResult::Placed { order_id } => {
                debug!(%tx_hash, order_id, "placeholder resolved");
                Ok(order_id)
            },
            DecodeResult::ImmediatelyFilled => Err(LocalCancelReason::ImmediatelyFilled),
            DecodeResult::NotFound => Err(LocalCancelReason::Unresolved),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        state::Resolution,
        testing::{self, MockChain},
        tx::RevertReason,
        types::{OrderSide, TradingPair},
    };

    struct Scripted {
        name: &'static str,
        result: Mutex<Option<Result<CancelAttempt, DexError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str, result: Result<CancelAttempt, DexError>) -> Arc<Self> {
            Arc::new(Self { name, result: Mutex::new(Some(result)), calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
    }

    impl CancelChannel for Arc<Scripted> {
        fn name(&self) -> &'static str { self.name }

        fn cancel<'a>(
            &'a self,
            _target: &'a CancelTarget,
            _shutdown: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<CancelAttempt, DexError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self.result.lock().unwrap().take().expect("channel called once");
            Box::pin(async move { result })
        }
    }

    fn record(resolution: Option<Resolution>) -> OrderRecord {
        let mut record = OrderRecord::submitted(
            "order-1".to_string(),
            TradingPair::new("STT", "USDC"),
            TxHash::repeat_byte(9),
            testing::stt().address(),
            testing::usdc().address(),
            OrderSide::Ask,
        );
        if let Some(resolution) = resolution {
            record.apply(resolution);
        }
        record
    }

    fn router(rpc: &Arc<MockChain>, channels: &[Arc<Scripted>]) -> CancellationRouter<MockChain> {
        let channels = channels
            .iter()
            .map(|channel| Box::new(channel.clone()) as Box<dyn CancelChannel>)
            .collect();
        let pipeline = Arc::new(testing::pipeline(rpc));
        CancellationRouter::new(pipeline, testing::chain().exchange(), channels)
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let rpc = Arc::new(MockChain::new());
        let first = Scripted::new("batch", Err(DexError::InvalidRequest("boom".into())));
        let second = Scripted::new(
            "direct",
            Ok(CancelAttempt::Cancelled { tx_hash: TxHash::repeat_byte(1) }),
        );
        let router = router(&rpc, &[first.clone(), second.clone()]);

        let outcome = router
            .cancel(&record(Some(Resolution::Placed(42))), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CancelOutcome::Cancelled { tx_hash: TxHash::repeat_byte(1), channel: "direct" }
        );
        assert_eq!((first.calls(), second.calls()), (1, 1));
        assert_eq!(router.channels(), vec!["batch", "direct"]);
    }

    #[tokio::test]
    async fn test_exhausted() {
        let rpc = Arc::new(MockChain::new());
        let first = Scripted::new("batch", Err(DexError::InvalidRequest("boom".into())));
        let second = Scripted::new(
            "direct",
            Err(DexError::ConfirmationTimedOut {
                tx_hash: TxHash::repeat_byte(2),
                timeout: std::time::Duration::from_secs(30),
            }),
        );
        let router = router(&rpc, &[first, second]);

        let outcome = router
            .cancel(&record(Some(Resolution::Placed(42))), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, CancelOutcome::local(LocalCancelReason::Exhausted));
    }

    #[tokio::test]
    async fn test_shutdown_aborts_routing() {
        let rpc = Arc::new(MockChain::new());
        let first = Scripted::new("batch", Err(DexError::Shutdown { tx_hash: TxHash::ZERO }));
        let second = Scripted::new("direct", Err(DexError::InvalidRequest("unused".into())));
        let router = router(&rpc, &[first, second.clone()]);

        let err = router
            .cancel(&record(Some(Resolution::Placed(42))), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DexError::Shutdown { .. }));
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_nothing_to_cancel_skips_network() {
        let rpc = Arc::new(MockChain::new());
        let channel = Scripted::new("batch", Err(DexError::InvalidRequest("unused".into())));
        let router = router(&rpc, &[channel.clone()]);

        let filled = router
            .cancel(&record(Some(Resolution::ImmediatelyFilled)), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(filled, CancelOutcome::local(LocalCancelReason::ImmediatelyFilled));

        let failed = Resolution::Failed(RevertReason::new(None, 50_000, Some(3_000_000)));
        let failed = router
            .cancel(&record(Some(failed)), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(failed, CancelOutcome::local(LocalCancelReason::NothingOnChain));

        assert_eq!(channel.calls(), 0);
        assert_eq!(rpc.requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_placeholder_is_unresolved() {
        let rpc = Arc::new(MockChain::new());
        let channel = Scripted::new("batch", Err(DexError::InvalidRequest("unused".into())));
        let router = router(&rpc, &[channel.clone()]);

        let outcome = router.cancel(&record(None), &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, CancelOutcome::local(LocalCancelReason::Unresolved));
        assert_eq!(channel.calls(), 0);
        assert_eq!(rpc.receipt_lookups(TxHash::repeat_byte(9)), 30);
    }
}
