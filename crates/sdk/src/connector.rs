//! Order placement and cancellation for one wallet on one deployment.

use std::{
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use alloy::{primitives::TxHash, signers::local::PrivateKeySigner};
use fastnum::UD64;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    Chain,
    cancel::{CancelChannel, CancelOutcome, CancellationRouter},
    error::DexError,
    events::{self, DecodeResult},
    funds::{FundsChecker, OnChainFunds, TokenResolver, Unchecked},
    limiter::ErrorRateLimiter,
    rpc::ChainRpc,
    state::{OrderRecord, OrderRegistry, OrderState, Resolution},
    tx::{
        Confirmation, ConfirmationPoller, EntryPoint, GasPolicy, NonceAllocator, Pipeline,
        PollPolicy, RevertReason, TransactionBuilder, TransactionSubmitter,
    },
    types::{ClientOrderId, OrderId, OrderRequest, OrderSide, OrderType, TradingPair},
};

/// Connector settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectorConfig {
    pub gas: GasPolicy,
    /// Receipt polling, its timeout bounds every confirmation.
    pub poll: PollPolicy,
    /// Keep the wallet lock until the placement is confirmed, making
    /// [`Connector::place`] return a resolved order.
    pub confirm_in_lock: bool,
    /// Let unmatched remainders rest on the book.
    pub is_maker: bool,
    pub market_slippage: UD64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            gas: GasPolicy::default(),
            poll: PollPolicy::default(),
            confirm_in_lock: false,
            is_maker: true,
            market_slippage: OrderType::DEFAULT_SLIPPAGE,
        }
    }
}

/// Broadcast placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderHandle {
    pub client_order_id: ClientOrderId,
    pub tx_hash: TxHash,
    pub nonce: u64,
    pub entry_point: EntryPoint,
    /// Set when the placement was confirmed before returning, see
    /// [`ConnectorConfig::confirm_in_lock`].
    pub outcome: Option<ConfirmOutcome>,
}

/// Resolution of a placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Order rests on the book.
    Open(OrderId),
    ImmediatelyFilled,
    /// Placement was mined but emitted no order event. Cancellation will try
    /// to resolve the order id again.
    Unresolved,
    Failed(RevertReason),
    /// No receipt in time. The placement may still be mined.
    TimedOut,
}

impl ConfirmOutcome {
    /// Outcome already recorded for `record`, if it was resolved.
    fn recorded(record: &OrderRecord) -> Option<Self> {
        match record.state() {
            OrderState::Open => record.order_id().map(ConfirmOutcome::Open),
            OrderState::ImmediatelyFilled => Some(ConfirmOutcome::ImmediatelyFilled),
            OrderState::Failed => record.failure().cloned().map(ConfirmOutcome::Failed),
            OrderState::PendingSubmit
            | OrderState::AwaitingConfirmation
            | OrderState::Cancelled => None,
        }
    }
}

impl Display for ConfirmOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmOutcome::Open(order_id) => write!(f, "open #{order_id}"),
            ConfirmOutcome::ImmediatelyFilled => write!(f, "immediately filled"),
            ConfirmOutcome::Unresolved => write!(f, "unresolved"),
            ConfirmOutcome::Failed(reason) => write!(f, "failed: {reason}"),
            ConfirmOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Transaction counters of a connector.
#[derive(Debug, Default)]
pub struct TxStats {
    submitted: AtomicU64,
    submission_failures: AtomicU64,
    confirmed: AtomicU64,
    reverted: AtomicU64,
    timed_out: AtomicU64,
    gas_used: AtomicU64,
}

impl TxStats {
    pub fn submitted(&self) -> u64 { self.submitted.load(Ordering::Relaxed) }

    pub fn submission_failures(&self) -> u64 { self.submission_failures.load(Ordering::Relaxed) }

    pub fn confirmed(&self) -> u64 { self.confirmed.load(Ordering::Relaxed) }

    pub fn reverted(&self) -> u64 { self.reverted.load(Ordering::Relaxed) }

    pub fn timed_out(&self) -> u64 { self.timed_out.load(Ordering::Relaxed) }

    /// Gas used by mined placements, reverted ones included.
    pub fn gas_used(&self) -> u64 { self.gas_used.load(Ordering::Relaxed) }

    fn record(&self, counter: &AtomicU64) { counter.fetch_add(1, Ordering::Relaxed); }

    fn record_gas(&self, gas_used: u64) { self.gas_used.fetch_add(gas_used, Ordering::Relaxed); }
}

impl Display for TxStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "submitted:{} rejected:{} confirmed:{} reverted:{} timed out:{} gas:{}",
            self.submitted(),
            self.submission_failures(),
            self.confirmed(),
            self.reverted(),
            self.timed_out(),
            self.gas_used()
        )
    }
}

/// Reserved client order id of a placement in progress.
///
/// Dropping it before [`Reservation::broadcast`] frees the id, including when
/// the placement future itself is dropped.
struct Reservation<'a> {
    registry: &'a OrderRegistry,
    client_order_id: ClientOrderId,
    broadcast: bool,
}

impl<'a> Reservation<'a> {
    fn new(registry: &'a OrderRegistry, client_order_id: ClientOrderId) -> Self {
        Self { registry, client_order_id, broadcast: false }
    }

    fn broadcast(&mut self, tx_hash: TxHash) {
        self.broadcast = true;
        if self.registry.broadcast(&self.client_order_id, tx_hash).is_none() {
            debug!(client_order_id = %self.client_order_id, "reservation cleared concurrently");
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.broadcast && self.registry.release(&self.client_order_id) {
            debug!(client_order_id = %self.client_order_id, "reservation released");
        }
    }
}

/// Order lifecycle manager.
///
/// Placement resolves tokens, checks funds, encodes the call and broadcasts it
/// under the wallet lock. The order is tracked from then on and resolved by
/// [`Connector::confirm`] (or during placement with
/// [`ConnectorConfig::confirm_in_lock`]). [`Connector::cancel`] routes through
/// the configured cancellation channels and stops tracking the order whatever
/// the outcome.
///
/// All methods take `&self`; share the connector with an [`Arc`] to operate
/// concurrently. Operations of one wallet are serialized by its lock, reads of
/// the registry are not.
pub struct Connector<R> {
    chain: Chain,
    builder: TransactionBuilder,
    pipeline: Arc<Pipeline<R>>,
    registry: OrderRegistry,
    router: CancellationRouter<R>,
    funds: Box<dyn FundsChecker>,
    limiter: Arc<ErrorRateLimiter>,
    config: ConnectorConfig,
    stats: TxStats,
    shutdown: CancellationToken,
}

impl<R: ChainRpc> Connector<R> {
    /// Connector signing with `signer`, with on-chain funds checks and the
    /// default cancellation channels.
    pub fn new(
        chain: Chain,
        rpc: Arc<R>,
        signer: PrivateKeySigner,
        config: ConnectorConfig,
    ) -> Self {
        let submitter =
            TransactionSubmitter::new(rpc.clone(), signer, chain.chain_id(), config.gas);
        let poller = ConfirmationPoller::new(rpc.clone(), config.poll);
        let nonces = Arc::new(NonceAllocator::new());
        let pipeline = Arc::new(Pipeline::new(rpc.clone(), nonces, submitter, poller));
        Self::with_pipeline(chain, pipeline, config).with_funds(OnChainFunds::new(rpc))
    }

    /// Connector over an existing pipeline, sharing its nonce allocator.
    /// Funds are not checked.
    pub fn with_pipeline(
        chain: Chain,
        pipeline: Arc<Pipeline<R>>,
        config: ConnectorConfig,
    ) -> Self {
        let builder =
            TransactionBuilder::new(&chain, pipeline.address()).with_maker(config.is_maker);
        let router = CancellationRouter::with_default_channels(pipeline.clone(), &builder);
        Self {
            chain,
            builder,
            pipeline,
            registry: OrderRegistry::new(),
            router,
            funds: Box::new(Unchecked),
            limiter: Arc::new(ErrorRateLimiter::default()),
            config,
            stats: TxStats::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_funds(mut self, funds: impl FundsChecker + 'static) -> Self {
        self.funds = Box::new(funds);
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<ErrorRateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replaces the cancellation channels, tried in the given order.
    pub fn with_cancel_channels(mut self, channels: Vec<Box<dyn CancelChannel>>) -> Self {
        self.router =
            CancellationRouter::new(self.pipeline.clone(), self.chain.exchange(), channels);
        self
    }

    pub fn chain(&self) -> &Chain { &self.chain }

    pub fn pipeline(&self) -> &Arc<Pipeline<R>> { &self.pipeline }

    pub fn builder(&self) -> &TransactionBuilder { &self.builder }

    pub fn router(&self) -> &CancellationRouter<R> { &self.router }

    pub fn limiter(&self) -> &Arc<ErrorRateLimiter> { &self.limiter }

    pub fn stats(&self) -> &TxStats { &self.stats }

    pub fn config(&self) -> &ConnectorConfig { &self.config }

    /// Places an order, returning once its transaction is broadcast.
    ///
    /// Argument, token and funds problems fail before anything is signed. A
    /// rejected broadcast fails with [`DexError::SubmissionFailed`] and is not
    /// tracked. The client order id is reserved before the funds check, so a
    /// concurrent placement with the same id fails with
    /// [`DexError::DuplicateOrder`] without reaching the network.
    pub async fn place(
        &self,
        client_order_id: impl Into<ClientOrderId>,
        request: &OrderRequest,
    ) -> Result<OrderHandle, DexError> {
        let client_order_id = client_order_id.into();
        self.limiter.check()?;
        if self.registry.contains(&client_order_id) {
            return Err(DexError::DuplicateOrder(client_order_id));
        }

        let base = self.chain.resolve(request.pair().base())?;
        let quote = self.chain.resolve(request.pair().quote())?;
        let price = request.execution_price(self.config.market_slippage)?;
        let call = self.builder.build(request.side(), &base, &quote, request.amount(), price)?;

        // Held from here until broadcast, released if the placement stops early
        self.registry.track(OrderRecord::pending(
            client_order_id.clone(),
            request.pair().clone(),
            base.address(),
            quote.address(),
            request.side(),
        ))?;
        let mut reservation = Reservation::new(&self.registry, client_order_id.clone());

        let spent = match request.side() {
            OrderSide::Bid => &quote,
            OrderSide::Ask => &base,
        };
        self.funds
            .check(self.pipeline.address(), spent, call.spend, self.builder.exchange())
            .await?;

        let mut session = self.pipeline.begin().await;
        let submitted = match session.submit(&call.request).await {
            Ok(submitted) => submitted,
            Err(err) => {
                self.stats.record(&self.stats.submission_failures);
                self.limiter.record_error();
                return Err(err);
            },
        };
        reservation.broadcast(submitted.hash);
        self.stats.record(&self.stats.submitted);
        info!(
            %client_order_id,
            side = %request.side(),
            pair = %request.pair(),
            amount = %request.amount(),
            %price,
            entry_point = %call.entry_point,
            tx_hash = %submitted.hash,
            nonce = submitted.request.nonce,
            "order submitted"
        );
        let mut handle = OrderHandle {
            client_order_id,
            tx_hash: submitted.hash,
            nonce: submitted.request.nonce,
            entry_point: call.entry_point,
            outcome: None,
        };
        if self.config.confirm_in_lock {
            let confirmation = session.confirm(submitted.hash, &self.shutdown).await;
            drop(session);
            handle.outcome = Some(self.settle(&handle.client_order_id, confirmation?));
        }
        Ok(handle)
    }

    /// Waits for the placement of `client_order_id` and resolves the order.
    ///
    /// Already resolved orders return their recorded outcome without any
    /// network call.
    pub async fn confirm(&self, client_order_id: &str) -> Result<ConfirmOutcome, DexError> {
        let record = self
            .registry
            .get(client_order_id)
            .ok_or_else(|| DexError::UnknownOrder(client_order_id.to_string()))?;
        if record.state() == OrderState::PendingSubmit {
            return Err(DexError::NotBroadcast(client_order_id.to_string()));
        }
        if let Some(outcome) = ConfirmOutcome::recorded(&record) {
            return Ok(outcome);
        }
        let confirmation = self.pipeline.confirm(record.tx_hash(), &self.shutdown).await?;
        Ok(self.settle(client_order_id, confirmation))
    }

    /// Cancels `client_order_id` and stops tracking it.
    ///
    /// Fails with [`DexError::UnknownOrder`] if the order is not tracked,
    /// including when it was cancelled before, and with
    /// [`DexError::NotBroadcast`] while its placement is in progress.
    pub async fn cancel(&self, client_order_id: &str) -> Result<CancelOutcome, DexError> {
        let record = self
            .registry
            .get(client_order_id)
            .ok_or_else(|| DexError::UnknownOrder(client_order_id.to_string()))?;
        if record.state() == OrderState::PendingSubmit {
            return Err(DexError::NotBroadcast(client_order_id.to_string()));
        }
        let outcome = self.router.cancel(&record, &self.shutdown).await?;
        if self.registry.clear(client_order_id).is_none() {
            debug!(%client_order_id, "order cleared concurrently");
        }
        Ok(outcome)
    }

    pub fn status(&self, client_order_id: &str) -> Option<OrderRecord> {
        self.registry.get(client_order_id)
    }

    /// All tracked orders, oldest first.
    pub fn orders(&self) -> Vec<OrderRecord> { self.registry.records() }

    /// Starts tracking an order placed elsewhere, by its placement transaction
    /// and, if known, its order id.
    pub fn adopt(
        &self,
        client_order_id: impl Into<ClientOrderId>,
        pair: &TradingPair,
        side: OrderSide,
        tx_hash: TxHash,
        order_id: Option<OrderId>,
    ) -> Result<OrderRecord, DexError> {
        let base = self.chain.resolve(pair.base())?;
        let quote = self.chain.resolve(pair.quote())?;
        let mut record = OrderRecord::submitted(
            client_order_id.into(),
            pair.clone(),
            tx_hash,
            base.address(),
            quote.address(),
            side,
        );
        if let Some(order_id) = order_id {
            record.apply(Resolution::Placed(order_id));
        }
        self.registry.track(record.clone())?;
        Ok(record)
    }

    /// Token that stops receipt polling of every in-flight operation.
    pub fn shutdown_token(&self) -> CancellationToken { self.shutdown.clone() }

    /// Stops in-flight polling. Broadcast transactions are not affected.
    pub fn shutdown(&self) {
        info!(tracked = self.registry.len(), stats = %self.stats, "connector shutting down");
        self.shutdown.cancel();
    }

    fn settle(&self, client_order_id: &str, confirmation: Confirmation) -> ConfirmOutcome {
        let (resolution, outcome) = match confirmation {
            Confirmation::Confirmed(receipt) => {
                self.stats.record(&self.stats.confirmed);
                self.stats.record_gas(receipt.gas_used);
                match events::decode(&receipt, self.chain.exchange()) {
                    DecodeResult::Placed { order_id } => {
                        info!(%client_order_id, order_id, "order open");
                        (Resolution::Placed(order_id), ConfirmOutcome::Open(order_id))
                    },
                    DecodeResult::ImmediatelyFilled => {
                        info!(%client_order_id, "order filled immediately");
                        (Resolution::ImmediatelyFilled, ConfirmOutcome::ImmediatelyFilled)
                    },
                    DecodeResult::NotFound => {
                        let err = DexError::OrderIdUnresolved { tx_hash: receipt.tx_hash };
                        warn!(%client_order_id, %err, "keeping placement hash as order reference");
                        (Resolution::Unresolved, ConfirmOutcome::Unresolved)
                    },
                }
            },
            Confirmation::Reverted { receipt, reason } => {
                self.stats.record(&self.stats.reverted);
                self.stats.record_gas(receipt.gas_used);
                self.limiter.record_error();
                warn!(
                    %client_order_id,
                    tx_hash = %receipt.tx_hash,
                    %reason,
                    category = %reason.category(),
                    "order failed"
                );
                (Resolution::Failed(reason.clone()), ConfirmOutcome::Failed(reason))
            },
            Confirmation::TimedOut { tx_hash, timeout } => {
                self.stats.record(&self.stats.timed_out);
                let err = DexError::ConfirmationTimedOut { tx_hash, timeout };
                warn!(%client_order_id, %err, "order state indeterminate");
                return ConfirmOutcome::TimedOut;
            },
        };

        if self.registry.resolve(client_order_id, resolution).is_none() {
            debug!(%client_order_id, "order no longer tracked");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy::{
        primitives::{Address, U256},
        sol_types::SolCall,
    };
    use fastnum::udec64;
    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        abi::matching_engine::MatchingEngine,
        testing::{self, MockChain, Outcome},
        types::Token,
    };

    fn limit(pair: &str, side: OrderSide, amount: UD64, price: UD64) -> OrderRequest {
        OrderRequest::limit(pair.parse().unwrap(), side, amount, price)
    }

    fn sell() -> OrderRequest { limit("STT-USDC", OrderSide::Ask, udec64!(1), udec64!(2.5)) }

    #[tokio::test]
    async fn test_local_failures_skip_network() {
        let rpc = Arc::new(MockChain::new());
        let connector = testing::connector(&rpc);

        let unknown = limit("DOGE-USDC", OrderSide::Bid, udec64!(1), udec64!(1));
        assert!(matches!(connector.place("a", &unknown).await, Err(DexError::UnknownToken(_))));

        let zero = limit("STT-USDC", OrderSide::Bid, udec64!(0), udec64!(1));
        assert!(matches!(connector.place("a", &zero).await, Err(DexError::InvalidArgument(_))));

        assert_eq!(rpc.requests(), 0);
        assert!(connector.status("a").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_client_order_id() {
        let rpc = Arc::new(MockChain::new());
        let connector = testing::connector(&rpc);

        connector.place("a", &sell()).await.unwrap();
        let requests = rpc.requests();
        assert!(matches!(
            connector.place("a", &sell()).await,
            Err(DexError::DuplicateOrder(id)) if id == "a"
        ));
        assert_eq!(rpc.requests(), requests);
    }

    /// Accepts every order after yielding, like a checker reading the chain.
    struct Yielding;

    impl FundsChecker for Yielding {
        fn check<'a>(
            &'a self,
            _owner: Address,
            _token: &'a Token,
            _required: U256,
            _spender: Address,
        ) -> BoxFuture<'a, Result<(), DexError>> {
            Box::pin(async {
                tokio::task::yield_now().await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_client_order_id() {
        let rpc = Arc::new(MockChain::new());
        let connector = testing::connector(&rpc).with_funds(Yielding);

        let (sell_a, sell_b) = (sell(), sell());
        let (first, second) =
            tokio::join!(connector.place("a", &sell_a), connector.place("a", &sell_b));
        assert!(first.is_ok());
        assert!(matches!(second, Err(DexError::DuplicateOrder(id)) if id == "a"));
        assert_eq!(rpc.sent().len(), 1);
        assert_eq!(connector.orders().len(), 1);
        assert_eq!(connector.status("a").unwrap().state(), OrderState::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn test_order_not_broadcast_yet() {
        let rpc = Arc::new(MockChain::new());
        let connector = testing::connector(&rpc).with_funds(Yielding);

        let request = sell();
        let (placed, cancelled, confirmed) = tokio::join!(
            connector.place("a", &request),
            connector.cancel("a"),
            connector.confirm("a")
        );
        assert!(placed.is_ok());
        assert!(matches!(cancelled, Err(DexError::NotBroadcast(id)) if id == "a"));
        assert!(matches!(confirmed, Err(DexError::NotBroadcast(_))));
        assert_eq!(rpc.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_placement_frees_client_order_id() {
        let rpc = Arc::new(MockChain::new());
        rpc.push_outcome(Outcome::Reject("nonce too low".into()));
        let connector = testing::connector(&rpc);

        let err = connector.place("a", &sell()).await.unwrap_err();
        assert!(matches!(err, DexError::SubmissionFailed { .. }));
        assert!(connector.status("a").is_none());

        let handle = connector.place("a", &sell()).await.unwrap();
        assert_eq!(connector.status("a").unwrap().tx_hash(), handle.tx_hash);
    }

    #[tokio::test]
    async fn test_market_slippage_out_of_range() {
        let rpc = Arc::new(MockChain::new());
        let config = ConnectorConfig { market_slippage: udec64!(1.5), ..Default::default() };
        let connector = testing::connector_with(&rpc, config);
        let market = OrderRequest::new(
            TradingPair::new("STT", "USDC"),
            OrderSide::Ask,
            OrderType::Market,
            udec64!(1),
            udec64!(2.5),
        );

        assert!(matches!(
            connector.place("a", &market).await,
            Err(DexError::InvalidArgument(_))
        ));
        assert_eq!(rpc.requests(), 0);
        assert!(connector.status("a").is_none());
    }

    #[tokio::test]
    async fn test_market_order_crosses_by_slippage() {
        let rpc = Arc::new(MockChain::new());
        let connector = testing::connector(&rpc);
        let market = OrderRequest::new(
            TradingPair::new("WBTC", "USDC"),
            OrderSide::Bid,
            OrderType::Market,
            udec64!(0.5),
            udec64!(60000),
        );

        connector.place("a", &market).await.unwrap();
        let sent = rpc.sent();
        let call = MatchingEngine::limitBuyCall::abi_decode(&sent[0].data).unwrap();
        // 60000 * 1.003
        assert_eq!(call.price, U256::from(6_018_000_000_000u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_in_lock() {
        let rpc = Arc::new(MockChain::new());
        rpc.push_outcome(Outcome::Success(vec![testing::order_placed(42, false)]));
        let config = ConnectorConfig { confirm_in_lock: true, ..Default::default() };
        let connector = testing::connector_with(&rpc, config);

        let handle = connector.place("a", &sell()).await.unwrap();
        assert_eq!(handle.entry_point, EntryPoint::LimitSellEth);
        assert_eq!(handle.outcome, Some(ConfirmOutcome::Open(42)));
        assert_eq!(connector.status("a").unwrap().order_id(), Some(42));

        // Recorded outcome, no further lookups
        let lookups = rpc.receipt_lookups(handle.tx_hash);
        assert_eq!(connector.confirm("a").await.unwrap(), ConfirmOutcome::Open(42));
        assert_eq!(rpc.receipt_lookups(handle.tx_hash), lookups);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats() {
        let rpc = Arc::new(MockChain::new());
        rpc.push_outcome(Outcome::Success(vec![testing::order_placed(1, false)]));
        rpc.push_outcome(Outcome::Revert { gas_used: 40_000 });
        rpc.push_outcome(Outcome::Reject("nonce too low".into()));
        rpc.push_outcome(Outcome::Pending);
        let config = ConnectorConfig {
            poll: PollPolicy { interval: Duration::from_secs(1), timeout: Duration::from_secs(3) },
            ..Default::default()
        };
        let connector = testing::connector_with(&rpc, config);

        connector.place("a", &sell()).await.unwrap();
        connector.place("b", &sell()).await.unwrap();
        assert!(matches!(
            connector.place("c", &sell()).await,
            Err(DexError::SubmissionFailed { .. })
        ));
        connector.place("d", &sell()).await.unwrap();
        for id in ["a", "b", "d"] {
            connector.confirm(id).await.unwrap();
        }

        let stats = connector.stats();
        assert_eq!(stats.submitted(), 3);
        assert_eq!(stats.submission_failures(), 1);
        assert_eq!(stats.confirmed(), 1);
        assert_eq!(stats.reverted(), 1);
        assert_eq!(stats.timed_out(), 1);
        assert_eq!(stats.gas_used(), 120_000 + 40_000);
        // Rejection and revert
        assert_eq!(connector.limiter().errors(), 2);
        assert!(connector.status("c").is_none());
    }

    #[tokio::test]
    async fn test_adopt() {
        let rpc = Arc::new(MockChain::new());
        let connector = testing::connector(&rpc);
        let pair = TradingPair::new("STT", "USDC");

        let open =
            connector.adopt("a", &pair, OrderSide::Bid, TxHash::repeat_byte(1), Some(7)).unwrap();
        assert_eq!(open.state(), OrderState::Open);
        assert_eq!(open.order_id(), Some(7));

        let pending =
            connector.adopt("b", &pair, OrderSide::Bid, TxHash::repeat_byte(2), None).unwrap();
        assert_eq!(pending.state(), OrderState::AwaitingConfirmation);
        assert_eq!(connector.orders().len(), 2);
        assert!(matches!(
            connector.adopt("a", &pair, OrderSide::Bid, TxHash::repeat_byte(3), None),
            Err(DexError::DuplicateOrder(_))
        ));
    }
}
