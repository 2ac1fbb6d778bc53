use std::{sync::Arc, time::Duration};

use alloy::{primitives::U256, sol_types::SolCall};
use fastnum::{UD64, udec64};
use standard_sdk::{
    abi::matching_engine::MatchingEngine,
    cancel::{CancelOutcome, LocalCancelReason},
    connector::ConfirmOutcome,
    error::DexError,
    limiter::ErrorRateLimiter,
    state::{OrderRef, OrderState},
    testing::{self, MockChain, Outcome},
    tx::EntryPoint,
    types::{OrderRequest, OrderSide},
};

fn order(pair: &str, side: OrderSide, amount: UD64, price: UD64) -> OrderRequest {
    OrderRequest::limit(pair.parse().unwrap(), side, amount, price)
}

/// Sells native base against USDC and resolves the order id from the receipt.
#[tokio::test(start_paused = true)]
async fn test_native_sell_resolves_open_order() {
    let rpc = Arc::new(MockChain::new());
    rpc.push_outcome(Outcome::Success(vec![testing::order_placed(42, false)]));
    let connector = testing::connector(&rpc);

    let handle = connector
        .place("sell-1", &order("STT-USDC", OrderSide::Ask, udec64!(1.0), udec64!(2.50)))
        .await
        .unwrap();
    assert_eq!(handle.entry_point, EntryPoint::LimitSellEth);
    assert_eq!(handle.nonce, 0);
    assert_eq!(handle.outcome, None);

    let sent = rpc.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, testing::chain().exchange());
    assert_eq!(sent[0].value, U256::from(1_000_000_000_000_000_000u128));
    let call = MatchingEngine::limitSellETHCall::abi_decode(&sent[0].data).unwrap();
    assert_eq!(call.price, U256::from(250_000_000));
    assert_eq!(call.quote, testing::usdc().address());

    let pending = connector.status("sell-1").unwrap();
    assert_eq!(pending.state(), OrderState::AwaitingConfirmation);
    assert_eq!(pending.order_ref(), Some(OrderRef::Placeholder(handle.tx_hash)));

    assert_eq!(connector.confirm("sell-1").await.unwrap(), ConfirmOutcome::Open(42));
    let open = connector.status("sell-1").unwrap();
    assert_eq!(open.state(), OrderState::Open);
    assert_eq!(open.order_id(), Some(42));
    assert_eq!(open.tx_hash(), handle.tx_hash);
}

/// Order crossing the book entirely is never cancelled on-chain.
#[tokio::test(start_paused = true)]
async fn test_immediately_filled_order_cancels_locally() {
    let rpc = Arc::new(MockChain::new());
    rpc.push_outcome(Outcome::Success(vec![
        testing::order_matched(5, false),
        testing::order_matched(6, false),
    ]));
    let connector = testing::connector(&rpc);

    connector
        .place("buy-1", &order("STT-USDC", OrderSide::Bid, udec64!(2), udec64!(2.50)))
        .await
        .unwrap();
    assert_eq!(connector.confirm("buy-1").await.unwrap(), ConfirmOutcome::ImmediatelyFilled);
    let filled = connector.status("buy-1").unwrap();
    assert_eq!(filled.state(), OrderState::ImmediatelyFilled);
    assert_eq!(filled.order_id(), None);

    let requests = rpc.requests();
    assert_eq!(
        connector.cancel("buy-1").await.unwrap(),
        CancelOutcome::LocallyCancelledOnly { reason: LocalCancelReason::ImmediatelyFilled }
    );
    assert_eq!(rpc.requests(), requests);
    assert!(connector.status("buy-1").is_none());
}

/// Reverted placement near the gas limit is annotated as out of gas.
#[tokio::test(start_paused = true)]
async fn test_reverted_placement() {
    let rpc = Arc::new(MockChain::new());
    rpc.set_gas_estimate(None);
    rpc.push_outcome(Outcome::Revert { gas_used: 2_950_000 });
    let connector = testing::connector(&rpc);

    connector
        .place("sell-1", &order("WBTC-USDC", OrderSide::Ask, udec64!(0.1), udec64!(60000)))
        .await
        .unwrap();
    assert_eq!(rpc.sent()[0].gas_limit, 3_000_000);

    let ConfirmOutcome::Failed(reason) = connector.confirm("sell-1").await.unwrap() else {
        panic!("placement should have failed");
    };
    assert!(reason.is_out_of_gas());
    assert_eq!(reason.gas_limit(), Some(3_000_000));

    let failed = connector.status("sell-1").unwrap();
    assert_eq!(failed.state(), OrderState::Failed);
    assert_eq!(failed.failure(), Some(&reason));
    assert_eq!(
        connector.cancel("sell-1").await.unwrap(),
        CancelOutcome::LocallyCancelledOnly { reason: LocalCancelReason::NothingOnChain }
    );
}

/// Missing receipt leaves the order tracked under its placement hash.
#[tokio::test(start_paused = true)]
async fn test_timeout_is_indeterminate() {
    let rpc = Arc::new(MockChain::new());
    rpc.push_outcome(Outcome::Pending);
    let connector = testing::connector(&rpc);

    let handle = connector
        .place("sell-1", &order("STT-USDC", OrderSide::Ask, udec64!(1), udec64!(2.5)))
        .await
        .unwrap();
    assert_eq!(connector.confirm("sell-1").await.unwrap(), ConfirmOutcome::TimedOut);
    assert_eq!(rpc.receipt_lookups(handle.tx_hash), 30);

    let record = connector.status("sell-1").unwrap();
    assert_eq!(record.state(), OrderState::AwaitingConfirmation);
    assert_eq!(record.order_ref(), Some(OrderRef::Placeholder(handle.tx_hash)));
    assert_eq!(connector.stats().timed_out(), 1);

    // Next placement does not reuse the nonce
    let next = connector
        .place("sell-2", &order("STT-USDC", OrderSide::Ask, udec64!(1), udec64!(2.5)))
        .await
        .unwrap();
    assert_eq!(next.nonce, handle.nonce + 1);
}

/// Shutdown stops polling but keeps the broadcast order tracked.
#[tokio::test(start_paused = true)]
async fn test_shutdown_during_confirmation() {
    let rpc = Arc::new(MockChain::new());
    rpc.push_outcome(Outcome::Pending);
    let connector = testing::connector(&rpc);

    let handle = connector
        .place("sell-1", &order("STT-USDC", OrderSide::Ask, udec64!(1), udec64!(2.5)))
        .await
        .unwrap();
    let shutdown = connector.shutdown_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(4500)).await;
        shutdown.cancel();
    });

    let err = connector.confirm("sell-1").await.unwrap_err();
    assert!(matches!(err, DexError::Shutdown { tx_hash } if tx_hash == handle.tx_hash));
    assert_eq!(err.tx_hash(), Some(handle.tx_hash));
    assert_eq!(connector.status("sell-1").unwrap().state(), OrderState::AwaitingConfirmation);
}

/// Concurrent placements of one wallet get distinct, gapless nonces.
#[tokio::test(start_paused = true)]
async fn test_concurrent_placements() {
    let rpc = Arc::new(MockChain::new());
    rpc.set_pending_nonce(11);
    let connector = Arc::new(testing::connector(&rpc));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let connector = connector.clone();
            tokio::spawn(async move {
                let request = order("STT-USDC", OrderSide::Ask, udec64!(1), udec64!(2.5));
                connector.place(format!("sell-{i}"), &request).await.unwrap().nonce
            })
        })
        .collect();

    let mut nonces = Vec::new();
    for task in tasks {
        nonces.push(task.await.unwrap());
    }
    nonces.sort();
    assert_eq!(nonces, (11..19).collect::<Vec<_>>());

    let sent: Vec<_> = rpc.sent().iter().map(|tx| tx.nonce).collect();
    assert_eq!(sent, (11..19).collect::<Vec<_>>());
    assert_eq!(connector.orders().len(), 8);
}

/// Rejected broadcasts are terminal and count towards the error limit.
#[tokio::test(start_paused = true)]
async fn test_error_rate_limit() {
    let rpc = Arc::new(MockChain::new());
    rpc.push_outcome(Outcome::Reject("replacement transaction underpriced".into()));
    rpc.push_outcome(Outcome::Reject("replacement transaction underpriced".into()));
    let limiter = Arc::new(ErrorRateLimiter::new(2, Duration::from_secs(60)));
    let connector = testing::connector(&rpc).with_limiter(limiter.clone());
    let request = order("STT-USDC", OrderSide::Ask, udec64!(1), udec64!(2.5));

    for id in ["a", "b"] {
        let err = connector.place(id, &request).await.unwrap_err();
        assert!(matches!(err, DexError::SubmissionFailed { .. }));
        assert!(err.tx_hash().is_some());
        assert!(connector.status(id).is_none());
    }

    let requests = rpc.requests();
    assert!(matches!(
        connector.place("c", &request).await,
        Err(DexError::ErrorRateExceeded { errors: 2, .. })
    ));
    assert_eq!(rpc.requests(), requests);

    tokio::time::advance(Duration::from_secs(61)).await;
    let handle = connector.place("c", &request).await.unwrap();
    // Rejected nonces are not rewound
    assert_eq!(handle.nonce, 2);
}
