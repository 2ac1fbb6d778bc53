//! Node-free test environment.
//!
//! [`MockChain`] stands in for the JSON-RPC node; the functions below build
//! the testnet deployment, a funded signer and the lifecycle components wired
//! to a mock chain.

mod chain;

use std::sync::Arc;

use alloy::{
    primitives::{Address, Log, U256},
    signers::local::PrivateKeySigner,
    sol_types::SolEvent,
};
pub use chain::{CallResponse, MockChain, Outcome};

use crate::{
    Chain,
    abi::matching_engine::MatchingEngine,
    connector::{Connector, ConnectorConfig},
    funds::Unchecked,
    tx::{ConfirmationPoller, GasPolicy, NonceAllocator, Pipeline, PollPolicy, TransactionSubmitter},
    types::Token,
};

/// First well-known development key.
const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Testnet deployment.
pub fn chain() -> Chain { Chain::testnet() }

pub fn signer() -> PrivateKeySigner {
    TEST_KEY.parse().expect("development key is valid")
}

/// Address of [`signer`].
pub fn wallet() -> Address { signer().address() }

/// Native testnet token.
pub fn stt() -> Token { token("STT") }

pub fn usdc() -> Token { token("USDC") }

pub fn wbtc() -> Token { token("WBTC") }

fn token(symbol: &str) -> Token {
    chain().tokens().iter().find(|t| t.symbol() == symbol).cloned().expect("testnet token")
}

/// Transaction pipeline of [`signer`] over `rpc`.
pub fn pipeline(rpc: &Arc<MockChain>) -> Pipeline<MockChain> {
    let chain = chain();
    Pipeline::new(
        rpc.clone(),
        Arc::new(NonceAllocator::new()),
        TransactionSubmitter::new(rpc.clone(), signer(), chain.chain_id(), GasPolicy::default()),
        ConfirmationPoller::new(rpc.clone(), PollPolicy::default()),
    )
}

/// Connector of [`signer`] over `rpc` with default configuration and funds
/// checks disabled.
pub fn connector(rpc: &Arc<MockChain>) -> Connector<MockChain> {
    connector_with(rpc, ConnectorConfig::default())
}

pub fn connector_with(rpc: &Arc<MockChain>, config: ConnectorConfig) -> Connector<MockChain> {
    Connector::new(chain(), rpc.clone(), signer(), config).with_funds(Unchecked)
}

/// `OrderPlaced` log emitted by the exchange for an order of [`wallet`].
pub fn order_placed(id: u32, is_bid: bool) -> Log {
    let event = MatchingEngine::OrderPlaced {
        orderbook: Address::repeat_byte(0x0b),
        id,
        owner: wallet(),
        isBid: is_bid,
        price: U256::from(250_000_000),
        withoutFee: U256::from(1_000_000),
        placed: U256::from(1_000_000),
    };
    Log { address: chain().exchange(), data: event.encode_log_data() }
}

/// `OrderMatched` log emitted by the exchange.
pub fn order_matched(id: u32, is_bid: bool) -> Log {
    let event = MatchingEngine::OrderMatched {
        orderbook: Address::repeat_byte(0x0b),
        id,
        isBid: is_bid,
        sender: wallet(),
        owner: Address::repeat_byte(0x0c),
        price: U256::from(250_000_000),
        amount: U256::from(1_000_000),
        clear: true,
    };
    Log { address: chain().exchange(), data: event.encode_log_data() }
}

/// `OrderCanceled` log emitted by the exchange.
pub fn order_canceled(id: u32, is_bid: bool) -> Log {
    let event = MatchingEngine::OrderCanceled {
        orderbook: Address::repeat_byte(0x0b),
        id,
        isBid: is_bid,
        owner: wallet(),
        amount: U256::from(1_000_000),
    };
    Log { address: chain().exchange(), data: event.encode_log_data() }
}
