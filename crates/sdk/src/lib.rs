//! [`Standard`] order book SDK.
//!
//! # Overview
//!
//! Places and cancels orders on the Standard on-chain matching engine and
//! tracks each order through its transaction lifecycle.
//!
//! Use [`connector::Connector`] as the entry point: it resolves tokens, checks
//! funds, encodes the matching engine call with [`tx::TransactionBuilder`],
//! allocates a nonce under the wallet lock, signs and broadcasts, then turns
//! the receipt into an on-chain order id with [`events::decode`]. Orders are
//! tracked in [`state::OrderRegistry`] and cancelled through
//! [`cancel::CancellationRouter`], which tries the batched entry point first
//! and the single-order one second.
//!
//! Lower level building blocks ([`tx::Pipeline`], [`tx::ConfirmationPoller`],
//! [`tx::NonceAllocator`]) can be used on their own.
//!
//! See `./tests` for examples.
//!
//! # Limitations/follow-ups
//!
//! * Only legacy (`gasPrice`) transactions are sent.
//!
//! * A broadcast rejected by the node consumes its nonce locally; the next
//!   transaction of the wallet will not be mined until the gap is filled.
//!
//! # Features
//!
//! | Feature | Default | Description |
//! | --- | --- | --- |
//! | `display` | yes | Enables [`tabled::Tabled`] implementation for state types. |
//! | `testing` | yes | Enables [`testing`] module. |
//!
//! # Testing
//!
//! [`testing`] module provides a scripted in-memory chain implementing
//! [`rpc::ChainRpc`] together with testnet fixtures.
//!
//!
//! [`Standard`]: https://standardweb3.com

pub mod abi;
pub mod cancel;
pub mod connector;
pub mod error;
pub mod events;
pub mod funds;
pub mod limiter;
pub mod num;
pub mod rpc;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tx;
pub mod types;

use alloy::primitives::{Address, address};

use crate::types::Token;

#[derive(Clone, Debug)]
/// Matching engine deployment the connector is operating on.
pub struct Chain {
    chain_id: u64,
    exchange: Address,
    tokens: Vec<Token>,
    price_decimals: u8,
    max_matches: u32,
}

impl Chain {
    /// Price precision of the matching engine.
    pub const PRICE_DECIMALS: u8 = 8;

    /// Resting orders a new order may match against in one transaction.
    pub const MAX_MATCHES: u32 = 2;

    pub fn mainnet() -> Self {
        Self {
            chain_id: 5031,
            exchange: address!("0x3Cb2CBb0CeB96c9456b11DbC7ab73c4848F9a14c"),
            tokens: vec![
                Token::native("SOMI", address!("0x046ede9564a72571df6f5e44d0405360c0f4dcab"), 18),
                Token::new("USDC", address!("0x28BEc7E30E6faee657a03e19Bf1128AaD7632A00"), 6),
            ],
            price_decimals: Self::PRICE_DECIMALS,
            max_matches: Self::MAX_MATCHES,
        }
    }

    pub fn testnet() -> Self {
        Self {
            chain_id: 50312,
            exchange: address!("0x0d3251EF0D66b60C4E387FC95462Bf274e50CBE1"),
            tokens: vec![
                Token::native("STT", address!("0x4A3BC48C156384f9564Fd65A53a2f3D534D8f2b7"), 18),
                Token::new("USDC", address!("0x0ED782B8079529f7385c3eDA9fAf1EaA0DbC6a17"), 6),
                Token::new("WBTC", address!("0x54597df4E4A6385B77F39d458Eb75443A8f9Aa9e"), 8),
            ],
            price_decimals: Self::PRICE_DECIMALS,
            max_matches: Self::MAX_MATCHES,
        }
    }

    pub fn custom(
        chain_id: u64,
        exchange: Address,
        tokens: Vec<Token>,
        price_decimals: u8,
        max_matches: u32,
    ) -> Self {
        Self { chain_id, exchange, tokens, price_decimals, max_matches }
    }

    pub fn chain_id(&self) -> u64 { self.chain_id }

    pub fn exchange(&self) -> Address { self.exchange }

    pub fn tokens(&self) -> &[Token] { &self.tokens }

    pub fn price_decimals(&self) -> u8 { self.price_decimals }

    pub fn max_matches(&self) -> u32 { self.max_matches }

    /// Looks up a token by symbol, case-insensitively.
    pub fn token(&self, symbol: &str) -> Option<&Token> {
        self.tokens.iter().find(|token| token.symbol().eq_ignore_ascii_case(symbol))
    }

    /// Replaces or adds a token.
    pub fn with_token(mut self, token: Token) -> Self {
        self.tokens.retain(|t| !t.symbol().eq_ignore_ascii_case(token.symbol()));
        self.tokens.push(token);
        self
    }
}
