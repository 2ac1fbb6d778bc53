use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use alloy::primitives::{Address, Bytes, Log, TxHash, U256};

use crate::{
    error::DexError,
    rpc::{ChainRpc, SignedTx},
    types::{CallRequest, Receipt, TxRequest},
};

/// What happens to the next broadcast transaction.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Mined successfully with the given logs.
    Success(Vec<Log>),
    /// Mined and reverted after using `gas_used`.
    Revert { gas_used: u64 },
    /// Accepted but never mined.
    Pending,
    /// Rejected by the node.
    Reject(String),
}

/// Scripted `eth_call` result.
#[derive(Clone, Debug)]
pub enum CallResponse {
    Return(Bytes),
    Revert(String),
}

/// In-memory [`ChainRpc`] with scripted responses.
///
/// Broadcasts consume [`Outcome`]s in order, defaulting to a successful
/// receipt without logs. Every RPC method invocation is counted, see
/// [`MockChain::requests`].
#[derive(Debug)]
pub struct MockChain {
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    pending_nonce: Option<u64>,
    gas_estimate: Option<u64>,
    gas_price: Option<u128>,
    receipt_delay: u32,
    block_number: u64,
    outcomes: VecDeque<Outcome>,
    sent: Vec<(TxHash, TxRequest)>,
    receipts: HashMap<TxHash, Option<Receipt>>,
    lookups: HashMap<TxHash, u32>,
    call_responses: HashMap<[u8; 4], CallResponse>,
    calls: Vec<(TxRequest, Option<u64>)>,
    balances: HashMap<Address, U256>,
    requests: usize,
}

impl Default for MockChain {
    fn default() -> Self { Self::new() }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                pending_nonce: Some(0),
                gas_estimate: Some(21_000),
                gas_price: Some(1_000_000_000),
                receipt_delay: 0,
                block_number: 100,
                outcomes: VecDeque::new(),
                sent: Vec::new(),
                receipts: HashMap::new(),
                lookups: HashMap::new(),
                call_responses: HashMap::new(),
                calls: Vec::new(),
                balances: HashMap::new(),
                requests: 0,
            }),
        }
    }

    pub fn set_pending_nonce(&self, nonce: u64) {
        self.state.lock().unwrap().pending_nonce = Some(nonce)
    }

    /// Makes `eth_getTransactionCount` fail.
    pub fn fail_pending_nonce(&self) { self.state.lock().unwrap().pending_nonce = None }

    /// `None` makes `eth_estimateGas` fail.
    pub fn set_gas_estimate(&self, estimate: Option<u64>) {
        self.state.lock().unwrap().gas_estimate = estimate
    }

    /// `None` makes `eth_gasPrice` fail.
    pub fn set_gas_price(&self, price: Option<u128>) {
        self.state.lock().unwrap().gas_price = price
    }

    /// Number of receipt lookups answered with `null` before a mined receipt
    /// becomes visible.
    pub fn set_receipt_delay(&self, lookups: u32) {
        self.state.lock().unwrap().receipt_delay = lookups
    }

    pub fn push_outcome(&self, outcome: Outcome) {
        self.state.lock().unwrap().outcomes.push_back(outcome)
    }

    /// Scripts `eth_call` for calls with the given selector.
    pub fn on_call(&self, selector: [u8; 4], response: CallResponse) {
        self.state.lock().unwrap().call_responses.insert(selector, response);
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state.lock().unwrap().balances.insert(address, balance);
    }

    /// Transactions accepted by [`ChainRpc::send_raw_transaction`].
    pub fn sent(&self) -> Vec<TxRequest> {
        self.state.lock().unwrap().sent.iter().map(|(_, tx)| tx.clone()).collect()
    }

    /// Hashes of accepted transactions, in broadcast order.
    pub fn transaction_hashes(&self) -> Vec<TxHash> {
        self.state.lock().unwrap().sent.iter().map(|(hash, _)| *hash).collect()
    }

    /// `eth_call`s made so far with the block they were pinned to.
    pub fn calls(&self) -> Vec<(TxRequest, Option<u64>)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn receipt_lookups(&self, tx_hash: TxHash) -> u32 {
        self.state.lock().unwrap().lookups.get(&tx_hash).copied().unwrap_or_default()
    }

    /// Total number of RPC requests served.
    pub fn requests(&self) -> usize { self.state.lock().unwrap().requests }

    fn request(&self) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        state.requests += 1;
        state
    }
}

impl ChainRpc for MockChain {
    async fn pending_nonce(&self, _address: Address) -> Result<u64, DexError> {
        self.request()
            .pending_nonce
            .ok_or_else(|| DexError::InvalidRequest("eth_getTransactionCount unavailable".into()))
    }

    async fn estimate_gas(&self, _from: Address, _call: &CallRequest) -> Result<u64, DexError> {
        self.request()
            .gas_estimate
            .ok_or_else(|| DexError::GasEstimationFailed("execution reverted".into()))
    }

    async fn gas_price(&self) -> Result<u128, DexError> {
        self.request()
            .gas_price
            .ok_or_else(|| DexError::InvalidRequest("eth_gasPrice unavailable".into()))
    }

    async fn send_raw_transaction(&self, tx: &SignedTx) -> Result<TxHash, DexError> {
        let mut state = self.request();
        let outcome = state.outcomes.pop_front().unwrap_or(Outcome::Success(Vec::new()));
        let receipt = match outcome {
            Outcome::Reject(reason) => return Err(DexError::InvalidRequest(reason)),
            Outcome::Pending => None,
            Outcome::Success(logs) => {
                state.block_number += 1;
                Some(Receipt {
                    tx_hash: tx.hash,
                    block_number: state.block_number,
                    success: true,
                    gas_used: 120_000,
                    logs,
                })
            },
            Outcome::Revert { gas_used } => {
                state.block_number += 1;
                Some(Receipt {
                    tx_hash: tx.hash,
                    block_number: state.block_number,
                    success: false,
                    gas_used,
                    logs: Vec::new(),
                })
            },
        };

        state.sent.push((tx.hash, tx.request.clone()));
        state.receipts.insert(tx.hash, receipt);
        if let Some(pending) = state.pending_nonce {
            state.pending_nonce = Some(pending.max(tx.request.nonce + 1));
        }
        Ok(tx.hash)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, DexError> {
        let mut state = self.request();
        let delay = state.receipt_delay;
        let lookups = state.lookups.entry(tx_hash).or_default();
        *lookups += 1;
        if *lookups <= delay {
            return Ok(None);
        }
        Ok(state.receipts.get(&tx_hash).cloned().flatten())
    }

    async fn call(&self, tx: &TxRequest, block: Option<u64>) -> Result<Bytes, DexError> {
        let mut state = self.request();
        state.calls.push((tx.clone(), block));
        let response = tx.call().selector().and_then(|s| state.call_responses.get(&s).cloned());
        match response {
            Some(CallResponse::Return(data)) => Ok(data),
            Some(CallResponse::Revert(message)) => {
                Err(DexError::ExecutionReverted { message, data: None })
            },
            None => Err(DexError::InvalidRequest("eth_call not scripted".into())),
        }
    }

    async fn transaction(&self, tx_hash: TxHash) -> Result<Option<TxRequest>, DexError> {
        let state = self.request();
        Ok(state.sent.iter().find(|(hash, _)| *hash == tx_hash).map(|(_, tx)| tx.clone()))
    }

    async fn balance(&self, address: Address) -> Result<U256, DexError> {
        Ok(self.request().balances.get(&address).copied().unwrap_or_default())
    }
}
