use alloy::primitives::{Address, Bytes, Log, TxHash, U256};

/// Contract call to be sent as a transaction, before nonce and gas are known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl CallRequest {
    pub fn new(to: Address, data: impl Into<Bytes>, value: U256) -> Self {
        Self { to, data: data.into(), value }
    }

    /// Zero-value read-only call.
    pub fn view(to: Address, data: impl Into<Bytes>) -> Self { Self::new(to, data, U256::ZERO) }

    /// 4-byte function selector of the call data, if present.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// Fully specified legacy transaction.
///
/// Built fresh for every submission attempt and never modified once signed.
/// Zero `gas_limit` / `gas_price` mean "unset" when used for `eth_call`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

impl TxRequest {
    /// Unsigned request for an `eth_call` of `call` from `from`.
    pub fn view(from: Address, call: &CallRequest) -> Self {
        Self {
            from,
            to: call.to,
            data: call.data.clone(),
            value: call.value,
            nonce: 0,
            gas_limit: 0,
            gas_price: 0,
            chain_id: 0,
        }
    }

    pub fn call(&self) -> CallRequest { CallRequest::new(self.to, self.data.clone(), self.value) }
}

/// Mined transaction receipt, reduced to what the lifecycle needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub success: bool,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}
