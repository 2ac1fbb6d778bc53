use std::time::Duration;

use alloy::{
    primitives::{Bytes, TxHash, U256},
    transports::TransportError,
};
use thiserror::Error;

use crate::{tx::confirm::RevertReason, types::ClientOrderId};

/// Errors raised by the order submission and transaction lifecycle.
///
/// Token, address and funds problems are raised before any transaction is
/// signed. Every variant describing a broadcast transaction carries its hash,
/// see [`DexError::tx_hash`].
#[derive(Debug, Error)]
pub enum DexError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Symbol is not in the token registry or resolves to the zero address.
    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("insufficient {token} balance: required {required}, available {available}")]
    InsufficientBalance { token: String, required: U256, available: U256 },

    #[error("insufficient {token} allowance: required {required}, approved {approved}")]
    InsufficientAllowance { token: String, required: U256, approved: U256 },

    /// Gas estimation failed. Recoverable: the submitter falls back to the
    /// default gas limit and only logs this.
    #[error("gas estimation failed: {0}")]
    GasEstimationFailed(String),

    #[error("signing failed: {0}")]
    Signing(String),

    /// Node rejected the broadcast. Terminal, never retried automatically.
    #[error("submission of {tx_hash} failed: {reason}")]
    SubmissionFailed { tx_hash: TxHash, reason: String },

    #[error("transaction {tx_hash} reverted: {reason}")]
    TransactionReverted { tx_hash: TxHash, reason: RevertReason },

    /// Receipt was not observed in time. The transaction may still be mined.
    #[error("transaction {tx_hash} not confirmed within {timeout:?}")]
    ConfirmationTimedOut { tx_hash: TxHash, timeout: Duration },

    /// Order is on-chain but its id could not be decoded from the receipt.
    #[error("order id of transaction {tx_hash} could not be resolved")]
    OrderIdUnresolved { tx_hash: TxHash },

    #[error("all cancellation channels failed for order {0}")]
    CancellationExhausted(ClientOrderId),

    /// `eth_call` reverted, carrying the node message and raw revert data.
    #[error("{message}")]
    ExecutionReverted { message: String, data: Option<Bytes> },

    #[error("unknown order: {0}")]
    UnknownOrder(ClientOrderId),

    #[error("duplicate client order id: {0}")]
    DuplicateOrder(ClientOrderId),

    /// Placement of the order is still being signed or broadcast.
    #[error("order {0} is not broadcast yet")]
    NotBroadcast(ClientOrderId),

    #[error("{errors} errors within {window:?}, refusing new orders")]
    ErrorRateExceeded { errors: usize, window: Duration },

    #[error("shutdown requested while awaiting {tx_hash}")]
    Shutdown { tx_hash: TxHash },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Abi(#[from] alloy::sol_types::Error),
}

impl DexError {
    /// Hash of the transaction the error relates to, if one was broadcast.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            DexError::SubmissionFailed { tx_hash, .. }
            | DexError::TransactionReverted { tx_hash, .. }
            | DexError::ConfirmationTimedOut { tx_hash, .. }
            | DexError::OrderIdUnresolved { tx_hash }
            | DexError::Shutdown { tx_hash } => Some(*tx_hash),
            _ => None,
        }
    }

    /// Whether the error was raised before anything reached the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            DexError::InvalidArgument(_)
                | DexError::InvalidRequest(_)
                | DexError::UnknownToken(_)
                | DexError::DuplicateOrder(_)
                | DexError::NotBroadcast(_)
                | DexError::ErrorRateExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_hash_carried_by_terminal_errors() {
        let tx_hash = TxHash::repeat_byte(7);
        let err = DexError::SubmissionFailed { tx_hash, reason: "nonce too low".to_string() };
        assert_eq!(err.tx_hash(), Some(tx_hash));
        assert_eq!(err.to_string(), format!("submission of {tx_hash} failed: nonce too low"));

        let err = DexError::UnknownToken("DOGE".to_string());
        assert_eq!(err.tx_hash(), None);
        assert!(err.is_local());
    }
}
