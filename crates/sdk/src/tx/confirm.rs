use std::{fmt::Display, sync::Arc, time::Duration};

use alloy::{primitives::TxHash, sol_types::decode_revert_reason};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{error::DexError, rpc::ChainRpc, types::Receipt};

/// Receipt polling cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: Duration::from_secs(1), timeout: Duration::from_secs(30) }
    }
}

impl PollPolicy {
    /// Number of receipt lookups that fit into `timeout`, at least one.
    pub fn attempts(&self, timeout: Duration) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let attempts = timeout.as_millis().div_ceil(self.interval.as_millis());
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

/// Gas usage at or above this share of the limit marks a revert as likely out
/// of gas.
const OUT_OF_GAS_PERCENT: u64 = 95;

/// Rough classification of why a transaction failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    OutOfGas,
    Nonce,
    InsufficientFunds,
    ContractRevert,
    Unknown,
}

impl Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCategory::OutOfGas => write!(f, "out of gas"),
            FailureCategory::Nonce => write!(f, "nonce"),
            FailureCategory::InsufficientFunds => write!(f, "insufficient funds"),
            FailureCategory::ContractRevert => write!(f, "contract revert"),
            FailureCategory::Unknown => write!(f, "unknown"),
        }
    }
}

/// What is known about a reverted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevertReason {
    message: Option<String>,
    gas_used: u64,
    gas_limit: Option<u64>,
}

impl RevertReason {
    pub fn new(message: Option<String>, gas_used: u64, gas_limit: Option<u64>) -> Self {
        Self { message, gas_used, gas_limit }
    }

    /// Revert message recovered by replaying the call, if any.
    pub fn message(&self) -> Option<&str> { self.message.as_deref() }

    pub fn gas_used(&self) -> u64 { self.gas_used }

    pub fn gas_limit(&self) -> Option<u64> { self.gas_limit }

    /// Gas used reached 95% of the limit.
    pub fn is_out_of_gas(&self) -> bool {
        self.gas_limit.is_some_and(|limit| {
            u128::from(self.gas_used) * 100 >= u128::from(limit) * u128::from(OUT_OF_GAS_PERCENT)
        })
    }

    pub fn category(&self) -> FailureCategory {
        if self.is_out_of_gas() {
            return FailureCategory::OutOfGas;
        }
        let Some(message) = &self.message else {
            return FailureCategory::Unknown;
        };
        let message = message.to_lowercase();
        if message.contains("out of gas") {
            FailureCategory::OutOfGas
        } else if message.contains("nonce") {
            FailureCategory::Nonce
        } else if message.contains("insufficient") || message.contains("balance") {
            FailureCategory::InsufficientFunds
        } else if message.contains("revert") {
            FailureCategory::ContractRevert
        } else {
            FailureCategory::Unknown
        }
    }
}

impl Display for RevertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{message}")?,
            None => write!(f, "no revert reason")?,
        }
        match self.gas_limit {
            Some(limit) if self.is_out_of_gas() => {
                write!(f, " (likely out of gas: used {} of {})", self.gas_used, limit)
            },
            _ => Ok(()),
        }
    }
}

/// Result of waiting for a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed(Receipt),
    Reverted { receipt: Receipt, reason: RevertReason },
    /// No receipt within the timeout. The transaction may still be mined, so
    /// this is indeterminate rather than a failure.
    TimedOut { tx_hash: TxHash, timeout: Duration },
}

/// Polls for transaction receipts.
///
/// Lookups are independent of the wallet lock, so any number of polls may run
/// concurrently.
pub struct ConfirmationPoller<R> {
    rpc: Arc<R>,
    policy: PollPolicy,
}

impl<R: ChainRpc> ConfirmationPoller<R> {
    pub fn new(rpc: Arc<R>, policy: PollPolicy) -> Self { Self { rpc, policy } }

    pub fn policy(&self) -> &PollPolicy { &self.policy }

    /// Waits for `tx_hash` using the default timeout.
    pub async fn confirm(
        &self,
        tx_hash: TxHash,
        shutdown: &CancellationToken,
    ) -> Result<Confirmation, DexError> {
        self.confirm_within(tx_hash, self.policy.timeout, shutdown).await
    }

    /// Polls until a receipt appears, `timeout` elapses or `shutdown` fires.
    ///
    /// Lookup errors are logged and polling continues. A shutdown only stops
    /// the polling, the transaction itself stays broadcast.
    pub async fn confirm_within(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
        shutdown: &CancellationToken,
    ) -> Result<Confirmation, DexError> {
        let attempts = self.policy.attempts(timeout);
        for attempt in 1..=attempts {
            if shutdown.is_cancelled() {
                return Err(DexError::Shutdown { tx_hash });
            }

            match self.rpc.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    info!(
                        %tx_hash,
                        block = receipt.block_number,
                        gas_used = receipt.gas_used,
                        "transaction confirmed"
                    );
                    return Ok(Confirmation::Confirmed(receipt));
                },
                Ok(Some(receipt)) => {
                    let reason = self.revert_reason(&receipt).await;
                    warn!(
                        %tx_hash,
                        block = receipt.block_number,
                        %reason,
                        category = %reason.category(),
                        "transaction reverted"
                    );
                    return Ok(Confirmation::Reverted { receipt, reason });
                },
                Ok(None) => debug!(%tx_hash, attempt, "receipt not available yet"),
                Err(err) => warn!(%tx_hash, attempt, %err, "receipt lookup failed"),
            }

            if attempt < attempts {
                tokio::select! {
                    _ = shutdown.cancelled() => return Err(DexError::Shutdown { tx_hash }),
                    _ = tokio::time::sleep(self.policy.interval) => {},
                }
            }
        }

        warn!(%tx_hash, ?timeout, "transaction not confirmed in time");
        Ok(Confirmation::TimedOut { tx_hash, timeout })
    }

    /// Replays the original call against the state before the receipt's block
    /// to recover the revert message.
    async fn revert_reason(&self, receipt: &Receipt) -> RevertReason {
        let tx = match self.rpc.transaction(receipt.tx_hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return RevertReason::new(None, receipt.gas_used, None),
            Err(err) => {
                debug!(tx_hash = %receipt.tx_hash, %err, "original transaction unavailable");
                return RevertReason::new(None, receipt.gas_used, None);
            },
        };

        let message = match self.rpc.call(&tx, Some(receipt.block_number.saturating_sub(1))).await
        {
            Err(DexError::ExecutionReverted { message, data }) => {
                match data.as_ref().and_then(|data| decode_revert_reason(data)) {
                    Some(reason) => Some(format!("execution reverted: {reason}")),
                    None => Some(message),
                }
            },
            Err(err) => {
                debug!(tx_hash = %receipt.tx_hash, %err, "revert replay failed");
                None
            },
            Ok(_) => None,
        };
        RevertReason::new(message, receipt.gas_used, Some(tx.gas_limit))
    }
}
