//! Transaction lifecycle: nonce allocation, encoding, submission and
//! confirmation.

pub mod builder;
pub mod confirm;
pub mod nonce;
pub mod submit;

use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
pub use builder::{CancelTarget, EntryPoint, OrderCall, TransactionBuilder};
pub use confirm::{Confirmation, ConfirmationPoller, FailureCategory, PollPolicy, RevertReason};
pub use nonce::{NonceAllocator, WalletLock};
pub use submit::{GasPolicy, SubmittedTx, TransactionSubmitter};
use tokio_util::sync::CancellationToken;

use crate::{error::DexError, rpc::ChainRpc, types::CallRequest};

/// Serializes transactions of one wallet.
///
/// [`Pipeline::begin`] takes the wallet lock; everything sent through the
/// returned [`Session`] shares it until the session is dropped.
pub struct Pipeline<R> {
    rpc: Arc<R>,
    nonces: Arc<NonceAllocator>,
    submitter: TransactionSubmitter<R>,
    poller: ConfirmationPoller<R>,
}

/// Open critical section of a [`Pipeline`].
pub struct Session<'a, R> {
    pipeline: &'a Pipeline<R>,
    lock: WalletLock,
}

impl<R: ChainRpc> Pipeline<R> {
    pub fn new(
        rpc: Arc<R>,
        nonces: Arc<NonceAllocator>,
        submitter: TransactionSubmitter<R>,
        poller: ConfirmationPoller<R>,
    ) -> Self {
        Self { rpc, nonces, submitter, poller }
    }

    pub fn address(&self) -> Address { self.submitter.address() }

    pub fn rpc(&self) -> &Arc<R> { &self.rpc }

    pub fn poller(&self) -> &ConfirmationPoller<R> { &self.poller }

    /// Waits for the wallet lock.
    pub async fn begin(&self) -> Session<'_, R> {
        Session { pipeline: self, lock: self.nonces.lock(self.submitter.address()).await }
    }

    /// Polls for a receipt without holding the wallet lock.
    pub async fn confirm(
        &self,
        tx_hash: TxHash,
        shutdown: &CancellationToken,
    ) -> Result<Confirmation, DexError> {
        self.poller.confirm(tx_hash, shutdown).await
    }
}

impl<R: ChainRpc> Session<'_, R> {
    /// Allocates a nonce and broadcasts `call` with it.
    pub async fn submit(&mut self, call: &CallRequest) -> Result<SubmittedTx, DexError> {
        let nonce = self.lock.acquire(&*self.pipeline.rpc).await;
        self.pipeline.submitter.submit(call, nonce).await
    }

    /// Polls for a receipt while keeping the wallet lock.
    pub async fn confirm(
        &self,
        tx_hash: TxHash,
        shutdown: &CancellationToken,
    ) -> Result<Confirmation, DexError> {
        self.pipeline.poller.confirm(tx_hash, shutdown).await
    }

    /// Broadcasts `call` and waits for its outcome, all under the lock.
    pub async fn execute(
        &mut self,
        call: &CallRequest,
        shutdown: &CancellationToken,
    ) -> Result<(SubmittedTx, Confirmation), DexError> {
        let submitted = self.submit(call).await?;
        let confirmation = self.confirm(submitted.hash, shutdown).await?;
        Ok((submitted, confirmation))
    }
}
