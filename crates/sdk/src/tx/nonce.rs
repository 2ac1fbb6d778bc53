use std::sync::Arc;

use alloy::primitives::Address;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::rpc::ChainRpc;

/// Hands out transaction nonces, one wallet lock at a time.
///
/// Every wallet has an async mutex created on first use. A nonce can only be
/// acquired through the [`WalletLock`] guard, which the caller keeps for the
/// whole acquire, sign, broadcast (and optionally confirm) sequence.
///
/// Allocation takes the greater of the chain's pending transaction count and
/// the last locally allocated nonce plus one, so nonces handed out for the
/// same wallet are strictly increasing for the lifetime of the allocator,
/// even when earlier transactions have not reached the node's mempool yet.
#[derive(Debug, Default)]
pub struct NonceAllocator {
    wallets: DashMap<Address, Arc<Mutex<WalletNonce>>>,
}

#[derive(Debug)]
struct WalletNonce {
    wallet: Address,
    next: Option<u64>,
}

/// Exclusive access to one wallet's nonce sequence.
#[derive(Debug)]
pub struct WalletLock {
    state: OwnedMutexGuard<WalletNonce>,
}

impl NonceAllocator {
    pub fn new() -> Self { Self::default() }

    /// Waits for exclusive access to `wallet`.
    pub async fn lock(&self, wallet: Address) -> WalletLock {
        let mutex = self
            .wallets
            .entry(wallet)
            .or_insert_with(|| Arc::new(Mutex::new(WalletNonce { wallet, next: None })))
            .clone();
        WalletLock { state: mutex.lock_owned().await }
    }
}

impl WalletLock {
    pub fn wallet(&self) -> Address { self.state.wallet }

    /// Allocates the next nonce.
    ///
    /// When the pending count cannot be fetched the local sequence continues
    /// on its own; before any successful allocation that starts from zero.
    pub async fn acquire<R: ChainRpc>(&mut self, rpc: &R) -> u64 {
        let wallet = self.state.wallet;
        let nonce = match rpc.pending_nonce(wallet).await {
            Ok(pending) => pending.max(self.state.next.unwrap_or_default()),
            Err(err) => {
                let local = self.state.next.unwrap_or_default();
                warn!(
                    %wallet,
                    nonce = local,
                    %err,
                    "pending nonce unavailable, using local sequence"
                );
                local
            },
        };
        self.state.next = Some(nonce + 1);
        debug!(%wallet, nonce, "nonce allocated");
        nonce
    }
}
