use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy::{
    consensus::TxEnvelope,
    eips::eip2718::Encodable2718,
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, TxHash},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    error::DexError,
    rpc::{ChainRpc, SignedTx},
    types::{CallRequest, TxRequest},
};

/// Gas limit and price selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasPolicy {
    /// Safety margin added on top of the node's estimate, in percent.
    pub margin_percent: u64,
    /// Lower bound of any gas limit sent.
    pub min_gas_limit: u64,
    /// Gas limit used when estimation fails.
    pub fallback_gas_limit: u64,
    /// Gas price used when `eth_gasPrice` fails.
    pub fallback_gas_price: u128,
    /// How long a fetched gas price is reused.
    pub gas_price_ttl: Duration,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            margin_percent: 20,
            min_gas_limit: 3_000_000,
            fallback_gas_limit: 3_000_000,
            fallback_gas_price: 20_000_000_000,
            gas_price_ttl: Duration::from_secs(30),
        }
    }
}

impl GasPolicy {
    /// Gas limit for a successful estimate: estimate plus margin, floored.
    pub fn limit_for(&self, estimate: u64) -> u64 {
        let padded = estimate.saturating_mul(100 + self.margin_percent) / 100;
        padded.max(self.min_gas_limit)
    }

    pub fn fallback_limit(&self) -> u64 { self.fallback_gas_limit.max(self.min_gas_limit) }
}

/// Transaction accepted by the node's mempool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedTx {
    pub hash: TxHash,
    pub request: TxRequest,
}

/// Prices, signs and broadcasts transactions for one wallet.
///
/// A rejected broadcast is terminal: the transaction is never re-sent with the
/// same nonce.
pub struct TransactionSubmitter<R> {
    rpc: Arc<R>,
    wallet: EthereumWallet,
    address: Address,
    chain_id: u64,
    policy: GasPolicy,
    gas_price: Mutex<Option<(u128, Instant)>>,
}

impl<R: ChainRpc> TransactionSubmitter<R> {
    pub fn new(rpc: Arc<R>, signer: PrivateKeySigner, chain_id: u64, policy: GasPolicy) -> Self {
        let address = signer.address();
        Self {
            rpc,
            wallet: EthereumWallet::from(signer),
            address,
            chain_id,
            policy,
            gas_price: Mutex::new(None),
        }
    }

    /// Address transactions are sent from.
    pub fn address(&self) -> Address { self.address }

    pub fn policy(&self) -> &GasPolicy { &self.policy }

    /// Signs `call` with `nonce` and broadcasts it.
    ///
    /// Must be called while holding the wallet's lock.
    pub async fn submit(&self, call: &CallRequest, nonce: u64) -> Result<SubmittedTx, DexError> {
        let gas_limit = self.gas_limit(call).await;
        let gas_price = self.gas_price().await;

        let request = TxRequest {
            from: self.address,
            to: call.to,
            data: call.data.clone(),
            value: call.value,
            nonce,
            gas_limit,
            gas_price,
            chain_id: self.chain_id,
        };
        let signed = self.sign(request).await?;
        let hash = signed.hash;

        match self.rpc.send_raw_transaction(&signed).await {
            Ok(accepted) => {
                if accepted != hash {
                    warn!(%hash, %accepted, "node reported a different transaction hash");
                }
                info!(%hash, nonce, gas_limit, gas_price, "transaction broadcast");
                Ok(SubmittedTx { hash, request: signed.request })
            },
            Err(err) => {
                warn!(%hash, nonce, %err, "transaction rejected");
                Err(DexError::SubmissionFailed { tx_hash: hash, reason: err.to_string() })
            },
        }
    }

    async fn gas_limit(&self, call: &CallRequest) -> u64 {
        match self.rpc.estimate_gas(self.address, call).await {
            Ok(estimate) => self.policy.limit_for(estimate),
            Err(err) => {
                let limit = self.policy.fallback_limit();
                warn!(to = %call.to, %err, limit, "gas estimation failed, using default limit");
                limit
            },
        }
    }

    async fn gas_price(&self) -> u128 {
        if let Ok(cache) = self.gas_price.lock()
            && let Some((price, fetched_at)) = *cache
            && fetched_at.elapsed() < self.policy.gas_price_ttl
        {
            return price;
        }

        match self.rpc.gas_price().await {
            Ok(price) => {
                if let Ok(mut cache) = self.gas_price.lock() {
                    *cache = Some((price, Instant::now()));
                }
                price
            },
            Err(err) => {
                let price = self.policy.fallback_gas_price;
                warn!(%err, price, "gas price unavailable, using fallback");
                price
            },
        }
    }

    async fn sign(&self, request: TxRequest) -> Result<SignedTx, DexError> {
        let unsigned = TransactionRequest::default()
            .with_from(request.from)
            .with_to(request.to)
            .with_input(request.data.clone())
            .with_value(request.value)
            .with_nonce(request.nonce)
            .with_gas_limit(request.gas_limit)
            .with_gas_price(request.gas_price)
            .with_chain_id(request.chain_id);
        let envelope: TxEnvelope =
            <TransactionRequest as TransactionBuilder<Ethereum>>::build(unsigned, &self.wallet)
                .await
                .map_err(|err| DexError::Signing(err.to_string()))?;

        Ok(SignedTx { raw: envelope.encoded_2718().into(), hash: *envelope.tx_hash(), request })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::*;
    use crate::testing::{self, MockChain};

    fn submitter(chain: &Arc<MockChain>) -> TransactionSubmitter<MockChain> {
        TransactionSubmitter::new(chain.clone(), testing::signer(), 50312, GasPolicy::default())
    }

    fn call() -> CallRequest {
        CallRequest::new(testing::chain().exchange(), vec![1, 2, 3, 4], U256::from(5))
    }

    #[test]
    fn test_gas_limit_policy() {
        let policy = GasPolicy::default();
        assert_eq!(policy.limit_for(100_000), 3_000_000);
        assert_eq!(policy.limit_for(3_000_000), 3_600_000);
        assert_eq!(policy.fallback_limit(), 3_000_000);
    }

    #[tokio::test]
    async fn test_submit_uses_estimate_and_signs() {
        let chain = Arc::new(MockChain::new());
        chain.set_gas_estimate(Some(5_000_000));
        chain.set_gas_price(Some(7));

        let submitted = submitter(&chain).submit(&call(), 12).await.unwrap();
        assert_eq!(submitted.request.gas_limit, 6_000_000);
        assert_eq!(submitted.request.gas_price, 7);
        assert_eq!(submitted.request.nonce, 12);
        assert_eq!(submitted.request.from, testing::wallet());
        assert_eq!(submitted.request.value, U256::from(5));

        let sent = chain.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], submitted.request);
        assert_eq!(chain.transaction_hashes(), vec![submitted.hash]);
    }

    #[tokio::test]
    async fn test_submit_falls_back_on_estimation_and_price_failures() {
        let chain = Arc::new(MockChain::new());
        chain.set_gas_estimate(None);
        chain.set_gas_price(None);

        let submitted = submitter(&chain).submit(&call(), 0).await.unwrap();
        assert_eq!(submitted.request.gas_limit, 3_000_000);
        assert_eq!(submitted.request.gas_price, 20_000_000_000);
    }

    #[tokio::test]
    async fn test_gas_price_is_cached() {
        let chain = Arc::new(MockChain::new());
        chain.set_gas_price(Some(7));
        let submitter = submitter(&chain);

        submitter.submit(&call(), 0).await.unwrap();
        chain.set_gas_price(Some(9));
        let second = submitter.submit(&call(), 1).await.unwrap();
        assert_eq!(second.request.gas_price, 7);
    }

    #[tokio::test]
    async fn test_rejected_broadcast_is_terminal() {
        let chain = Arc::new(MockChain::new());
        chain.push_outcome(testing::Outcome::Reject("replacement transaction underpriced".into()));

        let err = submitter(&chain).submit(&call(), 3).await.unwrap_err();
        let DexError::SubmissionFailed { tx_hash, reason } = &err else {
            panic!("unexpected error: {err}");
        };
        assert!(reason.contains("underpriced"));
        assert_eq!(err.tx_hash(), Some(*tx_hash));
        assert_eq!(chain.sent().len(), 0);
    }
}
