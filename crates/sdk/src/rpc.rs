//! JSON-RPC methods the lifecycle depends on.
//!
//! [`ChainRpc`] is the only way the SDK talks to a node. [`ProviderRpc`]
//! adapts any alloy [`Provider`]; tests script the same trait with
//! `testing::MockChain`.

use std::future::Future;

use alloy::{
    eips::BlockId,
    network::{ReceiptResponse, TransactionBuilder, TransactionResponse},
    primitives::{Address, Bytes, TxHash, U256},
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
    transports::RpcError,
};

use crate::{
    error::DexError,
    types::{CallRequest, Receipt, TxRequest},
};

/// Signed, encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Clone, Debug)]
pub struct SignedTx {
    pub raw: Bytes,
    pub hash: TxHash,
    pub request: TxRequest,
}

pub trait ChainRpc: Send + Sync + 'static {
    /// `eth_getTransactionCount(address, "pending")`.
    fn pending_nonce(&self, address: Address)
    -> impl Future<Output = Result<u64, DexError>> + Send;

    /// `eth_estimateGas`.
    fn estimate_gas(
        &self,
        from: Address,
        call: &CallRequest,
    ) -> impl Future<Output = Result<u64, DexError>> + Send;

    /// `eth_gasPrice`.
    fn gas_price(&self) -> impl Future<Output = Result<u128, DexError>> + Send;

    /// `eth_sendRawTransaction`.
    fn send_raw_transaction(
        &self,
        tx: &SignedTx,
    ) -> impl Future<Output = Result<TxHash, DexError>> + Send;

    /// `eth_getTransactionReceipt`, `None` while the transaction is pending or
    /// unknown to the node.
    fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<Receipt>, DexError>> + Send;

    /// `eth_call` at `block`, latest when `None`. A revert is reported as
    /// [`DexError::ExecutionReverted`].
    fn call(
        &self,
        tx: &TxRequest,
        block: Option<u64>,
    ) -> impl Future<Output = Result<Bytes, DexError>> + Send;

    /// `eth_getTransactionByHash`.
    fn transaction(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<TxRequest>, DexError>> + Send;

    /// `eth_getBalance` at the latest block.
    fn balance(&self, address: Address) -> impl Future<Output = Result<U256, DexError>> + Send;
}

/// [`ChainRpc`] over an alloy provider.
#[derive(Clone, Debug)]
pub struct ProviderRpc<P> {
    provider: P,
}

impl<P: Provider> ProviderRpc<P> {
    pub fn new(provider: P) -> Self { Self { provider } }

    pub fn provider(&self) -> &P { &self.provider }
}

impl<P> ChainRpc for ProviderRpc<P>
where
    P: Provider + Send + Sync + 'static,
{
    async fn pending_nonce(&self, address: Address) -> Result<u64, DexError> {
        Ok(self.provider.get_transaction_count(address).pending().await?)
    }

    async fn estimate_gas(&self, from: Address, call: &CallRequest) -> Result<u64, DexError> {
        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(call.to)
            .with_input(call.data.clone())
            .with_value(call.value);
        self.provider
            .estimate_gas(request)
            .await
            .map_err(|err| DexError::GasEstimationFailed(err.to_string()))
    }

    async fn gas_price(&self) -> Result<u128, DexError> { Ok(self.provider.get_gas_price().await?) }

    async fn send_raw_transaction(&self, tx: &SignedTx) -> Result<TxHash, DexError> {
        let pending = self.provider.send_raw_transaction(&tx.raw).await?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, DexError> {
        Ok(self.provider.get_transaction_receipt(tx_hash).await?.map(into_receipt))
    }

    async fn call(&self, tx: &TxRequest, block: Option<u64>) -> Result<Bytes, DexError> {
        let mut request = TransactionRequest::default()
            .with_from(tx.from)
            .with_to(tx.to)
            .with_input(tx.data.clone())
            .with_value(tx.value);
        if tx.gas_limit > 0 {
            request.set_gas_limit(tx.gas_limit);
        }
        if tx.gas_price > 0 {
            request.set_gas_price(tx.gas_price);
        }

        let call = self.provider.call(request);
        let result = match block {
            Some(number) => call.block(BlockId::number(number)).await,
            None => call.await,
        };
        result.map_err(|err| match err {
            RpcError::ErrorResp(payload) => DexError::ExecutionReverted {
                data: payload.as_revert_data(),
                message: payload.message.to_string(),
            },
            err => DexError::Transport(err),
        })
    }

    async fn transaction(&self, tx_hash: TxHash) -> Result<Option<TxRequest>, DexError> {
        let Some(tx) = self.provider.get_transaction_by_hash(tx_hash).await? else {
            return Ok(None);
        };
        let Some(to) = alloy::consensus::Transaction::to(&tx) else {
            return Ok(None);
        };
        Ok(Some(TxRequest {
            from: TransactionResponse::from(&tx),
            to,
            data: alloy::consensus::Transaction::input(&tx).clone(),
            value: alloy::consensus::Transaction::value(&tx),
            nonce: alloy::consensus::Transaction::nonce(&tx),
            gas_limit: alloy::consensus::Transaction::gas_limit(&tx),
            gas_price: alloy::consensus::Transaction::gas_price(&tx)
                .unwrap_or_else(|| alloy::consensus::Transaction::max_fee_per_gas(&tx)),
            chain_id: alloy::consensus::Transaction::chain_id(&tx).unwrap_or_default(),
        }))
    }

    async fn balance(&self, address: Address) -> Result<U256, DexError> {
        Ok(self.provider.get_balance(address).await?)
    }
}

fn into_receipt(receipt: TransactionReceipt) -> Receipt {
    Receipt {
        tx_hash: ReceiptResponse::transaction_hash(&receipt),
        block_number: ReceiptResponse::block_number(&receipt).unwrap_or_default(),
        success: ReceiptResponse::status(&receipt),
        gas_used: ReceiptResponse::gas_used(&receipt),
        logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
    }
}
