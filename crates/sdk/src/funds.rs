//! Pre-trade collaborators: token resolution and funds sufficiency.

use std::sync::Arc;

use alloy::{
    primitives::{Address, U256},
    sol_types::SolCall,
};
use futures::future::BoxFuture;
use tracing::debug;

use crate::{
    Chain,
    abi::erc20::IERC20,
    error::DexError,
    rpc::ChainRpc,
    types::{CallRequest, Token, TxRequest},
};

/// Maps a symbol to the token's address and decimals.
pub trait TokenResolver: Send + Sync {
    fn resolve(&self, symbol: &str) -> Result<Token, DexError>;
}

impl TokenResolver for Chain {
    fn resolve(&self, symbol: &str) -> Result<Token, DexError> {
        match self.token(symbol) {
            Some(token) if token.address() != Address::ZERO => Ok(token.clone()),
            _ => Err(DexError::UnknownToken(symbol.to_string())),
        }
    }
}

/// Checks that `owner` can spend `required` base units of `token` through
/// `spender` before an order is signed.
pub trait FundsChecker: Send + Sync {
    fn check<'a>(
        &'a self,
        owner: Address,
        token: &'a Token,
        required: U256,
        spender: Address,
    ) -> BoxFuture<'a, Result<(), DexError>>;
}

/// Accepts every order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unchecked;

impl FundsChecker for Unchecked {
    fn check<'a>(
        &'a self,
        _owner: Address,
        _token: &'a Token,
        _required: U256,
        _spender: Address,
    ) -> BoxFuture<'a, Result<(), DexError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Reads balances and allowances from the chain.
///
/// Native tokens are attached as value, so only the account balance matters.
/// ERC-20 tokens also need an allowance towards the exchange.
#[derive(Debug)]
pub struct OnChainFunds<R> {
    rpc: Arc<R>,
}

impl<R: ChainRpc> OnChainFunds<R> {
    pub fn new(rpc: Arc<R>) -> Self { Self { rpc } }

    async fn erc20_balance(&self, owner: Address, token: &Token) -> Result<U256, DexError> {
        let call = IERC20::balanceOfCall { account: owner };
        let data = self.view(owner, token, call.abi_encode()).await?;
        Ok(IERC20::balanceOfCall::abi_decode_returns(&data)?)
    }

    async fn erc20_allowance(
        &self,
        owner: Address,
        token: &Token,
        spender: Address,
    ) -> Result<U256, DexError> {
        let call = IERC20::allowanceCall { owner, spender };
        let data = self.view(owner, token, call.abi_encode()).await?;
        Ok(IERC20::allowanceCall::abi_decode_returns(&data)?)
    }

    async fn view(
        &self,
        owner: Address,
        token: &Token,
        data: Vec<u8>,
    ) -> Result<alloy::primitives::Bytes, DexError> {
        let call = CallRequest::view(token.address(), data);
        self.rpc.call(&TxRequest::view(owner, &call), None).await
    }
}

impl<R: ChainRpc> FundsChecker for OnChainFunds<R> {
    fn check<'a>(
        &'a self,
        owner: Address,
        token: &'a Token,
        required: U256,
        spender: Address,
    ) -> BoxFuture<'a, Result<(), DexError>> {
        Box::pin(async move {
            let available = if token.is_native() {
                self.rpc.balance(owner).await?
            } else {
                self.erc20_balance(owner, token).await?
            };
            debug!(token = %token, %available, %required, "balance checked");
            if available < required {
                return Err(DexError::InsufficientBalance {
                    token: token.symbol().to_string(),
                    required,
                    available,
                });
            }

            if !token.is_native() {
                let approved = self.erc20_allowance(owner, token, spender).await?;
                if approved < required {
                    return Err(DexError::InsufficientAllowance {
                        token: token.symbol().to_string(),
                        required,
                        approved,
                    });
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::sol_types::SolValue;

    use super::*;
    use crate::testing::{self, CallResponse, MockChain};

    #[test]
    fn test_chain_resolves_tokens() {
        let chain = testing::chain();
        assert_eq!(chain.resolve("usdc").unwrap(), testing::usdc());
        assert!(chain.resolve("STT").unwrap().is_native());
        assert!(matches!(
            chain.resolve("DOGE"),
            Err(DexError::UnknownToken(symbol)) if symbol == "DOGE"
        ));

        let unset = chain.with_token(Token::new("DOGE", Address::ZERO, 8));
        assert!(matches!(unset.resolve("DOGE"), Err(DexError::UnknownToken(_))));
    }

    #[tokio::test]
    async fn test_native_balance() {
        let rpc = Arc::new(MockChain::new());
        rpc.set_balance(testing::wallet(), U256::from(100));
        let funds = OnChainFunds::new(rpc.clone());
        let exchange = testing::chain().exchange();

        funds.check(testing::wallet(), &testing::stt(), U256::from(100), exchange).await.unwrap();
        let err = funds
            .check(testing::wallet(), &testing::stt(), U256::from(101), exchange)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DexError::InsufficientBalance { available, .. } if available == U256::from(100)
        ));
        assert!(rpc.calls().is_empty());
    }

    #[tokio::test]
    async fn test_erc20_balance_and_allowance() {
        let rpc = Arc::new(MockChain::new());
        rpc.on_call(
            IERC20::balanceOfCall::SELECTOR,
            CallResponse::Return(U256::from(5_000_000).abi_encode().into()),
        );
        rpc.on_call(
            IERC20::allowanceCall::SELECTOR,
            CallResponse::Return(U256::from(1_000_000).abi_encode().into()),
        );
        let funds = OnChainFunds::new(rpc.clone());
        let exchange = testing::chain().exchange();

        funds
            .check(testing::wallet(), &testing::usdc(), U256::from(1_000_000), exchange)
            .await
            .unwrap();
        let err = funds
            .check(testing::wallet(), &testing::usdc(), U256::from(2_000_000), exchange)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DexError::InsufficientAllowance { token, approved, .. }
                if token == "USDC" && approved == U256::from(1_000_000)
        ));

        let calls = rpc.calls();
        assert_eq!(calls.len(), 4);
        assert!(
            calls.iter().all(|(tx, block)| tx.to == testing::usdc().address() && block.is_none())
        );
    }
}
