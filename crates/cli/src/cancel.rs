use alloy::primitives::TxHash;
use colored::Colorize;
use standard_sdk::{
    cancel::CancelOutcome,
    connector::Connector,
    rpc::ChainRpc,
    types::{OrderId, OrderSide, TradingPair},
};

const CLIENT_ORDER_ID: &str = "cli-cancel";

/// Adopts the order and routes it through the cancellation channels.
pub(crate) async fn render<R: ChainRpc>(
    connector: &Connector<R>,
    pair: &TradingPair,
    side: OrderSide,
    tx_hash: Option<TxHash>,
    order_id: Option<OrderId>,
) -> anyhow::Result<()> {
    if tx_hash.is_none() && order_id.is_none() {
        return Err(anyhow::anyhow!("either `--tx` or `--order-id` is required"));
    }
    connector.adopt(CLIENT_ORDER_ID, pair, side, tx_hash.unwrap_or_default(), order_id)?;

    match connector.cancel(CLIENT_ORDER_ID).await? {
        CancelOutcome::Cancelled { tx_hash, channel } => {
            println!("\n{} via {} channel", "cancelled".green(), channel);
            println!("  tx {}\n", tx_hash);
        },
        CancelOutcome::LocallyCancelledOnly { reason } => {
            println!("\n{}: {}\n", "nothing cancelled on-chain".yellow(), reason);
        },
    }
    Ok(())
}
