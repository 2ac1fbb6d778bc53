use alloy::primitives::TxHash;
use colored::Colorize;
use standard_sdk::{
    Chain,
    events::{self, DecodeResult, OrderEvent},
    rpc::ChainRpc,
};

pub(crate) async fn render<R: ChainRpc>(
    chain: &Chain,
    rpc: &R,
    tx_hash: TxHash,
) -> anyhow::Result<()> {
    let receipt = rpc
        .transaction_receipt(tx_hash)
        .await?
        .ok_or_else(|| anyhow::anyhow!("transaction {} not found or not mined yet", tx_hash))?;

    let header = format!("**** Tx {} (block {})", tx_hash, receipt.block_number);
    println!("\n{}\n", header.bright_blue());
    if !receipt.success {
        println!("{}\n", format!("  reverted, gas used {}", receipt.gas_used).red());
        return Ok(());
    }

    for event in events::order_events(&receipt, chain.exchange()) {
        match event {
            OrderEvent::Placed { order_id } => {
                println!("{}", format!("  placed #{}", order_id).cyan())
            },
            OrderEvent::Matched => println!("{}", "  matched".bright_cyan()),
        }
    }

    let resolution = match events::decode(&receipt, chain.exchange()) {
        DecodeResult::Placed { order_id } => format!("order #{} open", order_id).green(),
        DecodeResult::ImmediatelyFilled => "order filled immediately".yellow(),
        DecodeResult::NotFound => "no order events".red(),
    };
    println!("\n  {}\n", resolution);

    Ok(())
}
