use chrono::Utc;
use colored::Colorize;
use fastnum::UD64;
use standard_sdk::{
    connector::{ConfirmOutcome, Connector},
    rpc::ChainRpc,
    types::{OrderRequest, OrderSide, OrderType, TradingPair},
};
use tabled::{Table, settings::Style};

pub(crate) struct Request {
    pub pair: TradingPair,
    pub side: OrderSide,
    pub amount: UD64,
    pub price: UD64,
    pub market: bool,
    pub id: Option<String>,
    pub wait: bool,
}

pub(crate) async fn render<R: ChainRpc>(
    connector: &Connector<R>,
    request: Request,
) -> anyhow::Result<()> {
    let client_order_id =
        request.id.unwrap_or_else(|| format!("cli-{}", Utc::now().timestamp_millis()));
    let order = OrderRequest::new(
        request.pair,
        request.side,
        if request.market { OrderType::Market } else { OrderType::Limit },
        request.amount,
        request.price,
    );

    let handle = connector.place(client_order_id.as_str(), &order).await?;
    println!(
        "\n{} {:#} {} {} @ {} via {}",
        "submitted".bright_blue(),
        order.side(),
        order.amount(),
        order.pair(),
        order.price(),
        handle.entry_point
    );
    println!("  tx {} nonce {}", handle.tx_hash, handle.nonce);

    if request.wait {
        let outcome = match handle.outcome {
            Some(outcome) => outcome,
            None => connector.confirm(&client_order_id).await?,
        };
        let line = format!("  {}", outcome);
        match outcome {
            ConfirmOutcome::Open(_) => println!("{}", line.green()),
            ConfirmOutcome::ImmediatelyFilled => println!("{}", line.yellow()),
            ConfirmOutcome::Unresolved | ConfirmOutcome::TimedOut => println!("{}", line.red()),
            ConfirmOutcome::Failed(reason) => {
                println!("{}", format!("{} ({})", line, reason.category()).red())
            },
        }
    }

    let mut table = Table::new(connector.orders());
    table.with(Style::sharp());
    println!("\n{}\n", table);

    Ok(())
}
