pub mod args;
mod cancel;
pub mod config;
mod decode;
mod place;

use std::sync::Arc;

use alloy::{
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
    transports::layers::{RetryBackoffLayer, ThrottleLayer},
};
use anyhow::Context;
use args::Cli;
use colored::Colorize;
use standard_sdk::{
    Chain,
    connector::{Connector, ConnectorConfig},
    rpc::{ChainRpc, ProviderRpc},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{args::Commands, config::Config};

type Rpc = ProviderRpc<DynProvider>;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let network = cli.network.or(config.network).unwrap_or_default();
    let rpc_url = cli.rpc.clone().or_else(|| config.rpc.clone());
    let throttle = cli
        .rpc_throttle
        .or(config.rpc_throttle)
        .or(rpc_url.is_none().then_some(args::DEFAULT_RPC_THROTTLING));
    let rpc_url = rpc_url.unwrap_or_else(|| network.rpc().to_string());

    let client = if let Some(throttle) = throttle {
        // Public endpoints rate limit aggressively
        RpcClient::builder()
            .layer(ThrottleLayer::new(throttle))
            .layer(RetryBackoffLayer::new(10, 100, 200))
            .connect(&rpc_url)
            .await
            .context("connecting to RPC")?
    } else {
        RpcClient::builder()
            .layer(RetryBackoffLayer::new(10, 100, 200))
            .connect(&rpc_url)
            .await
            .context("connecting to RPC")?
    };
    let provider = ProviderBuilder::new().connect_client(client).erased();

    let chain = config.chain(network)?;
    let chain_id = provider.get_chain_id().await.context("fetching chain ID")?;
    if chain_id != chain.chain_id() {
        return Err(anyhow::anyhow!(
            "RPC endpoint {} serves chain {}, {:?} is chain {}",
            rpc_url,
            chain_id,
            network,
            chain.chain_id()
        ));
    }
    let rpc = Arc::new(ProviderRpc::new(provider));

    match cli.command {
        Commands::Decode { tx } => decode::render(&chain, rpc.as_ref(), tx).await?,
        Commands::Nonce => {
            let signer = signer(cli.private_key.as_deref())?;
            let nonce = rpc.pending_nonce(signer.address()).await?;
            println!("{} {}", signer.address().to_string().bright_blue(), nonce);
        },
        Commands::Place { pair, side, amount, price, market, id, wait } => {
            let connector = connector(chain, rpc, &cli.private_key, config.connector()?)?;
            let request = place::Request { pair, side, amount, price, market, id, wait };
            place::render(&connector, request).await?
        },
        Commands::Cancel { pair, side, tx, order_id } => {
            let connector = connector(chain, rpc, &cli.private_key, config.connector()?)?;
            cancel::render(&connector, &pair, side, tx, order_id).await?
        },
    }

    Ok(())
}

fn signer(private_key: Option<&str>) -> anyhow::Result<PrivateKeySigner> {
    private_key
        .with_context(|| format!("signing key required, set {}", args::PRIVATE_KEY_ENV))?
        .parse()
        .context("parsing signing key")
}

fn connector(
    chain: Chain,
    rpc: Arc<Rpc>,
    private_key: &Option<String>,
    config: ConnectorConfig,
) -> anyhow::Result<Connector<Rpc>> {
    let signer = signer(private_key.as_deref())?;
    info!(wallet = %signer.address(), chain_id = chain.chain_id(), "connector ready");
    let connector = Connector::new(chain, rpc, signer, config);
    shutdown_on_ctrl_c(connector.shutdown_token());
    Ok(connector)
}

/// Stops receipt polling on Ctrl+C. Broadcast transactions stay in flight.
fn shutdown_on_ctrl_c(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to install Ctrl+C handler");
            return;
        }
        warn!("interrupted, stopping confirmation polling");
        shutdown.cancel();
    });
}
