//! Driftwire command-line entry point.
//!
//! Runs one logical operation against the configured ledger and prints its
//! sequence report as JSON.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use driftwire_sdk::{BaseAmount, MarketId, OrderParams, OrderType, PositionDirection, Price};
use driftwire_sequencer::rpc::Commitment;
use driftwire_sequencer::{SequenceReport, SequencerConfig, SequencerService, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "driftwire", author, version, about, long_about = None)]
struct Cli {
    /// JSON-RPC endpoint.
    #[arg(long, global = true)]
    url: Option<String>,

    /// Authority keypair file.
    #[arg(long, global = true)]
    keypair: Option<String>,

    /// Commitment required for confirmation.
    #[arg(long, global = true)]
    commitment: Option<Commitment>,

    /// Skip simulation before sending.
    #[arg(long, global = true)]
    skip_preflight: bool,

    /// Sub-account id.
    #[arg(long, global = true, default_value_t = 0)]
    sub_account: u16,

    /// Markets with open positions, e.g. `perp-0,spot-1`.
    #[arg(long, global = true, value_delimiter = ',')]
    positions: Vec<MarketId>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wrap native SOL into the authority's WSOL account.
    Wrap {
        /// Lamports to wrap.
        lamports: u64,
    },
    /// Initialize the user and user-stats accounts.
    Init,
    /// Deposit collateral into a spot market.
    Deposit {
        /// Spot market, e.g. `spot-0`.
        market: MarketId,
        /// Amount in token base units.
        amount: u64,
    },
    /// Wrap native SOL and deposit it into the SOL spot market.
    WrapDeposit {
        /// Lamports to wrap and deposit.
        lamports: u64,
    },
    /// Place an order.
    PlaceOrder {
        /// Market, e.g. `perp-0`.
        market: MarketId,
        /// `long` or `short`.
        direction: PositionDirection,
        /// Base amount in base precision (1e9).
        amount: u64,
        /// Limit price in price precision (1e6); omit for a market order.
        #[arg(long)]
        price: Option<u64>,
        /// Only reduce an existing position.
        #[arg(long)]
        reduce_only: bool,
    },
    /// Place a batch of orders from a JSON file holding an array of order
    /// parameters.
    PlaceOrders {
        /// Path to the orders file.
        file: PathBuf,
    },
    /// Cancel an order by id, or the most recent order.
    Cancel {
        /// Order id.
        #[arg(long)]
        order_id: Option<u32>,
        /// Market the order rests on.
        #[arg(long)]
        market: Option<MarketId>,
    },
    /// Fetch a market-state account.
    Market {
        /// Market, e.g. `perp-0`.
        market: MarketId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,driftwire_sequencer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = SequencerConfig::from_env().context("loading configuration")?;
    if let Some(url) = cli.url {
        config = config.with_rpc_url(url);
    }
    if let Some(keypair) = cli.keypair {
        config.keypair_path = Some(keypair);
    }
    if let Some(commitment) = cli.commitment {
        config = config.with_commitment(commitment);
    }
    if cli.skip_preflight {
        config = config.with_skip_preflight(true);
    }

    tracing::info!("Starting driftwire");
    tracing::info!("RPC URL: {}", config.rpc_url);
    tracing::info!("Commitment: {}", config.commitment);

    let session = Arc::new(Session::connect(config).context("creating session")?);
    let service = SequencerService::new(Arc::clone(&session)).with_sub_account(cli.sub_account);
    let positions: BTreeSet<MarketId> = cli.positions.into_iter().collect();

    let report = match cli.command {
        Command::Wrap { lamports } => service.wrap_sol(lamports).await?,
        Command::Init => service.initialize().await?,
        Command::Deposit { market, amount } => service.deposit(market, amount, &positions).await?,
        Command::WrapDeposit { lamports } => service.wrap_and_deposit(lamports, &positions).await?,
        Command::PlaceOrder {
            market,
            direction,
            amount,
            price,
            reduce_only,
        } => {
            let mut params = OrderParams::limit(
                market,
                direction,
                BaseAmount::new(amount),
                Price::new(price.unwrap_or(0)),
            );
            if price.is_none() {
                params.order_type = OrderType::Market;
            }
            params.reduce_only = reduce_only;
            service.place_order(params, &positions).await?
        }
        Command::PlaceOrders { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let orders: Vec<OrderParams> = serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", file.display()))?;
            service.place_orders(orders, &positions).await?
        }
        Command::Cancel { order_id, market } => {
            service.cancel_order(order_id, market, &positions).await?
        }
        Command::Market { market } => {
            let data = service.fetch_market_account(market).await?;
            let Some(data) = data else {
                bail!("market account {} not found", market);
            };
            println!(
                "{}",
                serde_json::json!({
                    "market": market.to_string(),
                    "bytes": data.len(),
                    "data": STANDARD.encode(&data),
                })
            );
            return Ok(());
        }
    };

    print_report(&report)?;
    tracing::debug!(metrics = ?session.metrics().snapshot(), "Done");

    if !report.is_complete() {
        bail!(
            "{} of {} transactions confirmed",
            report.confirmed_count(),
            report.transactions.len()
        );
    }

    Ok(())
}

fn print_report(report: &SequenceReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
