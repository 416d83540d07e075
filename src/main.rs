use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use trailbot::api::CoinbaseClient;
use trailbot::config::Settings;
use trailbot::db::SqlitePersistence;
use trailbot::execution::{Driver, RunOutcome, TrailParams};
use trailbot::notify::WebhookNotifier;
use trailbot::OrderSide;

/// Trailing limit order bot: buy the dip below a recent high, or sell the
/// pump above a recent low. Meant to run every few minutes from a scheduler.
#[derive(Parser, Debug)]
#[command(name = "trailbot", version, about)]
struct Cli {
    /// Market to trade (e.g. BTC-USD, ETH-BTC)
    market_name: String,

    #[arg(value_parser = parse_side)]
    order_side: OrderSide,

    /// Quantity to buy or sell, in amount_currency
    amount: Decimal,

    /// Currency the amount is denominated in
    amount_currency: String,

    /// Percentage offset from the recent extreme (e.g. -10.0 is 10% below the recent high)
    #[arg(allow_negative_numbers = true)]
    percent_diff: Decimal,

    /// Run against the sandbox; skips the confirmation prompt
    #[arg(long)]
    sandbox: bool,

    /// Cap the recent extreme at the last breached 200-period MA of 15-minute closes
    #[arg(short = 'm', long = "ma_limit")]
    ma_limit: bool,

    /// Scheduled run; skips the confirmation prompt
    #[arg(short = 'j', long)]
    job: bool,

    /// Settings file
    #[arg(short = 'c', long, default_value = "settings.conf")]
    config: PathBuf,

    /// Order database
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://data.db")]
    database: String,
}

fn parse_side(value: &str) -> std::result::Result<OrderSide, String> {
    OrderSide::parse(value).ok_or_else(|| format!("expected BUY or SELL, got {value}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    // `-sandbox` is accepted for compatibility with existing cron entries
    let args = std::env::args().map(|arg| if arg == "-sandbox" { "--sandbox".to_string() } else { arg });
    let cli = Cli::parse_from(args);

    if !cli.sandbox && !cli.job && !confirm_production()? {
        println!("Aborting");
        return Ok(());
    }

    let settings = Settings::load(&cli.config, cli.sandbox)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    tracing::info!(
        "trailbot starting against {} ({})",
        settings.api_url(),
        if cli.sandbox { "sandbox" } else { "production" }
    );

    let exchange = CoinbaseClient::new(settings.api_url(), Some(settings.credentials()))
        .context("Failed to build exchange client")?;
    let store = SqlitePersistence::new(&cli.database)
        .await
        .with_context(|| format!("Failed to open order database {}", cli.database))?;
    let notifier = WebhookNotifier::new(settings.notify_url.clone());

    let params = TrailParams {
        market: cli.market_name,
        side: cli.order_side,
        amount: cli.amount,
        amount_currency: cli.amount_currency,
        percent_diff: cli.percent_diff,
        use_ma_limit: cli.ma_limit,
    };
    let driver = Driver::new(&exchange, &store, &notifier, params)?;

    match driver.run().await.context("Trailing run failed")? {
        RunOutcome::Unchanged(order) => {
            tracing::info!("No order changes required; {} stays at {}", order.order_id, order.target_price)
        }
        RunOutcome::Placed(order) => tracing::info!(
            "Order {} {} @ {} ({})",
            order.order_id,
            order.side,
            order.target_price,
            order.status
        ),
        RunOutcome::PriceInvalid(message) => {
            tracing::info!("Order not placed: {}; retrying next run", message)
        }
    }

    tracing::info!("trailbot finished");
    Ok(())
}

fn confirm_production() -> Result<bool> {
    print!("Production purchase! Confirm [Y]: ");
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().lock().read_line(&mut response)?;
    Ok(response.trim() == "Y")
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trailbot=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
