use gate_perp_trader::config::Settings;
use gate_perp_trader::{GateIoGateway, GateTrader};
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables before anything reads them
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("gate-trader read-only snapshot");

    let settings = Settings::new()?;
    let gateway = GateIoGateway::new(settings.gate.as_ref())?;
    let trader = GateTrader::new(Arc::new(gateway), &settings.trader);

    let balance = trader.get_balance().await?;
    println!("{}", serde_json::to_string_pretty(&balance)?);

    let positions = trader.get_positions().await?;
    println!("{}", serde_json::to_string_pretty(&positions)?);

    if let Some(symbol) = env::args().nth(1) {
        match trader.get_market_price(&symbol).await {
            Ok(price) => println!("{} {}", symbol, price),
            Err(e) => error!(symbol = %symbol, error = %e, "Failed to fetch market price"),
        }
    }

    Ok(())
}
