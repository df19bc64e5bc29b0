//! btcfeed - load BTC price history and print what the analysis layer would see
//!
//! Usage: cargo run --bin btcfeed

use anyhow::Result;
use btcfeed::acquisition::sources::default_chain;
use btcfeed::alignment::{macro_aligned, DXY, GOLD, RATES, SP500};
use btcfeed::dates;
use btcfeed::yields::YieldClient;
use btcfeed::{AppConfig, PriceLoader};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config);

    info!("🚀 btcfeed starting");
    info!(config = %config, "Configuration loaded");

    let api_key = AppConfig::api_key();
    let sources = default_chain(&config, api_key.clone());
    let loader = Arc::new(PriceLoader::from_config(&config, sources));

    let init = loader.spawn_initialize();
    let series = match loader.wait_for_data().await {
        Ok(series) => series,
        Err(e) => {
            warn!(error = %e, "Gave up waiting for price data");
            init.await?
        }
    };

    let status = loader.status();
    println!("{}", status);

    if let Some(last) = series.last() {
        println!(
            "Latest close: ${} on {}",
            last.value,
            dates::format_compact(last.date)
        );

        match macro_aligned(&series.dates()) {
            Ok(aligned) => {
                for name in [SP500, GOLD, DXY, RATES] {
                    if let Some(value) = aligned.get(name).and_then(|v| v.last()) {
                        println!("  {:<6} {:>10.2}", name, value);
                    }
                }
            }
            Err(e) => warn!(error = %e, "Macro indicators unavailable"),
        }
    }

    if config.yields.enabled {
        let client = YieldClient::new(
            &config.yields.url,
            api_key,
            config.sources.request_timeout(),
        );
        let snapshot = client.fetch_rates().await;
        for rate in &snapshot.rates {
            println!(
                "  {:<5} {:>6.2}% ({:?})",
                rate.ticker,
                rate.rate * 100.0,
                rate.origin
            );
        }
    }

    if let Some(outcome) = loader.settle_refresh().await {
        info!(?outcome, "Background refresh finished");
        println!("{}", loader.status());
    }

    Ok(())
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
