use clap::Parser;
use footprint_engine::application::bootstrap::Orchestrator;
use footprint_engine::config::Config;
use footprint_engine::domain::market::symbol_config::SymbolConfig;
use tracing::{error, info};

/// Standalone entrypoint for the footprint candle ingestion engine.
///
/// `TradeSource` and `SymbolConfigSource` are out-of-core seams (spec.md §1) — a
/// real deployment wires an exchange feed and a symbol-sync workflow in through
/// them. This binary runs the engine with the in-memory adapters so it can be
/// started, exercised, and shut down standalone.
#[derive(Parser, Debug)]
#[command(name = "footprint-engine", about = "Real-time footprint candle ingestion engine")]
struct Cli {
    /// Path to a JSON array of symbol configs to seed on startup.
    #[arg(long, value_name = "FILE")]
    symbols: Option<String>,
}

/// One entry in the `--symbols` seed file. `bin_multiplier` is a pinned
/// operator choice; `reference_price` (used when `bin_multiplier` is omitted)
/// instead runs the symbol through the §4.5 bin-size calculator, the path a
/// symbol-sync workflow takes onboarding a symbol with no pinned bin size yet.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum SeedSymbol {
    Pinned(SymbolConfig),
    Calculated {
        exchange: String,
        symbol: String,
        tick_value: f64,
        reference_price: f64,
    },
}

fn load_symbols(path: Option<&str>) -> anyhow::Result<Vec<SymbolConfig>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("failed to read {path}: {e}"))?;
    let seeds: Vec<SeedSymbol> = serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse {path}: {e}"))?;
    Ok(seeds
        .into_iter()
        .map(|seed| match seed {
            SeedSymbol::Pinned(config) => config,
            SeedSymbol::Calculated { exchange, symbol, tick_value, reference_price } => {
                SymbolConfig::with_calculated_bin_size(&exchange, &symbol, tick_value, reference_price)
            }
        })
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let symbols = load_symbols(cli.symbols.as_deref())?;

    info!("starting footprint engine with {} seeded symbol(s)", symbols.len());

    let orchestrator = Orchestrator::build(config).await?;
    let handle = orchestrator.start(symbols).await?;

    tokio::signal::ctrl_c().await.map_err(|e| anyhow::anyhow!("failed to listen for shutdown signal: {e}"))?;
    info!("shutdown signal received, flushing state");

    let timeout = std::time::Duration::from_secs(10);
    let report = handle.shutdown(timeout).await;
    if report.pool_flush_timed_out {
        error!("shutdown: pool flush timed out, some dirty state may not have been persisted");
    } else {
        info!("shutdown complete, all workers flushed");
    }

    Ok(())
}
