mod error;
mod types;
mod indicators;
mod smc;
mod derivatives;
mod gates;
mod planner;
mod scorer;
mod exchange;
mod config;
mod orchestrator;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::{load_app_config, AppConfig, AppConfigManager};
use orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "derivs-pipeline")]
#[command(author = "Trading Systems")]
#[command(version = "0.1.0")]
#[command(about = "Derivatives-regime decision pipeline for perpetual futures", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scan loop continuously, evaluating every configured symbol on each tick
    Scan,
    /// Run a single tick and print any surviving candidates, then exit
    Analyze {
        /// Restrict the tick to a single symbol instead of the configured list
        #[arg(short, long)]
        symbol: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("derivs-pipeline v0.1.0");

    let config = match load_app_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "could not load {}, falling back to defaults", cli.config);
            AppConfig::default()
        }
    };

    match cli.command {
        Commands::Scan => run_scan(config).await?,
        Commands::Analyze { symbol } => run_analyze(config, symbol).await?,
    }

    Ok(())
}

async fn run_scan(config: AppConfig) -> Result<()> {
    info!(symbols = ?config.symbols, interval_sec = config.scan_interval_sec, "starting scan loop");
    let manager = AppConfigManager::new(config);
    let orchestrator = Orchestrator::new(manager);
    orchestrator.run_forever().await;
    Ok(())
}

async fn run_analyze(mut config: AppConfig, symbol: Option<String>) -> Result<()> {
    if let Some(symbol) = symbol {
        config.symbols = vec![symbol];
    }
    let manager = AppConfigManager::new(config);
    let orchestrator = Orchestrator::new(manager);

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let outcome = match orchestrator.run_tick(now).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "tick failed");
            return Err(err.into());
        }
    };

    println!("--- gate/plan/score trace ---");
    for entry in &outcome.journal {
        println!("[{}] {} -> {}: {}", entry.tick_seq, entry.symbol, entry.stage, entry.reason);
    }

    if outcome.candidates.is_empty() {
        println!("no trade candidates this tick");
    }
    for candidate in &outcome.candidates {
        println!(
            "{} {:?} tier={:?} score={} entry1={} sl={} rr_tp2={:?}",
            candidate.plan.symbol,
            candidate.plan.intent,
            candidate.score.tier,
            candidate.score.score_0_100,
            candidate.plan.entry1,
            candidate.plan.sl,
            candidate.score.rr_tp2,
        );
    }

    Ok(())
}
