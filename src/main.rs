//! Multi-launchpad token scanner
//!
//! Watches pump.fun, DexScreener and Birdeye for new Solana token launches and
//! sends scored Telegram alerts for the ones that pass the configured criteria.
//! Alerts are informational only; nothing here trades.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use launch_scanner::cli::commands;
use launch_scanner::config::Config;

/// Multi-launchpad token scanner
#[derive(Parser)]
#[command(name = "scanner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "scanner.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start scanning and sending alerts
    Run {
        /// Log alerts instead of sending them to Telegram
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Poll each enabled source once and print what it returns
    Check,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(
        "launch_scanner=info"
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        builder.json().init();
    } else {
        builder.with_file(true).with_line_number(true).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(commands::EXIT_CONFIG);
        }
    };

    let result = match cli.command {
        Commands::Run { dry_run } => commands::run(&config, dry_run).await,
        Commands::Config => commands::show_config(&config),
        Commands::Check => commands::check(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(commands::exit_code(&e));
    }

    Ok(())
}
