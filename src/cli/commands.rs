//! CLI command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, TelegramCredentials};
use crate::error::Error;
use crate::filter::{Criteria, EligibilityFilter, PriorityScorer};
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::poll;
use crate::scanner::Scanner;

/// Tokens listed per source by `check`
const CHECK_PREVIEW_LIMIT: usize = 10;

/// Process exit code for configuration and credential problems
pub const EXIT_CONFIG: i32 = 2;
/// Process exit code for any other failure
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for a failed command
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(e) if e.is_fatal() => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}

/// Build the notifier for this run
///
/// Outside dry-run mode the Telegram credentials must be present.
pub fn build_notifier(config: &Config, dry_run: bool) -> Result<Arc<dyn Notifier>> {
    if dry_run {
        warn!("Running in DRY-RUN mode - alerts are logged, not sent");
        return Ok(Arc::new(LogNotifier));
    }

    let credentials = TelegramCredentials::from_env()
        .context("Telegram credentials are required (or pass --dry-run)")?;
    info!("Telegram alerts go to chat {}", credentials.chat_id);
    Ok(Arc::new(TelegramNotifier::new(&config.notifier, credentials)))
}

/// Start the scanner and run until Ctrl-C
pub async fn run(config: &Config, dry_run: bool) -> Result<()> {
    let notifier = build_notifier(config, dry_run)?;
    let scanner = Scanner::new(config, notifier)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down..."),
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
        ctrl_c.cancel();
    });

    info!("Multi-launchpad scanner started");
    scanner.run(config, cancel).await?;
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check every enabled source once without dispatching anything
pub async fn check(config: &Config) -> Result<()> {
    println!("\n=== SOURCE CHECK ===\n");

    let criteria = Arc::new(Criteria::from_config(&config.criteria)?);
    let filter = EligibilityFilter::new(criteria.clone());
    let scorer = PriorityScorer::new(criteria);
    let mut all_healthy = true;

    if config.stream.enabled {
        print!("PumpPortal WebSocket... ");
        match check_stream(config).await {
            Ok(latency) => println!("OK ({}ms)", latency),
            Err(e) => {
                println!("FAILED: {}", e);
                all_healthy = false;
            }
        }
    } else {
        println!("PumpPortal WebSocket... DISABLED");
    }

    for mut adapter in poll::adapters_from_config(&config.poll) {
        let start = Instant::now();
        let events = adapter.poll_once().await;
        let latency = start.elapsed().as_millis();

        println!(
            "\n{}... {} new token(s) ({}ms)",
            adapter.name(),
            events.len(),
            latency
        );
        if events.is_empty() {
            // Failures are logged by poll_once
            all_healthy = false;
        }

        for event in events.iter().take(CHECK_PREVIEW_LIMIT) {
            let verdict = filter.evaluate(event);
            let score = scorer.score(event);
            println!(
                "  {:<10} {:<12} {:>14} age {:>5.0}s  score {:>3}  {}",
                truncate(&event.symbol, 10),
                event.source.tag(),
                event.liquidity.to_string(),
                event.age_secs(),
                score,
                verdict.reason()
            );
        }
        if events.len() > CHECK_PREVIEW_LIMIT {
            println!("  ... and {} more", events.len() - CHECK_PREVIEW_LIMIT);
        }
    }

    println!();
    if all_healthy {
        println!("All sources healthy!");
    } else {
        println!("Some sources returned nothing. Check the log output above.");
    }

    Ok(())
}

async fn check_stream(config: &Config) -> Result<u128> {
    use tokio_tungstenite::connect_async;

    let url = url::Url::parse(&config.stream.ws_url).context("Invalid WebSocket URL")?;
    let timeout = Duration::from_secs(5);
    let start = Instant::now();

    match tokio::time::timeout(timeout, connect_async(url.as_str())).await {
        Ok(Ok((ws, _))) => {
            drop(ws);
            Ok(start.elapsed().as_millis())
        }
        Ok(Err(e)) => Err(anyhow::anyhow!("WebSocket connection failed: {}", e)),
        Err(_) => Err(anyhow::anyhow!(
            "Connection timed out after {}s",
            timeout.as_secs()
        )),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).collect::<String>() + "…"
    }
}
