//! Poll module - pull-based token discovery
//!
//! Each REST source returns a bounded, newest-first snapshot. A [`PollAdapter`]
//! wraps one source with its own seen-set and emits only entities it has not
//! observed before. Failed requests produce an empty tick.

pub mod birdeye;
pub mod dexscreener;
pub mod pumpfun;

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{PollConfig, PollSourceConfig};
use crate::error::{Error, Result};
use crate::token::TokenEvent;

pub use birdeye::BirdeyeSource;
pub use dexscreener::DexScreenerSource;
pub use pumpfun::PumpFunSource;

/// Seen-set size at which an adapter forgets everything and starts over
const MAX_SEEN_KEYS: usize = 10_000;

/// One entity from a snapshot, keyed by the source's natural identifier
#[derive(Debug, Clone)]
pub struct PollEntry {
    pub key: String,
    pub event: TokenEvent,
}

/// A REST endpoint that lists recently created tokens
#[async_trait]
pub trait PollSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Fetch the current snapshot, newest first
    async fn fetch(&self) -> Result<Vec<PollEntry>>;
}

/// Poll source with its own memory of what it already emitted
pub struct PollAdapter {
    source: Box<dyn PollSource>,
    seen: HashSet<String>,
    interval: Duration,
    start_delay: Duration,
}

impl PollAdapter {
    pub fn new(source: Box<dyn PollSource>, interval: Duration, start_delay: Duration) -> Self {
        Self {
            source,
            seen: HashSet::new(),
            interval,
            start_delay,
        }
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Fetch once and return only entities not seen by this adapter before
    pub async fn poll_once(&mut self) -> Vec<TokenEvent> {
        let entries = match self.source.fetch().await {
            Ok(entries) => entries,
            Err(e) if e.is_retryable() => {
                warn!("{} poll failed: {}", self.source.name(), e);
                return Vec::new();
            }
            // Unexpected body shape
            Err(e) => {
                error!("{} returned an unusable snapshot: {}", self.source.name(), e);
                return Vec::new();
            }
        };

        if self.seen.len() > MAX_SEEN_KEYS {
            debug!("{} seen-set full, clearing", self.source.name());
            self.seen.clear();
        }

        let fresh: Vec<TokenEvent> = entries
            .into_iter()
            .filter(|entry| !entry.key.is_empty())
            .filter(|entry| self.seen.insert(entry.key.clone()))
            .map(|entry| entry.event)
            .collect();

        if !fresh.is_empty() {
            debug!("{}: {} new token(s)", self.source.name(), fresh.len());
        }
        fresh
    }

    /// Poll on the configured interval until cancelled
    pub async fn run(mut self, sink: mpsc::Sender<TokenEvent>, cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(self.start_delay) => {}
        }
        info!(
            "{} polling every {}s",
            self.source.name(),
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let events = tokio::select! {
                _ = cancel.cancelled() => break,
                events = self.poll_once() => events,
            };

            for event in events {
                if sink.send(event).await.is_err() {
                    warn!("Event channel closed, stopping {} poller", self.source.name());
                    return;
                }
            }
        }

        debug!("{} poller stopped", self.source.name());
    }
}

/// Shared HTTP client for poll sources
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Send a request and return the body of a 200 response
pub(crate) async fn fetch_body(request: reqwest::RequestBuilder, source_name: &str) -> Result<String> {
    let resp = request.send().await.map_err(|e| Error::PollTransport {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })?;

    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::PollStatus {
            source_name: source_name.to_string(),
            status: status.as_u16(),
        });
    }

    resp.text().await.map_err(|e| Error::PollTransport {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}

/// Use the configured URL, or the source's built-in one when blank
pub(crate) fn base_url_or(config: &PollSourceConfig, default: &str) -> String {
    let url = config.base_url.trim();
    if url.is_empty() {
        default.to_string()
    } else {
        url.trim_end_matches('/').to_string()
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build an adapter for every enabled source
pub fn adapters_from_config(config: &PollConfig) -> Vec<PollAdapter> {
    let client = http_client(Duration::from_secs(config.request_timeout_secs));
    let mut adapters = Vec::new();

    for (name, source_config) in [
        (dexscreener::NAME, &config.dexscreener),
        (birdeye::NAME, &config.birdeye),
        (pumpfun::NAME, &config.pumpfun),
    ] {
        if !source_config.enabled {
            debug!("{} poller disabled", name);
            continue;
        }

        let source: Box<dyn PollSource> = match name {
            dexscreener::NAME => Box::new(DexScreenerSource::new(
                client.clone(),
                source_config,
                config.page_size,
            )),
            birdeye::NAME => Box::new(BirdeyeSource::new(
                client.clone(),
                source_config,
                config.page_size,
            )),
            _ => Box::new(PumpFunSource::new(
                client.clone(),
                source_config,
                config.page_size,
            )),
        };

        adapters.push(PollAdapter::new(
            source,
            Duration::from_secs(source_config.interval_secs.max(1)),
            Duration::from_millis(source_config.start_delay_ms),
        ));
    }

    adapters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Liquidity, Source};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns a growing snapshot, failing on every third call
    struct ScriptedSource {
        calls: Arc<AtomicUsize>,
    }

    fn entry(key: &str, address: &str) -> PollEntry {
        PollEntry {
            key: key.to_string(),
            event: TokenEvent::new(
                address,
                "Doge",
                "DOGE",
                Source::Raydium,
                Liquidity::usd(5_000.0),
                Utc::now(),
            )
            .unwrap(),
        }
    }

    #[async_trait]
    impl PollSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self) -> Result<Vec<PollEntry>> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(vec![entry("pair1", "mint1"), entry("", "mint0")]),
                1 => Ok(vec![entry("pair2", "mint2"), entry("pair1", "mint1")]),
                _ => Err(Error::PollStatus {
                    source_name: "scripted".into(),
                    status: 500,
                }),
            }
        }
    }

    fn adapter() -> PollAdapter {
        PollAdapter::new(
            Box::new(ScriptedSource {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            Duration::from_secs(30),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_poll_once_emits_only_new_keys() {
        let mut adapter = adapter();

        let first = adapter.poll_once().await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].address(), "mint1");

        let second = adapter.poll_once().await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].address(), "mint2");
        // Keyless entries are never remembered
        assert_eq!(adapter.seen_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_poll_is_empty_tick() {
        let mut adapter = adapter();
        adapter.poll_once().await;
        adapter.poll_once().await;
        assert!(adapter.poll_once().await.is_empty());
        assert_eq!(adapter.seen_count(), 2);
    }

    struct UnparseableSource;

    #[async_trait]
    impl PollSource for UnparseableSource {
        fn name(&self) -> &str {
            "unparseable"
        }

        async fn fetch(&self) -> Result<Vec<PollEntry>> {
            let err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
            Err(err.into())
        }
    }

    #[tokio::test]
    async fn test_unusable_snapshot_is_empty_tick() {
        let mut adapter =
            PollAdapter::new(Box::new(UnparseableSource), Duration::from_secs(30), Duration::ZERO);
        assert!(adapter.poll_once().await.is_empty());
        assert_eq!(adapter.seen_count(), 0);
    }

    #[tokio::test]
    async fn test_run_forwards_and_stops_on_cancel() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(adapter().run(tx, cancel.clone()));

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.address(), "mint1");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_adapters_from_config_skips_disabled() {
        let mut config = PollConfig::default();
        config.dexscreener.enabled = true;
        config.birdeye.enabled = false;
        config.pumpfun.enabled = true;

        let names: Vec<_> = adapters_from_config(&config)
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["dexscreener", "pumpfun"]);
    }

    #[test]
    fn test_base_url_or() {
        let mut config = PollSourceConfig {
            enabled: true,
            base_url: String::new(),
            interval_secs: 30,
            start_delay_ms: 0,
            api_key: String::new(),
        };
        assert_eq!(base_url_or(&config, "https://a.example"), "https://a.example");
        config.base_url = "http://127.0.0.1:8080/".into();
        assert_eq!(base_url_or(&config, "https://a.example"), "http://127.0.0.1:8080");
    }
}
