//! Scanner orchestration
//!
//! Wires every producer (stream + pollers) into one event channel and runs
//! each event through dedup, reputation, filter and scoring before handing
//! the rendered alert to the notifier in a detached task.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dedup::DedupStore;
use crate::error::Result;
use crate::filter::{Criteria, EligibilityFilter, FilterReason, FilterResult, PriorityScorer};
use crate::notify::{alert, Notifier};
use crate::poll;
use crate::reputation::ReputationTracker;
use crate::stream::PumpPortalStream;
use crate::token::{Reputation, TokenEvent};

/// Bounded so a stalled consumer pushes back on producers
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// How long shutdown waits for in-flight notifications
const NOTIFY_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened to a single event
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Already dispatched earlier
    Duplicate,
    Filtered(FilterReason),
    /// Scored below the dispatch threshold
    LowPriority(u32),
    Dispatched(u32),
    /// Another caller dispatched the same address first
    Raced,
}

/// Running counters
#[derive(Debug, Default)]
pub struct ScannerStats {
    received: AtomicU64,
    duplicates: AtomicU64,
    filtered: AtomicU64,
    low_priority: AtomicU64,
    dispatched: AtomicU64,
    raced: AtomicU64,
    notify_failures: AtomicU64,
}

impl ScannerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            low_priority: self.low_priority.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            raced: self.raced.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`ScannerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub duplicates: u64,
    pub filtered: u64,
    pub low_priority: u64,
    pub dispatched: u64,
    pub raced: u64,
    pub notify_failures: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received={} duplicate={} filtered={} low_priority={} dispatched={} raced={} notify_failures={}",
            self.received,
            self.duplicates,
            self.filtered,
            self.low_priority,
            self.dispatched,
            self.raced,
            self.notify_failures
        )
    }
}

/// Token launch scanner
pub struct Scanner {
    dedup: Arc<DedupStore>,
    reputation: Arc<ReputationTracker>,
    filter: EligibilityFilter,
    scorer: PriorityScorer,
    notifier: Arc<dyn Notifier>,
    stats: Arc<ScannerStats>,
    notifications: TaskTracker,
    disable_preview: bool,
}

impl Scanner {
    pub fn new(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let criteria = Arc::new(Criteria::from_config(&config.criteria)?);

        Ok(Self {
            dedup: Arc::new(DedupStore::new(config.dedup.max_entries)),
            reputation: Arc::new(ReputationTracker::from_config(&config.reputation)),
            filter: EligibilityFilter::new(criteria.clone()),
            scorer: PriorityScorer::new(criteria),
            notifier,
            stats: Arc::new(ScannerStats::default()),
            notifications: TaskTracker::new(),
            disable_preview: config.notifier.disable_preview,
        })
    }

    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    pub fn reputation(&self) -> &ReputationTracker {
        &self.reputation
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Run one event through the pipeline
    ///
    /// Must be called inside a tokio runtime: a dispatched alert is sent from
    /// a spawned task.
    pub fn handle_event(&self, mut event: TokenEvent) -> EventOutcome {
        ScannerStats::bump(&self.stats.received);
        let now = Utc::now();

        if !self.dedup.is_new(event.address()) {
            ScannerStats::bump(&self.stats.duplicates);
            debug!("Duplicate token {}", event.address());
            return EventOutcome::Duplicate;
        }

        event.reputation = Some(self.reputation.classify(&event.creator));

        if let FilterResult::Filtered(reason) = self.filter.evaluate_at(&event, now) {
            ScannerStats::bump(&self.stats.filtered);
            debug!("❌ {}: {}", event.symbol, reason);
            return EventOutcome::Filtered(reason);
        }

        let breakdown = self.scorer.score_at(&event, now);
        let score = breakdown.total;
        if !self.scorer.meets_threshold(score) {
            ScannerStats::bump(&self.stats.low_priority);
            info!(
                "⚠️ {}: Low priority ({}/{})",
                event.symbol,
                score,
                self.scorer.min_priority()
            );
            return EventOutcome::LowPriority(score);
        }

        if !self.dedup.check_and_mark(event.address()) {
            ScannerStats::bump(&self.stats.raced);
            debug!("Lost dispatch race for {}", event.address());
            return EventOutcome::Raced;
        }

        // Counted once per address, however many sources report it
        self.reputation.observe_launch(&event.creator);
        ScannerStats::bump(&self.stats.dispatched);
        let dev_indicator = match event.reputation_or_unknown() {
            Reputation::Elite => " [ELITE DEV 👑]",
            Reputation::Good => " [GOOD DEV ✅]",
            _ => "",
        };
        info!(
            address = %event.address(),
            breakdown = ?breakdown,
            "🔥 {}: {}{} (Priority: {}/{})",
            event.source.tag().to_uppercase(),
            event.symbol,
            dev_indicator,
            score,
            self.scorer.max_priority()
        );

        let message = alert::format_alert_at(&event, score, self.scorer.max_priority(), now);
        self.dispatch(event.address().to_string(), message);
        EventOutcome::Dispatched(score)
    }

    /// Fire-and-forget notifier call; failures are logged and counted only
    fn dispatch(&self, address: String, message: String) {
        let notifier = self.notifier.clone();
        let stats = self.stats.clone();
        let disable_preview = self.disable_preview;

        self.notifications.spawn(async move {
            if let Err(e) = notifier.send(&message, disable_preview).await {
                ScannerStats::bump(&stats.notify_failures);
                error!("Alert for {} not delivered: {}", address, e);
            }
        });
    }

    /// Wait for every notification spawned so far
    pub async fn flush_notifications(&self) {
        self.notifications.close();
        self.notifications.wait().await;
        self.notifications.reopen();
    }

    /// Consume events until the channel closes or `cancel` fires
    pub async fn process(&self, mut events: mpsc::Receiver<TokenEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = events.recv() => match next {
                    Some(event) => {
                        self.handle_event(event);
                    }
                    None => {
                        warn!("All token sources stopped");
                        break;
                    }
                },
            }
        }
    }

    /// Start every enabled producer and process events until cancelled
    pub async fn run(&self, config: &Config, cancel: CancellationToken) -> Result<()> {
        if config.notifier.send_banner {
            let banner = alert::format_banner(config);
            if let Err(e) = self.notifier.send(&banner, true).await {
                warn!("Startup banner not delivered: {}", e);
            }
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut producers = Vec::new();

        if config.stream.enabled {
            let stream = PumpPortalStream::new(config.stream.clone());
            producers.push(tokio::spawn(stream.run(tx.clone(), cancel.clone())));
        }
        for adapter in poll::adapters_from_config(&config.poll) {
            info!("Starting {} poller", adapter.name());
            producers.push(tokio::spawn(adapter.run(tx.clone(), cancel.clone())));
        }
        drop(tx);

        let eviction = tokio::spawn(eviction_loop(
            self.dedup.clone(),
            self.stats.clone(),
            Duration::from_secs(config.dedup.eviction_interval_secs),
            cancel.clone(),
        ));

        info!("Scanner running with {} source(s)", producers.len());
        self.process(rx, cancel.clone()).await;

        // Stop whatever is still running if the channel closed first
        cancel.cancel();
        for result in join_all(producers).await {
            if let Err(e) = result {
                error!("Producer task failed: {}", e);
            }
        }
        if let Err(e) = eviction.await {
            error!("Eviction task failed: {}", e);
        }

        self.notifications.close();
        if tokio::time::timeout(NOTIFY_DRAIN_TIMEOUT, self.notifications.wait())
            .await
            .is_err()
        {
            warn!(
                pending = self.notifications.len(),
                "Shutting down with notifications in flight"
            );
        }

        info!("Scanner stopped: {}", self.stats.snapshot());
        Ok(())
    }
}

async fn eviction_loop(
    dedup: Arc<DedupStore>,
    stats: Arc<ScannerStats>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let dropped = dedup.evict_if_full();
                info!(
                    size = dedup.len(),
                    ceiling = dedup.max_entries(),
                    dropped,
                    "Dedup check"
                );
                info!("Stats: {}", stats.snapshot());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::token::{Liquidity, Source};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &str, _disable_preview: bool) -> Result<()> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _message: &str, _disable_preview: bool) -> Result<()> {
            Err(Error::Notifier("HTTP 400: chat not found".into()))
        }
    }

    fn bonk2(address: &str) -> TokenEvent {
        let mut event = TokenEvent::new(
            address,
            "Bonk2",
            "BONK2",
            Source::PumpFun,
            Liquidity::sol(50.0),
            Utc::now() - ChronoDuration::seconds(150),
        )
        .unwrap();
        event.creator = "Creator1".into();
        event.socials.twitter = Some("https://x.com/bonk2".into());
        event
    }

    fn scanner_with(config: &Config) -> (Scanner, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let scanner = Scanner::new(config, notifier.clone()).unwrap();
        (scanner, notifier)
    }

    #[tokio::test]
    async fn test_dispatch_then_duplicate() {
        let (scanner, notifier) = scanner_with(&Config::default());

        assert_eq!(scanner.handle_event(bonk2("Mint1")), EventOutcome::Dispatched(170));
        assert_eq!(scanner.handle_event(bonk2("Mint1")), EventOutcome::Duplicate);

        scanner.flush_notifications().await;
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("<b>BONK2</b>"));
        assert!(messages[0].contains("Priority: 170/250"));

        let stats = scanner.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.duplicates, 1);
    }

    #[tokio::test]
    async fn test_filtered_event_not_marked() {
        let mut config = Config::default();
        config.criteria.blacklist_keywords = vec!["rug".into()];
        let (scanner, notifier) = scanner_with(&config);

        let event = TokenEvent::new(
            "Mint2",
            "RandomCoin",
            "RNDC",
            Source::PumpFun,
            Liquidity::sol(50.0),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(
            scanner.handle_event(event),
            EventOutcome::Filtered(FilterReason::NoThemeMatch)
        );
        assert!(scanner.dedup().is_new("Mint2"));

        scanner.flush_notifications().await;
        assert!(notifier.messages().is_empty());
        assert_eq!(scanner.stats().filtered, 1);
    }

    #[tokio::test]
    async fn test_low_priority_not_marked() {
        let mut config = Config::default();
        config.criteria.min_priority_score = 200;
        let (scanner, _) = scanner_with(&config);

        assert_eq!(scanner.handle_event(bonk2("Mint3")), EventOutcome::LowPriority(170));
        assert!(scanner.dedup().is_new("Mint3"));
        assert_eq!(scanner.stats().low_priority, 1);
    }

    #[tokio::test]
    async fn test_blacklisted_creator_blocked() {
        let (scanner, _) = scanner_with(&Config::default());
        scanner.reputation().add_blacklisted("Creator1");

        assert!(matches!(
            scanner.handle_event(bonk2("Mint4")),
            EventOutcome::Filtered(FilterReason::BadDeveloper(_))
        ));
    }

    #[tokio::test]
    async fn test_elite_creator_boosted() {
        let mut config = Config::default();
        config.reputation.elite = vec!["Creator1".into()];
        let (scanner, notifier) = scanner_with(&config);

        assert_eq!(scanner.handle_event(bonk2("Mint5")), EventOutcome::Dispatched(220));
        scanner.flush_notifications().await;
        assert!(notifier.messages()[0].contains("ELITE DEVELOPER"));

        // Every observed launch is counted against the creator
        assert_eq!(scanner.reputation().record("Creator1").unwrap().launches, 1);
    }

    #[tokio::test]
    async fn test_launch_counted_only_on_dispatch() {
        let mut config = Config::default();
        config.criteria.min_priority_score = 200;
        let (scanner, _) = scanner_with(&config);

        // Same low-priority token from the stream and then a poller
        assert_eq!(scanner.handle_event(bonk2("Mint8")), EventOutcome::LowPriority(170));
        let mut again = bonk2("Mint8");
        again.source = Source::Raydium;
        again.liquidity = Liquidity::usd(5_000.0);
        assert!(matches!(scanner.handle_event(again), EventOutcome::LowPriority(_)));
        assert!(scanner.reputation().record("Creator1").is_none());

        let (scanner, _) = scanner_with(&Config::default());
        scanner.handle_event(bonk2("Mint9"));
        scanner.handle_event(bonk2("Mint9"));
        assert_eq!(scanner.reputation().record("Creator1").unwrap().launches, 1);
    }

    #[tokio::test]
    async fn test_notifier_failure_still_marks_seen() {
        let scanner = Scanner::new(&Config::default(), Arc::new(FailingNotifier)).unwrap();

        assert_eq!(scanner.handle_event(bonk2("Mint6")), EventOutcome::Dispatched(170));
        scanner.flush_notifications().await;

        assert_eq!(scanner.stats().notify_failures, 1);
        assert!(!scanner.dedup().is_new("Mint6"));
        assert_eq!(scanner.handle_event(bonk2("Mint6")), EventOutcome::Duplicate);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_events_dispatch_once() {
        let (scanner, notifier) = scanner_with(&Config::default());
        let scanner = Arc::new(scanner);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let scanner = scanner.clone();
                tokio::spawn(async move { scanner.handle_event(bonk2("SameMint")) })
            })
            .collect();

        let outcomes: Vec<_> = join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let dispatched = outcomes
            .iter()
            .filter(|o| matches!(o, EventOutcome::Dispatched(_)))
            .count();
        assert_eq!(dispatched, 1);
        assert!(outcomes.iter().all(|o| matches!(
            o,
            EventOutcome::Dispatched(_) | EventOutcome::Duplicate | EventOutcome::Raced
        )));

        scanner.flush_notifications().await;
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_process_stops_when_channel_closes() {
        let (scanner, notifier) = scanner_with(&Config::default());
        let (tx, rx) = mpsc::channel(8);

        tx.send(bonk2("Mint7")).await.unwrap();
        tx.send(bonk2("Mint7")).await.unwrap();
        drop(tx);

        scanner.process(rx, CancellationToken::new()).await;
        scanner.flush_notifications().await;

        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(scanner.stats().received, 2);
    }

    #[tokio::test]
    async fn test_process_stops_on_cancel() {
        let (scanner, _) = scanner_with(&Config::default());
        let (_tx, rx) = mpsc::channel::<TokenEvent>(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), scanner.process(rx, cancel))
            .await
            .unwrap();
    }

    #[test]
    fn test_stats_display() {
        let snapshot = StatsSnapshot {
            received: 3,
            dispatched: 1,
            ..StatsSnapshot::default()
        };
        assert!(snapshot.to_string().starts_with("received=3 duplicate=0"));
        assert!(snapshot.to_string().contains("dispatched=1"));
    }
}
