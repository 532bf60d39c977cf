//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::error::Error;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub criteria: CriteriaConfig,
    #[serde(default)]
    pub reputation: ReputationConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// PumpPortal websocket settings
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_pumpportal_ws_url")]
    pub ws_url: String,
    /// First reconnect delay, doubled per consecutive failure
    #[serde(default = "default_reconnect_base_secs")]
    pub reconnect_base_secs: u64,
    /// Reconnect delay ceiling
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ws_url: default_pumpportal_ws_url(),
            reconnect_base_secs: default_reconnect_base_secs(),
            reconnect_max_secs: default_reconnect_max_secs(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

/// REST poll sources
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// HTTP request timeout shared by all poll sources
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Number of entities requested per snapshot
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_dexscreener")]
    pub dexscreener: PollSourceConfig,
    #[serde(default = "default_birdeye")]
    pub birdeye: PollSourceConfig,
    #[serde(default = "default_pumpfun")]
    pub pumpfun: PollSourceConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            page_size: default_page_size(),
            dexscreener: default_dexscreener(),
            birdeye: default_birdeye(),
            pumpfun: default_pumpfun(),
        }
    }
}

/// A single poll source
#[derive(Debug, Clone, Deserialize)]
pub struct PollSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Empty means the adapter's built-in endpoint
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    /// Delay before the first poll, so sources do not fire in lockstep
    #[serde(default)]
    pub start_delay_ms: u64,
    #[serde(default)]
    pub api_key: String,
}

/// Global dedup store settings
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    /// Store is cleared wholesale once it grows past this many entries
    #[serde(default = "default_dedup_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_eviction_interval_secs")]
    pub eviction_interval_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_entries: default_dedup_max_entries(),
            eviction_interval_secs: default_eviction_interval_secs(),
        }
    }
}

/// Named keyword group used for theme gating and scoring
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ThemeConfig {
    pub name: String,
    pub keywords: Vec<String>,
    /// Hot themes score higher than soft ones
    #[serde(default)]
    pub hot: bool,
}

/// Raw eligibility and priority criteria, compiled into
/// [`crate::filter::Criteria`] at startup
#[derive(Debug, Clone, Deserialize)]
pub struct CriteriaConfig {
    /// Liquidity bounds, in SOL
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: f64,
    #[serde(default = "default_max_liquidity")]
    pub max_liquidity: f64,
    /// Approximate SOL price used to convert between SOL and USD liquidity
    #[serde(default = "default_sol_usd_rate")]
    pub sol_usd_rate: f64,
    #[serde(default = "default_max_token_age_secs")]
    pub max_token_age_secs: u64,
    #[serde(default = "default_min_symbol_length")]
    pub min_symbol_length: usize,
    #[serde(default = "default_max_symbol_length")]
    pub max_symbol_length: usize,
    #[serde(default = "default_max_symbol_digits")]
    pub max_symbol_digits: usize,
    #[serde(default = "default_blacklist_keywords")]
    pub blacklist_keywords: Vec<String>,
    #[serde(default = "default_banned_patterns")]
    pub banned_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub require_theme_match: bool,
    #[serde(default = "default_themes")]
    pub themes: Vec<ThemeConfig>,
    #[serde(default = "default_allowed_sources")]
    pub allowed_sources: Vec<String>,
    #[serde(default = "default_min_priority_score")]
    pub min_priority_score: u32,
    #[serde(default = "default_max_priority_score")]
    pub max_priority_score: u32,
    #[serde(default = "default_true")]
    pub block_bad_devs: bool,
    #[serde(default = "default_true")]
    pub boost_good_devs: bool,
    #[serde(default = "default_elite_dev_bonus")]
    pub elite_dev_bonus: u32,
    #[serde(default = "default_good_dev_bonus")]
    pub good_dev_bonus: u32,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            min_liquidity: default_min_liquidity(),
            max_liquidity: default_max_liquidity(),
            sol_usd_rate: default_sol_usd_rate(),
            max_token_age_secs: default_max_token_age_secs(),
            min_symbol_length: default_min_symbol_length(),
            max_symbol_length: default_max_symbol_length(),
            max_symbol_digits: default_max_symbol_digits(),
            blacklist_keywords: default_blacklist_keywords(),
            banned_patterns: default_banned_patterns(),
            require_theme_match: true,
            themes: default_themes(),
            allowed_sources: default_allowed_sources(),
            min_priority_score: default_min_priority_score(),
            max_priority_score: default_max_priority_score(),
            block_bad_devs: true,
            boost_good_devs: true,
            elite_dev_bonus: default_elite_dev_bonus(),
            good_dev_bonus: default_good_dev_bonus(),
        }
    }
}

/// Initial creator allow/deny lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReputationConfig {
    #[serde(default)]
    pub elite: Vec<String>,
    #[serde(default)]
    pub blacklisted: Vec<String>,
}

/// Telegram notifier settings (credentials come from the environment)
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    #[serde(default = "default_true")]
    pub disable_preview: bool,
    #[serde(default = "default_notifier_timeout_secs")]
    pub timeout_secs: u64,
    /// Send a banner message when the scanner starts
    #[serde(default = "default_true")]
    pub send_banner: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            api_url: default_telegram_api_url(),
            disable_preview: true,
            timeout_secs: default_notifier_timeout_secs(),
            send_banner: true,
        }
    }
}

/// Telegram bot credentials read from the process environment
#[derive(Clone)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("bot_token", &"***")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

impl TelegramCredentials {
    /// Read credentials from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`
    pub fn from_env() -> crate::error::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && !v.starts_with("YOUR_"))
                .ok_or_else(|| Error::MissingEnvVar(key.to_string()))
        };

        Ok(Self {
            bot_token: read(BOT_TOKEN_ENV)?,
            chat_id: read(CHAT_ID_ENV)?,
        })
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_pumpportal_ws_url() -> String {
    "wss://pumpportal.fun/api/data".into()
}

fn default_reconnect_base_secs() -> u64 {
    5
}

fn default_reconnect_max_secs() -> u64 {
    60
}

fn default_ping_interval_secs() -> u64 {
    20
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> usize {
    50
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_dexscreener() -> PollSourceConfig {
    PollSourceConfig {
        enabled: true,
        base_url: "https://api.dexscreener.com".into(),
        interval_secs: default_poll_interval_secs(),
        start_delay_ms: 0,
        api_key: String::new(),
    }
}

fn default_birdeye() -> PollSourceConfig {
    PollSourceConfig {
        enabled: true,
        base_url: "https://public-api.birdeye.so".into(),
        interval_secs: default_poll_interval_secs(),
        start_delay_ms: 2000,
        api_key: std::env::var("BIRDEYE_API_KEY").unwrap_or_default(),
    }
}

fn default_pumpfun() -> PollSourceConfig {
    PollSourceConfig {
        // The websocket already covers pump.fun launches
        enabled: false,
        base_url: "https://frontend-api.pump.fun".into(),
        interval_secs: default_poll_interval_secs(),
        start_delay_ms: 4000,
        api_key: String::new(),
    }
}

fn default_dedup_max_entries() -> usize {
    1000
}

fn default_eviction_interval_secs() -> u64 {
    600
}

fn default_min_liquidity() -> f64 {
    20.0
}

fn default_max_liquidity() -> f64 {
    200.0
}

fn default_sol_usd_rate() -> f64 {
    100.0
}

fn default_max_token_age_secs() -> u64 {
    600
}

fn default_min_symbol_length() -> usize {
    3
}

fn default_max_symbol_length() -> usize {
    8
}

fn default_max_symbol_digits() -> usize {
    1
}

fn default_blacklist_keywords() -> Vec<String> {
    [
        "test", "scam", "rug", "honeypot", "moon", "gem", "safe", "100x", "1000x", "lambo",
        "rocket", "millionaire", "rich", "random", "asdf", "qwerty",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_banned_patterns() -> Vec<String> {
    vec![r"\d{4,}".into(), r"[x×]\d{2,}".into()]
}

fn theme(name: &str, keywords: &[&str], hot: bool) -> ThemeConfig {
    ThemeConfig {
        name: name.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        hot,
    }
}

fn default_themes() -> Vec<ThemeConfig> {
    vec![
        theme(
            "dogs",
            &["dog", "doge", "shiba", "wif", "bonk", "pup", "inu", "puppy"],
            true,
        ),
        theme("cats", &["cat", "popcat", "kitty", "meow", "neko"], false),
        theme(
            "memes",
            &["pepe", "wojak", "chad", "gigachad", "smug", "apu", "bobo"],
            true,
        ),
        theme("ai", &["ai", "agent", "gpt", "chatgpt", "claude", "bot"], true),
        theme("political", &["trump", "maga", "biden", "america"], true),
        theme("food", &["pizza", "taco", "burger", "fries"], false),
    ]
}

fn default_allowed_sources() -> Vec<String> {
    ["pumpfun", "raydium", "orca", "jupiter", "birdeye"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_min_priority_score() -> u32 {
    150
}

fn default_max_priority_score() -> u32 {
    250
}

fn default_elite_dev_bonus() -> u32 {
    50
}

fn default_good_dev_bonus() -> u32 {
    25
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".into()
}

fn default_notifier_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix SCANNER__)
            .add_source(
                config::Environment::with_prefix("SCANNER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.stream.reconnect_base_secs == 0 {
            anyhow::bail!("stream.reconnect_base_secs must be positive");
        }

        if self.stream.reconnect_max_secs < self.stream.reconnect_base_secs {
            anyhow::bail!("stream.reconnect_max_secs must be >= reconnect_base_secs");
        }

        if self.poll.page_size == 0 {
            anyhow::bail!("poll.page_size must be positive");
        }

        for (name, source) in self.poll_sources() {
            if source.enabled && source.interval_secs == 0 {
                anyhow::bail!("poll.{}.interval_secs must be positive", name);
            }
            if source.enabled && !source.base_url.is_empty() {
                url::Url::parse(&source.base_url)
                    .with_context(|| format!("Invalid poll.{}.base_url", name))?;
            }
        }

        if self.stream.enabled {
            url::Url::parse(&self.stream.ws_url).context("Invalid stream.ws_url")?;
        }

        if self.dedup.max_entries == 0 {
            anyhow::bail!("dedup.max_entries must be positive");
        }

        if self.dedup.eviction_interval_secs == 0 {
            anyhow::bail!("dedup.eviction_interval_secs must be positive");
        }

        // Criteria bounds and regexes
        crate::filter::Criteria::from_config(&self.criteria)
            .context("Invalid criteria configuration")?;

        if !self.stream.enabled && !self.poll_sources().iter().any(|(_, s)| s.enabled) {
            tracing::warn!("No token sources enabled - the scanner will never see a launch");
        }

        Ok(())
    }

    /// Poll sources with their config key
    pub fn poll_sources(&self) -> [(&'static str, &PollSourceConfig); 3] {
        [
            ("dexscreener", &self.poll.dexscreener),
            ("birdeye", &self.poll.birdeye),
            ("pumpfun", &self.poll.pumpfun),
        ]
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        let c = &self.criteria;
        format!(
            r#"Configuration:
  Stream:
    enabled: {}
    ws_url: {}
    reconnect: {}s base, {}s max
  Poll:
    dexscreener: enabled={} every {}s
    birdeye: enabled={} every {}s api_key={}
    pumpfun: enabled={} every {}s
    page_size: {}
  Dedup:
    max_entries: {}
    eviction_interval: {}s
  Criteria:
    liquidity: {}-{} SOL (1 SOL ~ ${})
    max_age: {}s
    symbol_length: {}-{}
    require_theme_match: {} ({} themes)
    allowed_sources: {:?}
    priority: min {} / max {}
    block_bad_devs: {}
  Reputation:
    elite: {} wallets
    blacklisted: {} wallets
  Notifier:
    api_url: {}
    bot_token: {}
"#,
            self.stream.enabled,
            mask_url(&self.stream.ws_url),
            self.stream.reconnect_base_secs,
            self.stream.reconnect_max_secs,
            self.poll.dexscreener.enabled,
            self.poll.dexscreener.interval_secs,
            self.poll.birdeye.enabled,
            self.poll.birdeye.interval_secs,
            mask_secret(&self.poll.birdeye.api_key),
            self.poll.pumpfun.enabled,
            self.poll.pumpfun.interval_secs,
            self.poll.page_size,
            self.dedup.max_entries,
            self.dedup.eviction_interval_secs,
            c.min_liquidity,
            c.max_liquidity,
            c.sol_usd_rate,
            c.max_token_age_secs,
            c.min_symbol_length,
            c.max_symbol_length,
            c.require_theme_match,
            c.themes.len(),
            c.allowed_sources,
            c.min_priority_score,
            c.max_priority_score,
            c.block_bad_devs,
            self.reputation.elite.len(),
            self.reputation.blacklisted.len(),
            self.notifier.api_url,
            mask_secret(&std::env::var(BOT_TOKEN_ENV).unwrap_or_default()),
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

fn mask_secret(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "***"
    }
}
