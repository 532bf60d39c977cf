//! Canonical token launch record
//!
//! Every adapter (stream or poll) normalizes its source-specific payload into
//! a [`TokenEvent`]. The liquidity unit travels with the value so downstream
//! code never has to guess whether a number is SOL or USD.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};

/// Where a token event was observed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    /// pump.fun launchpad (websocket stream or REST poll)
    PumpFun,
    /// Raydium pool seen through DexScreener
    Raydium,
    /// Orca pool seen through DexScreener
    Orca,
    /// Jupiter listing seen through DexScreener
    Jupiter,
    /// Birdeye token creation feed
    Birdeye,
    /// Any other DEX reported by DexScreener
    Dex(String),
}

impl Source {
    /// Map a DexScreener `dexId` to a source tag
    pub fn from_dex_id(dex_id: &str) -> Self {
        let dex_id = dex_id.to_lowercase();
        if dex_id.contains("raydium") {
            Source::Raydium
        } else if dex_id.contains("orca") {
            Source::Orca
        } else if dex_id.contains("jupiter") {
            Source::Jupiter
        } else {
            Source::Dex(dex_id)
        }
    }

    /// Stable tag used in configuration allow-lists and logs
    pub fn tag(&self) -> String {
        match self {
            Source::PumpFun => "pumpfun".to_string(),
            Source::Raydium => "raydium".to_string(),
            Source::Orca => "orca".to_string(),
            Source::Jupiter => "jupiter".to_string(),
            Source::Birdeye => "birdeye".to_string(),
            Source::Dex(id) => format!("dex_{}", id),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Unit a liquidity figure is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiquidityUnit {
    /// Native asset (SOL)
    Sol,
    /// US dollars
    Usd,
}

impl fmt::Display for LiquidityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidityUnit::Sol => write!(f, "SOL"),
            LiquidityUnit::Usd => write!(f, "USD"),
        }
    }
}

/// Liquidity amount tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Liquidity {
    pub amount: f64,
    pub unit: LiquidityUnit,
}

impl Liquidity {
    pub fn sol(amount: f64) -> Self {
        Self {
            amount,
            unit: LiquidityUnit::Sol,
        }
    }

    pub fn usd(amount: f64) -> Self {
        Self {
            amount,
            unit: LiquidityUnit::Usd,
        }
    }

    /// Amount in SOL, converting USD with an approximate SOL price
    pub fn in_sol(&self, sol_usd_rate: f64) -> f64 {
        match self.unit {
            LiquidityUnit::Sol => self.amount,
            LiquidityUnit::Usd if sol_usd_rate > 0.0 => self.amount / sol_usd_rate,
            LiquidityUnit::Usd => 0.0,
        }
    }

    /// Amount in USD, converting SOL with an approximate SOL price
    pub fn in_usd(&self, sol_usd_rate: f64) -> f64 {
        match self.unit {
            LiquidityUnit::Sol => self.amount * sol_usd_rate,
            LiquidityUnit::Usd => self.amount,
        }
    }
}

impl fmt::Display for Liquidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} {}", self.amount, self.unit)
    }
}

/// Creator reputation classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reputation {
    Elite,
    Good,
    Bad,
    Unknown,
}

impl fmt::Display for Reputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reputation::Elite => write!(f, "elite"),
            Reputation::Good => write!(f, "good"),
            Reputation::Bad => write!(f, "bad"),
            Reputation::Unknown => write!(f, "unknown"),
        }
    }
}

/// Social links attached to a launch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Socials {
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
}

/// Normalized token launch event
#[derive(Debug, Clone, Serialize)]
pub struct TokenEvent {
    address: String,
    pub name: String,
    pub symbol: String,
    pub source: Source,
    pub liquidity: Liquidity,
    /// Creator wallet (empty when the source does not report it)
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub socials: Socials,
    pub image_uri: Option<String>,
    pub bonding_curve: Option<String>,
    pub pool_id: Option<String>,
    pub market_cap: f64,
    pub volume: f64,
    pub holder_count: u64,
    /// Assigned by the scanner from the reputation tracker
    pub reputation: Option<Reputation>,
}

impl TokenEvent {
    /// Create an event; the address must be non-empty
    pub fn new(
        address: impl Into<String>,
        name: impl Into<String>,
        symbol: impl Into<String>,
        source: Source,
        liquidity: Liquidity,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(Error::MalformedEvent("empty token address".to_string()));
        }

        Ok(Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            source,
            liquidity,
            creator: String::new(),
            created_at,
            socials: Socials::default(),
            image_uri: None,
            bonding_curve: None,
            pool_id: None,
            market_cap: 0.0,
            volume: 0.0,
            holder_count: 0,
            reputation: None,
        })
    }

    /// Token mint address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Age relative to `now`, in seconds (negative clock skew reads as zero)
    pub fn age_secs_at(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.created_at).num_milliseconds().max(0);
        millis as f64 / 1000.0
    }

    pub fn age_secs(&self) -> f64 {
        self.age_secs_at(Utc::now())
    }

    /// Reputation or Unknown when none was assigned
    pub fn reputation_or_unknown(&self) -> Reputation {
        self.reputation.unwrap_or(Reputation::Unknown)
    }
}

/// Parse a millisecond epoch timestamp, defaulting to now
pub fn timestamp_from_millis(millis: Option<i64>) -> DateTime<Utc> {
    millis
        .filter(|m| *m > 0)
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

/// Parse a second epoch timestamp, defaulting to now
pub fn timestamp_from_secs(secs: Option<i64>) -> DateTime<Utc> {
    secs.filter(|s| *s > 0)
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .unwrap_or_else(Utc::now)
}
