//! Token eligibility filtering
//!
//! Ordered short-circuit chain over a token event; the first failing
//! predicate decides the reason. Cheap reputation gating runs first so a
//! blocked developer never reaches the regex checks.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::filter::criteria::Criteria;
use crate::token::{Liquidity, Reputation, TokenEvent};

/// Reason why a token was filtered
#[derive(Debug, Clone, PartialEq)]
pub enum FilterReason {
    /// Creator classified as bad and blocking is enabled
    BadDeveloper(String),
    /// Older than the maximum age
    TooOld { age_secs: f64, max_secs: u64 },
    /// Liquidity below minimum (in SOL after conversion)
    LiquidityTooLow { liquidity: Liquidity, sol: f64 },
    /// Liquidity above maximum (in SOL after conversion)
    LiquidityTooHigh { liquidity: Liquidity, sol: f64 },
    SymbolTooShort(usize),
    SymbolTooLong(usize),
    /// Name or symbol contains a blacklisted keyword
    Blacklisted(String),
    /// Name or symbol matches a banned regex
    BannedPattern(String),
    /// Theme matching is required and nothing matched
    NoThemeMatch,
    TooManyDigits(usize),
    SourceNotAllowed(String),
}

impl std::fmt::Display for FilterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterReason::BadDeveloper(creator) => {
                write!(f, "known bad developer {}", short(creator))
            }
            FilterReason::TooOld { age_secs, max_secs } => {
                write!(f, "too old ({:.0}s > {}s)", age_secs, max_secs)
            }
            FilterReason::LiquidityTooLow { liquidity, sol } => {
                write!(f, "low liquidity ({} ~ {:.2} SOL)", liquidity, sol)
            }
            FilterReason::LiquidityTooHigh { liquidity, sol } => {
                write!(f, "high liquidity ({} ~ {:.2} SOL)", liquidity, sol)
            }
            FilterReason::SymbolTooShort(len) => write!(f, "symbol too short ({})", len),
            FilterReason::SymbolTooLong(len) => write!(f, "symbol too long ({})", len),
            FilterReason::Blacklisted(keyword) => write!(f, "blacklisted keyword: {}", keyword),
            FilterReason::BannedPattern(pattern) => write!(f, "banned pattern: {}", pattern),
            FilterReason::NoThemeMatch => write!(f, "no theme match"),
            FilterReason::TooManyDigits(count) => write!(f, "too many digits ({})", count),
            FilterReason::SourceNotAllowed(source) => write!(f, "source {} not allowed", source),
        }
    }
}

fn short(s: &str) -> String {
    s.chars().take(8).collect::<String>() + "..."
}

/// Filter result
#[derive(Debug, Clone, PartialEq)]
pub enum FilterResult {
    /// Token passed all filters
    Pass,
    /// Token was filtered
    Filtered(FilterReason),
}

impl FilterResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, FilterResult::Pass)
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, FilterResult::Filtered(_))
    }

    /// Human-readable reason ("passed" for a pass)
    pub fn reason(&self) -> String {
        match self {
            FilterResult::Pass => "passed".to_string(),
            FilterResult::Filtered(reason) => reason.to_string(),
        }
    }
}

/// Eligibility filter over shared criteria
#[derive(Clone)]
pub struct EligibilityFilter {
    criteria: Arc<Criteria>,
}

impl EligibilityFilter {
    pub fn new(criteria: Arc<Criteria>) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Evaluate an event against the current time
    pub fn evaluate(&self, event: &TokenEvent) -> FilterResult {
        self.evaluate_at(event, Utc::now())
    }

    /// Evaluate an event at a fixed instant
    ///
    /// Pure in (event, criteria, event reputation, now).
    pub fn evaluate_at(&self, event: &TokenEvent, now: DateTime<Utc>) -> FilterResult {
        let result = self.check_chain(event, now);
        if let FilterResult::Filtered(reason) = &result {
            debug!(
                address = %event.address(),
                symbol = %event.symbol,
                "Token filtered: {}",
                reason
            );
        }
        result
    }

    fn check_chain(&self, event: &TokenEvent, now: DateTime<Utc>) -> FilterResult {
        let c = &self.criteria;

        if c.block_bad_devs && event.reputation_or_unknown() == Reputation::Bad {
            return FilterResult::Filtered(FilterReason::BadDeveloper(event.creator.clone()));
        }

        let age_secs = event.age_secs_at(now);
        if age_secs > c.max_token_age_secs as f64 {
            return FilterResult::Filtered(FilterReason::TooOld {
                age_secs,
                max_secs: c.max_token_age_secs,
            });
        }

        // Approximate for USD sources: converted at the configured SOL price
        let sol = event.liquidity.in_sol(c.sol_usd_rate);
        if sol < c.min_liquidity {
            return FilterResult::Filtered(FilterReason::LiquidityTooLow {
                liquidity: event.liquidity,
                sol,
            });
        }
        if sol > c.max_liquidity {
            return FilterResult::Filtered(FilterReason::LiquidityTooHigh {
                liquidity: event.liquidity,
                sol,
            });
        }

        let symbol_len = event.symbol.chars().count();
        if symbol_len < c.min_symbol_length {
            return FilterResult::Filtered(FilterReason::SymbolTooShort(symbol_len));
        }
        if symbol_len > c.max_symbol_length {
            return FilterResult::Filtered(FilterReason::SymbolTooLong(symbol_len));
        }

        let name_lower = event.name.to_lowercase();
        let symbol_lower = event.symbol.to_lowercase();

        if let Some(keyword) = c
            .blacklist_keywords
            .iter()
            .find(|k| name_lower.contains(k.as_str()) || symbol_lower.contains(k.as_str()))
        {
            return FilterResult::Filtered(FilterReason::Blacklisted(keyword.clone()));
        }

        if let Some(pattern) = c
            .banned_patterns
            .iter()
            .find(|p| p.is_match(&name_lower) || p.is_match(&symbol_lower))
        {
            return FilterResult::Filtered(FilterReason::BannedPattern(pattern.to_string()));
        }

        if c.require_theme_match && c.matching_theme(&name_lower, &symbol_lower).is_none() {
            return FilterResult::Filtered(FilterReason::NoThemeMatch);
        }

        let digits = event.symbol.chars().filter(|ch| ch.is_ascii_digit()).count();
        if digits > c.max_symbol_digits {
            return FilterResult::Filtered(FilterReason::TooManyDigits(digits));
        }

        if !c.allowed_sources.is_empty() {
            let tag = event.source.tag();
            if !c.allowed_sources.contains(&tag) {
                return FilterResult::Filtered(FilterReason::SourceNotAllowed(tag));
            }
        }

        FilterResult::Pass
    }
}
