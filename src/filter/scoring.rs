//! Priority scoring for eligible tokens
//!
//! Sums independent bucketed components and clamps to the configured
//! maximum. The weights are tuning knobs, not a model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::filter::criteria::Criteria;
use crate::token::{Reputation, TokenEvent};

// Timing buckets (seconds since launch)
const SWEET_SPOT_SECS: (f64, f64) = (120.0, 300.0);
const GOOD_WINDOW_SECS: (f64, f64) = (60.0, 600.0);
const TIMING_SWEET_SPOT: u32 = 50;
const TIMING_GOOD: u32 = 45;
const TIMING_VERY_FRESH: u32 = 35;
const TIMING_STALE: u32 = 20;

// Liquidity buckets (USD estimate)
const LIQ_BEST_USD: (f64, f64) = (3_000.0, 10_000.0);
const LIQ_GOOD_USD: (f64, f64) = (2_000.0, 15_000.0);
const LIQ_FLOOR_USD: f64 = 1_500.0;
const LIQ_BEST: u32 = 40;
const LIQ_GOOD: u32 = 35;
const LIQ_FLOOR: u32 = 25;

const TWITTER_BONUS: u32 = 15;
const TELEGRAM_BONUS: u32 = 15;

const SYMBOL_IDEAL: u32 = 20;
const SYMBOL_OK: u32 = 15;
const SYMBOL_OTHER: u32 = 5;

const HOT_THEME_BONUS: u32 = 35;
const SOFT_THEME_BONUS: u32 = 25;

const CLEAN_SYMBOL_BONUS: u32 = 25;
const ALNUM_SYMBOL_BONUS: u32 = 10;
/// Prefixes tolerated in front of an alphanumeric symbol
const ALLOWED_SYMBOL_PREFIXES: &[char] = &['$'];

/// Per-component score, for logging and alert rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub timing: u32,
    pub liquidity: u32,
    pub socials: u32,
    pub symbol_length: u32,
    pub theme: u32,
    pub clean_symbol: u32,
    pub reputation: u32,
    /// Sum of components clamped to the configured maximum
    pub total: u32,
}

impl ScoreBreakdown {
    /// Saturates instead of overflowing on oversized configured bonuses
    fn raw_sum(&self) -> u32 {
        [
            self.timing,
            self.liquidity,
            self.socials,
            self.symbol_length,
            self.theme,
            self.clean_symbol,
            self.reputation,
        ]
        .into_iter()
        .fold(0u32, u32::saturating_add)
    }
}

/// Heuristic priority scorer
#[derive(Clone)]
pub struct PriorityScorer {
    criteria: Arc<Criteria>,
}

impl PriorityScorer {
    pub fn new(criteria: Arc<Criteria>) -> Self {
        Self { criteria }
    }

    /// Score against the current time
    pub fn score(&self, event: &TokenEvent) -> u32 {
        self.score_at(event, Utc::now()).total
    }

    /// Full breakdown at a fixed instant
    pub fn score_at(&self, event: &TokenEvent, now: DateTime<Utc>) -> ScoreBreakdown {
        let c = &self.criteria;
        let name_lower = event.name.to_lowercase();
        let symbol_lower = event.symbol.to_lowercase();

        let mut breakdown = ScoreBreakdown {
            timing: timing_points(event.age_secs_at(now)),
            liquidity: liquidity_points(event.liquidity.in_usd(c.sol_usd_rate)),
            socials: social_points(event),
            symbol_length: symbol_length_points(event.symbol.chars().count()),
            theme: match c.matching_theme(&name_lower, &symbol_lower) {
                Some((theme, _)) if theme.hot => HOT_THEME_BONUS,
                Some(_) => SOFT_THEME_BONUS,
                None => 0,
            },
            clean_symbol: clean_symbol_points(&event.symbol),
            reputation: match event.reputation_or_unknown() {
                Reputation::Elite => c.elite_dev_bonus,
                Reputation::Good if c.boost_good_devs => c.good_dev_bonus,
                _ => 0,
            },
            total: 0,
        };

        breakdown.total = breakdown.raw_sum().min(c.max_priority_score);
        breakdown
    }

    /// Whether a score clears the dispatch threshold
    pub fn meets_threshold(&self, score: u32) -> bool {
        score >= self.criteria.min_priority_score
    }

    pub fn min_priority(&self) -> u32 {
        self.criteria.min_priority_score
    }

    pub fn max_priority(&self) -> u32 {
        self.criteria.max_priority_score
    }
}

fn in_range(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

fn timing_points(age_secs: f64) -> u32 {
    if in_range(age_secs, SWEET_SPOT_SECS) {
        TIMING_SWEET_SPOT
    } else if in_range(age_secs, GOOD_WINDOW_SECS) {
        TIMING_GOOD
    } else if age_secs < GOOD_WINDOW_SECS.0 {
        TIMING_VERY_FRESH
    } else {
        TIMING_STALE
    }
}

fn liquidity_points(usd: f64) -> u32 {
    if in_range(usd, LIQ_BEST_USD) {
        LIQ_BEST
    } else if in_range(usd, LIQ_GOOD_USD) {
        LIQ_GOOD
    } else if usd >= LIQ_FLOOR_USD {
        LIQ_FLOOR
    } else {
        0
    }
}

// Website links are not scored
fn social_points(event: &TokenEvent) -> u32 {
    let mut points = 0;
    if event.socials.twitter.is_some() {
        points += TWITTER_BONUS;
    }
    if event.socials.telegram.is_some() {
        points += TELEGRAM_BONUS;
    }
    points
}

fn symbol_length_points(len: usize) -> u32 {
    match len {
        3..=5 => SYMBOL_IDEAL,
        6..=7 => SYMBOL_OK,
        _ => SYMBOL_OTHER,
    }
}

fn clean_symbol_points(symbol: &str) -> u32 {
    if !symbol.is_empty() && symbol.chars().all(char::is_alphabetic) {
        return CLEAN_SYMBOL_BONUS;
    }

    let body = symbol.trim_start_matches(ALLOWED_SYMBOL_PREFIXES);
    if !body.is_empty() && body.chars().all(char::is_alphanumeric) {
        ALNUM_SYMBOL_BONUS
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CriteriaConfig, ThemeConfig};
    use crate::token::{Liquidity, Source};
    use chrono::Duration;

    fn scorer() -> PriorityScorer {
        let config = CriteriaConfig {
            themes: vec![
                ThemeConfig {
                    name: "dogs".into(),
                    keywords: vec!["bonk".into(), "doge".into()],
                    hot: true,
                },
                ThemeConfig {
                    name: "food".into(),
                    keywords: vec!["pizza".into()],
                    hot: false,
                },
            ],
            ..CriteriaConfig::default()
        };
        PriorityScorer::new(Arc::new(Criteria::from_config(&config).unwrap()))
    }

    fn event_at(symbol: &str, age_secs: i64, now: DateTime<Utc>) -> TokenEvent {
        TokenEvent::new(
            "Addr1",
            symbol,
            symbol,
            Source::PumpFun,
            Liquidity::sol(50.0),
            now - Duration::seconds(age_secs),
        )
        .unwrap()
    }

    #[test]
    fn test_end_to_end_breakdown() {
        let now = Utc::now();
        let mut event = event_at("BONK2", 150, now);
        event.socials.twitter = Some("https://x.com/bonk2".into());

        let breakdown = scorer().score_at(&event, now);
        assert_eq!(breakdown.timing, 50);
        assert_eq!(breakdown.liquidity, 40);
        assert_eq!(breakdown.socials, 15);
        assert_eq!(breakdown.symbol_length, 20);
        assert_eq!(breakdown.theme, 35);
        assert_eq!(breakdown.clean_symbol, 10);
        assert_eq!(breakdown.reputation, 0);
        assert_eq!(breakdown.total, 170);
        assert!(scorer().meets_threshold(breakdown.total));
    }

    #[test]
    fn test_timing_buckets() {
        assert_eq!(timing_points(150.0), 50);
        assert_eq!(timing_points(90.0), 45);
        assert_eq!(timing_points(450.0), 45);
        assert_eq!(timing_points(10.0), 35);
        assert_eq!(timing_points(900.0), 20);
    }

    #[test]
    fn test_liquidity_buckets() {
        assert_eq!(liquidity_points(5_000.0), 40);
        assert_eq!(liquidity_points(12_000.0), 35);
        assert_eq!(liquidity_points(50_000.0), 25);
        assert_eq!(liquidity_points(1_000.0), 0);
    }

    #[test]
    fn test_website_not_scored() {
        let now = Utc::now();
        let mut event = event_at("DOGE", 150, now);
        event.socials.website = Some("https://doge.example".into());
        assert_eq!(scorer().score_at(&event, now).socials, 0);

        event.socials.telegram = Some("https://t.me/doge".into());
        event.socials.twitter = Some("https://x.com/doge".into());
        assert_eq!(scorer().score_at(&event, now).socials, 30);
    }

    #[test]
    fn test_theme_does_not_stack() {
        let now = Utc::now();
        let event = event_at("PIZZABONK", 150, now);
        // dogs is listed first and wins; food adds nothing on top
        assert_eq!(scorer().score_at(&event, now).theme, 35);

        let event = event_at("PIZZA", 150, now);
        assert_eq!(scorer().score_at(&event, now).theme, 25);
    }

    #[test]
    fn test_clean_symbol() {
        assert_eq!(clean_symbol_points("DOGE"), 25);
        assert_eq!(clean_symbol_points("BONK2"), 10);
        assert_eq!(clean_symbol_points("$WIF"), 10);
        assert_eq!(clean_symbol_points("DO-GE"), 0);
        assert_eq!(clean_symbol_points(""), 0);
    }

    #[test]
    fn test_reputation_bonus() {
        let now = Utc::now();
        let mut event = event_at("DOGE", 150, now);

        event.reputation = Some(Reputation::Elite);
        assert_eq!(scorer().score_at(&event, now).reputation, 50);

        event.reputation = Some(Reputation::Good);
        assert_eq!(scorer().score_at(&event, now).reputation, 25);

        event.reputation = Some(Reputation::Bad);
        assert_eq!(scorer().score_at(&event, now).reputation, 0);
    }

    #[test]
    fn test_elite_bonus_independent_of_good_boost() {
        let now = Utc::now();
        let config = CriteriaConfig {
            boost_good_devs: false,
            ..CriteriaConfig::default()
        };
        let scorer = PriorityScorer::new(Arc::new(Criteria::from_config(&config).unwrap()));
        let mut event = event_at("DOGE", 150, now);

        event.reputation = Some(Reputation::Elite);
        assert_eq!(scorer.score_at(&event, now).reputation, 50);

        event.reputation = Some(Reputation::Good);
        assert_eq!(scorer.score_at(&event, now).reputation, 0);
    }

    #[test]
    fn test_huge_bonus_saturates_and_clamps() {
        let now = Utc::now();
        let config = CriteriaConfig {
            elite_dev_bonus: u32::MAX,
            good_dev_bonus: u32::MAX,
            ..CriteriaConfig::default()
        };
        let scorer = PriorityScorer::new(Arc::new(Criteria::from_config(&config).unwrap()));

        let mut event = event_at("DOGE", 150, now);
        event.socials.twitter = Some("t".into());
        event.reputation = Some(Reputation::Elite);

        let breakdown = scorer.score_at(&event, now);
        assert_eq!(breakdown.raw_sum(), u32::MAX);
        assert_eq!(breakdown.total, 250);

        event.reputation = Some(Reputation::Good);
        assert_eq!(scorer.score(&event), 250);
    }

    #[test]
    fn test_score_clamped_to_max() {
        let now = Utc::now();
        let mut event = event_at("DOGE", 150, now);
        event.socials.twitter = Some("t".into());
        event.socials.telegram = Some("t".into());
        event.reputation = Some(Reputation::Elite);

        // 50 + 40 + 30 + 20 + 35 + 25 + 50 = 250
        let breakdown = scorer().score_at(&event, now);
        assert_eq!(breakdown.raw_sum(), 250);

        let config = CriteriaConfig {
            max_priority_score: 200,
            elite_dev_bonus: 500,
            ..CriteriaConfig::default()
        };
        let capped = PriorityScorer::new(Arc::new(Criteria::from_config(&config).unwrap()));
        let breakdown = capped.score_at(&event, now);
        assert!(breakdown.raw_sum() > 200);
        assert_eq!(breakdown.total, 200);
    }
}
