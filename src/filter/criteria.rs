//! Compiled eligibility and priority criteria
//!
//! Built once at startup from [`CriteriaConfig`]: keywords are lower-cased,
//! regexes compiled and bounds checked. Shared read-only afterwards.

use regex::Regex;
use std::collections::HashSet;

use crate::config::CriteriaConfig;
use crate::error::{Error, Result};

/// Keyword group; `hot` themes earn the larger scoring bonus
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub keywords: Vec<String>,
    pub hot: bool,
}

/// Immutable criteria used by the eligibility filter and the scorer
#[derive(Debug, Clone)]
pub struct Criteria {
    /// Liquidity bounds in SOL
    pub min_liquidity: f64,
    pub max_liquidity: f64,
    /// Approximate SOL price for converting USD-denominated liquidity
    pub sol_usd_rate: f64,
    pub max_token_age_secs: u64,
    pub min_symbol_length: usize,
    pub max_symbol_length: usize,
    pub max_symbol_digits: usize,
    /// Lower-cased
    pub blacklist_keywords: Vec<String>,
    pub banned_patterns: Vec<Regex>,
    pub require_theme_match: bool,
    /// Evaluated in configuration order
    pub themes: Vec<Theme>,
    /// Empty allows every source
    pub allowed_sources: HashSet<String>,
    pub min_priority_score: u32,
    pub max_priority_score: u32,
    pub block_bad_devs: bool,
    pub boost_good_devs: bool,
    pub elite_dev_bonus: u32,
    pub good_dev_bonus: u32,
}

impl Criteria {
    /// Compile and validate raw criteria
    pub fn from_config(config: &CriteriaConfig) -> Result<Self> {
        if config.min_liquidity < 0.0 || config.min_liquidity > config.max_liquidity {
            return Err(Error::Config(format!(
                "liquidity bounds invalid: min {} max {}",
                config.min_liquidity, config.max_liquidity
            )));
        }

        if config.sol_usd_rate <= 0.0 {
            return Err(Error::Config("sol_usd_rate must be positive".to_string()));
        }

        if config.min_symbol_length > config.max_symbol_length {
            return Err(Error::Config(format!(
                "symbol length bounds invalid: min {} max {}",
                config.min_symbol_length, config.max_symbol_length
            )));
        }

        if config.max_priority_score == 0 {
            return Err(Error::Config(
                "max_priority_score must be positive".to_string(),
            ));
        }

        if config.min_priority_score > config.max_priority_score {
            tracing::warn!(
                min = config.min_priority_score,
                max = config.max_priority_score,
                "min_priority_score exceeds max_priority_score - nothing will be dispatched"
            );
        }

        let banned_patterns = config
            .banned_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidRegex(e.to_string()))?;

        let blacklist_keywords = normalize_keywords(&config.blacklist_keywords);

        let mut themes = Vec::with_capacity(config.themes.len());
        for theme in &config.themes {
            let keywords = normalize_keywords(&theme.keywords);
            if keywords.is_empty() {
                return Err(Error::Config(format!(
                    "theme '{}' has no keywords",
                    theme.name
                )));
            }
            themes.push(Theme {
                name: theme.name.clone(),
                keywords,
                hot: theme.hot,
            });
        }

        if config.require_theme_match && themes.is_empty() {
            return Err(Error::Config(
                "require_theme_match is set but no themes are configured".to_string(),
            ));
        }

        let allowed_sources = config
            .allowed_sources
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            min_liquidity: config.min_liquidity,
            max_liquidity: config.max_liquidity,
            sol_usd_rate: config.sol_usd_rate,
            max_token_age_secs: config.max_token_age_secs,
            min_symbol_length: config.min_symbol_length,
            max_symbol_length: config.max_symbol_length,
            max_symbol_digits: config.max_symbol_digits,
            blacklist_keywords,
            banned_patterns,
            require_theme_match: config.require_theme_match,
            themes,
            allowed_sources,
            min_priority_score: config.min_priority_score,
            max_priority_score: config.max_priority_score,
            block_bad_devs: config.block_bad_devs,
            boost_good_devs: config.boost_good_devs,
            elite_dev_bonus: config.elite_dev_bonus,
            good_dev_bonus: config.good_dev_bonus,
        })
    }

    /// First theme (in configuration order) with a keyword contained in
    /// either lower-cased string
    pub fn matching_theme(&self, name_lower: &str, symbol_lower: &str) -> Option<(&Theme, &str)> {
        self.themes.iter().find_map(|theme| {
            theme
                .keywords
                .iter()
                .find(|k| name_lower.contains(k.as_str()) || symbol_lower.contains(k.as_str()))
                .map(|k| (theme, k.as_str()))
        })
    }
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
