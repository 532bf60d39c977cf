//! DexScreener pair search
//!
//! Catches new Solana pools on every DEX DexScreener indexes. Liquidity is
//! reported in USD.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::PollSourceConfig;
use crate::error::Result;
use crate::poll::{base_url_or, fetch_body, non_empty, PollEntry, PollSource};
use crate::token::{timestamp_from_millis, Liquidity, Source, TokenEvent};

pub const NAME: &str = "dexscreener";
const DEXSCREENER_BASE: &str = "https://api.dexscreener.com";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseToken {
    #[serde(default)]
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PairLiquidity {
    pub usd: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PairVolume {
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexPair {
    #[serde(rename = "dexId", default)]
    pub dex_id: String,
    #[serde(rename = "pairAddress")]
    pub pair_address: Option<String>,
    #[serde(rename = "baseToken", default)]
    pub base_token: BaseToken,
    pub liquidity: Option<PairLiquidity>,
    pub volume: Option<PairVolume>,
    pub fdv: Option<f64>,
    #[serde(rename = "pairCreatedAt")]
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub pairs: Option<Vec<serde_json::Value>>,
}

impl DexPair {
    fn into_entry(self) -> Option<PollEntry> {
        let key = non_empty(self.pair_address)?;

        let mut event = TokenEvent::new(
            self.base_token.address,
            self.base_token
                .name
                .unwrap_or_else(|| "Unknown".to_string()),
            self.base_token
                .symbol
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            Source::from_dex_id(&self.dex_id),
            Liquidity::usd(self.liquidity.and_then(|l| l.usd).unwrap_or(0.0)),
            timestamp_from_millis(self.pair_created_at),
        )
        .map_err(|e| debug!("Skipping pair {}: {}", key, e))
        .ok()?;

        event.market_cap = self.fdv.unwrap_or(0.0);
        event.volume = self.volume.and_then(|v| v.h24).unwrap_or(0.0);
        event.pool_id = Some(key.clone());
        Some(PollEntry { key, event })
    }
}

/// Parse a search response, keeping at most `limit` pairs
///
/// Pairs that fail to decode are skipped individually.
pub fn parse_search(body: &str, limit: usize) -> Result<Vec<PollEntry>> {
    let response: SearchResponse = serde_json::from_str(body)?;

    Ok(response
        .pairs
        .unwrap_or_default()
        .into_iter()
        .take(limit)
        .filter_map(|value| match serde_json::from_value::<DexPair>(value) {
            Ok(pair) => pair.into_entry(),
            Err(e) => {
                debug!("Skipping undecodable pair: {}", e);
                None
            }
        })
        .collect())
}

pub struct DexScreenerSource {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl DexScreenerSource {
    pub fn new(client: reqwest::Client, config: &PollSourceConfig, page_size: usize) -> Self {
        Self {
            client,
            base_url: base_url_or(config, DEXSCREENER_BASE),
            page_size,
        }
    }
}

#[async_trait]
impl PollSource for DexScreenerSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self) -> Result<Vec<PollEntry>> {
        let url = format!("{}/latest/dex/search/", self.base_url);
        let body = fetch_body(self.client.get(&url).query(&[("q", "solana")]), NAME).await?;
        parse_search(&body, self.page_size)
    }
}
