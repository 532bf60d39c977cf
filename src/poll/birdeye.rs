//! Birdeye token creation feed
//!
//! Often lists tokens before DexScreener does. The API key is optional;
//! without one the public rate limits apply.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::PollSourceConfig;
use crate::error::Result;
use crate::poll::{base_url_or, fetch_body, non_empty, PollEntry, PollSource};
use crate::token::{timestamp_from_secs, Liquidity, Source, TokenEvent};

pub const NAME: &str = "birdeye";
const BIRDEYE_BASE: &str = "https://public-api.birdeye.so";

#[derive(Debug, Clone, Deserialize)]
pub struct BirdeyeToken {
    pub address: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    /// USD
    pub liquidity: Option<f64>,
    pub creator: Option<String>,
    /// Seconds since epoch
    #[serde(rename = "creationTime", alias = "creation_time")]
    pub creation_time: Option<i64>,
    pub mc: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CreationData {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct CreationResponse {
    #[serde(default)]
    data: Option<CreationData>,
}

impl BirdeyeToken {
    fn into_entry(self) -> Option<PollEntry> {
        let key = non_empty(self.address)?;

        let mut event = TokenEvent::new(
            key.clone(),
            self.name.unwrap_or_else(|| "Unknown".to_string()),
            self.symbol.unwrap_or_else(|| "UNKNOWN".to_string()),
            Source::Birdeye,
            Liquidity::usd(self.liquidity.unwrap_or(0.0)),
            timestamp_from_secs(self.creation_time),
        )
        .ok()?;

        event.creator = self.creator.unwrap_or_default();
        event.market_cap = self.mc.unwrap_or(0.0);
        Some(PollEntry { key, event })
    }
}

/// Parse a token creation response
pub fn parse_creations(body: &str) -> Result<Vec<PollEntry>> {
    let response: CreationResponse = serde_json::from_str(body)?;

    Ok(response
        .data
        .unwrap_or_default()
        .items
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<BirdeyeToken>(value) {
            Ok(token) => token.into_entry(),
            Err(e) => {
                debug!("Skipping undecodable Birdeye item: {}", e);
                None
            }
        })
        .collect())
}

pub struct BirdeyeSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    page_size: usize,
}

impl BirdeyeSource {
    pub fn new(client: reqwest::Client, config: &PollSourceConfig, page_size: usize) -> Self {
        Self {
            client,
            base_url: base_url_or(config, BIRDEYE_BASE),
            api_key: non_empty(Some(config.api_key.clone())),
            page_size,
        }
    }
}

#[async_trait]
impl PollSource for BirdeyeSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self) -> Result<Vec<PollEntry>> {
        let url = format!("{}/defi/token_creation", self.base_url);
        let limit = self.page_size.to_string();
        let mut request = self.client.get(&url).query(&[
            ("sort_by", "creation_time"),
            ("sort_type", "desc"),
            ("offset", "0"),
            ("limit", limit.as_str()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let body = fetch_body(request, NAME).await?;
        let mut entries = parse_creations(&body)?;
        entries.truncate(self.page_size);
        Ok(entries)
    }
}
