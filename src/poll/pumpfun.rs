//! pump.fun frontend API poller
//!
//! Backstop for the websocket stream: lists the newest coins by creation
//! time. Disabled by default since the stream already covers pump.fun.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::PollSourceConfig;
use crate::error::Result;
use crate::poll::{base_url_or, fetch_body, non_empty, PollEntry, PollSource};
use crate::token::{timestamp_from_millis, Liquidity, Socials, Source, TokenEvent};

pub const NAME: &str = "pumpfun";
const PUMPFUN_API_BASE: &str = "https://frontend-api.pump.fun";
const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

#[derive(Debug, Clone, Deserialize)]
pub struct PumpFunCoin {
    pub mint: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    /// Lamports
    pub virtual_sol_reserves: Option<f64>,
    pub creator: Option<String>,
    /// Milliseconds since epoch
    pub created_timestamp: Option<i64>,
    pub bonding_curve: Option<String>,
    pub image_uri: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
    pub usd_market_cap: Option<f64>,
}

impl PumpFunCoin {
    fn into_entry(self) -> Option<PollEntry> {
        let key = non_empty(self.mint)?;

        let mut event = TokenEvent::new(
            key.clone(),
            self.name.unwrap_or_else(|| "Unknown".to_string()),
            self.symbol.unwrap_or_else(|| "UNKNOWN".to_string()),
            Source::PumpFun,
            Liquidity::sol(self.virtual_sol_reserves.unwrap_or(0.0) / LAMPORTS_PER_SOL),
            timestamp_from_millis(self.created_timestamp),
        )
        .ok()?;

        event.creator = self.creator.unwrap_or_default();
        event.bonding_curve = non_empty(self.bonding_curve);
        event.image_uri = non_empty(self.image_uri);
        event.market_cap = self.usd_market_cap.unwrap_or(0.0);
        event.socials = Socials {
            telegram: non_empty(self.telegram),
            twitter: non_empty(self.twitter),
            website: non_empty(self.website),
        };
        Some(PollEntry { key, event })
    }
}

/// Parse a coin listing; anything other than a JSON array is an empty list
pub fn parse_coins(body: &str) -> Result<Vec<PollEntry>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let serde_json::Value::Array(coins) = value else {
        debug!("pump.fun returned a non-array body");
        return Ok(Vec::new());
    };

    Ok(coins
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<PumpFunCoin>(value) {
            Ok(coin) => coin.into_entry(),
            Err(e) => {
                debug!("Skipping undecodable pump.fun coin: {}", e);
                None
            }
        })
        .collect())
}

pub struct PumpFunSource {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl PumpFunSource {
    pub fn new(client: reqwest::Client, config: &PollSourceConfig, page_size: usize) -> Self {
        Self {
            client,
            base_url: base_url_or(config, PUMPFUN_API_BASE),
            page_size,
        }
    }
}

#[async_trait]
impl PollSource for PumpFunSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self) -> Result<Vec<PollEntry>> {
        let url = format!("{}/coins", self.base_url);
        let limit = self.page_size.to_string();
        let request = self.client.get(&url).query(&[
            ("limit", limit.as_str()),
            ("offset", "0"),
            ("sort", "created_timestamp"),
            ("order", "DESC"),
        ]);

        let body = fetch_body(request, NAME).await?;
        let mut entries = parse_coins(&body)?;
        entries.truncate(self.page_size);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coins() {
        let body = r#"[
            {
                "mint": "PumpMint1pump",
                "name": "Shiba Pizza",
                "symbol": "SHIBZA",
                "virtual_sol_reserves": 32500000000,
                "creator": "Creator1",
                "created_timestamp": 1700000000123,
                "bonding_curve": "Curve1",
                "image_uri": "https://ipfs.example/img.png",
                "twitter": "https://x.com/shibza",
                "telegram": "",
                "usd_market_cap": 7400.25
            },
            {"name": "missing mint"}
        ]"#;

        let entries = parse_coins(body).unwrap();
        assert_eq!(entries.len(), 1);

        let event = &entries[0].event;
        assert_eq!(entries[0].key, "PumpMint1pump");
        assert_eq!(event.source, Source::PumpFun);
        assert_eq!(event.liquidity, Liquidity::sol(32.5));
        assert_eq!(event.creator, "Creator1");
        assert_eq!(event.created_at.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(event.bonding_curve.as_deref(), Some("Curve1"));
        assert_eq!(event.socials.twitter.as_deref(), Some("https://x.com/shibza"));
        // Blank links are dropped
        assert!(event.socials.telegram.is_none());
        assert_eq!(event.market_cap, 7400.25);
    }

    #[test]
    fn test_parse_coins_non_array() {
        assert!(parse_coins(r#"{"error": "rate limited"}"#).unwrap().is_empty());
        assert!(parse_coins("oops").is_err());
    }
}
