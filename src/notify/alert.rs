//! Telegram HTML rendering for alerts and the startup banner

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::config::Config;
use crate::token::{Reputation, Source, TokenEvent};

const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

const PREMIUM_THRESHOLD: u32 = 180;
const HOT_THRESHOLD: u32 = 170;

/// Alert tier derived from the priority score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTier {
    Premium,
    Hot,
    Quality,
}

impl AlertTier {
    pub fn from_score(score: u32) -> Self {
        if score >= PREMIUM_THRESHOLD {
            AlertTier::Premium
        } else if score >= HOT_THRESHOLD {
            AlertTier::Hot
        } else {
            AlertTier::Quality
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AlertTier::Premium => "PREMIUM",
            AlertTier::Hot => "HOT",
            AlertTier::Quality => "QUALITY",
        }
    }

    fn emoji(&self) -> &'static str {
        match self {
            AlertTier::Premium => "🚨💎🚨",
            AlertTier::Hot => "🔥🔥🔥",
            AlertTier::Quality => "🔥🔥",
        }
    }
}

fn source_emoji(source: &Source) -> &'static str {
    match source {
        Source::PumpFun => "🎪",
        Source::Raydium => "🌊",
        Source::Orca => "🐋",
        Source::Jupiter => "🪐",
        Source::Birdeye => "🦅",
        Source::Dex(_) => "📡",
    }
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_market_cap(value: f64) -> String {
    if value < 1_000.0 {
        format!("${:.0}", value)
    } else if value < 1_000_000.0 {
        format!("${:.1}K", value / 1_000.0)
    } else {
        format!("${:.2}M", value / 1_000_000.0)
    }
}

fn format_age(age_secs: f64) -> String {
    let secs = age_secs.max(0.0) as u64;
    format!("{}m {}s", secs / 60, secs % 60)
}

/// Render an alert for a dispatched token
pub fn format_alert(event: &TokenEvent, score: u32, max_score: u32) -> String {
    format_alert_at(event, score, max_score, Utc::now())
}

/// Render an alert with the age measured at `now`
pub fn format_alert_at(
    event: &TokenEvent,
    score: u32,
    max_score: u32,
    now: DateTime<Utc>,
) -> String {
    let tier = AlertTier::from_score(score);
    let age = event.age_secs_at(now);
    let address = escape_html(event.address());

    let mut msg = String::new();
    let _ = write!(
        msg,
        "{emoji} <b>{label} LAUNCH</b> {emoji}\n\n\
         <b>{symbol}</b> - {name}\n\
         {source_emoji} Source: <b>{source}</b>\n\
         📍 <code>{address}</code>\n\n\
         ⏱️ Age: {age}\n\
         💧 Liquidity: {liquidity}\n",
        emoji = tier.emoji(),
        label = tier.label(),
        symbol = escape_html(&event.symbol),
        name = escape_html(&event.name),
        source_emoji = source_emoji(&event.source),
        source = escape_html(&event.source.tag().to_uppercase()),
        address = address,
        age = format_age(age),
        liquidity = event.liquidity,
    );

    if event.market_cap > 0.0 {
        let _ = writeln!(msg, "💰 Market Cap: {}", format_market_cap(event.market_cap));
    }
    let _ = writeln!(msg, "⭐ Priority: {}/{}", score, max_score);

    match event.reputation_or_unknown() {
        Reputation::Elite => msg.push_str("👑 <b>ELITE DEVELOPER</b>\n"),
        Reputation::Good => msg.push_str("✅ <b>Good Dev</b>\n"),
        _ => {}
    }

    let socials: Vec<String> = [
        (&event.socials.twitter, "Twitter"),
        (&event.socials.telegram, "Telegram"),
        (&event.socials.website, "Web"),
    ]
    .into_iter()
    .filter_map(|(link, label)| {
        link.as_ref()
            .map(|url| format!("<a href='{}'>{}</a>", escape_html(url), label))
    })
    .collect();
    if !socials.is_empty() {
        let _ = writeln!(msg, "\n🔗 {}", socials.join(" | "));
    }

    let mut links = vec![format!(
        "<a href='https://www.axiomtrade.app/swap?inputMint={}&amp;outputMint={}'>Axiom</a>",
        WSOL_MINT, address
    )];
    if event.source == Source::PumpFun {
        links.push(format!("<a href='https://pump.fun/{}'>Pump.fun</a>", address));
    }
    links.push(format!(
        "<a href='https://birdeye.so/token/{}?chain=solana'>Birdeye</a>",
        address
    ));
    if let Some(pool) = &event.pool_id {
        links.push(format!(
            "<a href='https://dexscreener.com/solana/{}'>DexScreener</a>",
            escape_html(pool)
        ));
    }
    let _ = write!(msg, "\n📊 <b>TRADE:</b>\n{}", links.join(" | "));

    let _ = write!(msg, "\n\n⚡ Multi-source scan - {}m old", age as u64 / 60);
    msg
}

/// Startup message listing active sources and the key criteria
pub fn format_banner(config: &Config) -> String {
    let c = &config.criteria;
    let mut sources = Vec::new();
    if config.stream.enabled {
        sources.push("• 🎪 Pump.fun (WebSocket)");
    }
    if config.poll.dexscreener.enabled {
        sources.push("• 🌊 Raydium / 🐋 Orca / 🪐 Jupiter (DexScreener)");
    }
    if config.poll.birdeye.enabled {
        sources.push("• 🦅 Birdeye API");
    }
    if config.poll.pumpfun.enabled {
        sources.push("• 🎪 Pump.fun (REST)");
    }

    format!(
        "🚀 <b>MULTI-LAUNCHPAD SCANNER</b> 🚀\n\n\
         📡 Monitoring:\n{sources}\n\n\
         <b>Criteria:</b>\n\
         💰 Liquidity: {min_liq}-{max_liq} SOL\n\
         ⏱️ Age: First {minutes} minutes\n\
         🎪 Themes: {themes}\n\
         ⭐ Min Priority: {min_priority}/{max_priority}\n\n\
         Catching launches across all platforms! 🎯",
        sources = sources.join("\n"),
        min_liq = c.min_liquidity,
        max_liq = c.max_liquidity,
        minutes = c.max_token_age_secs / 60,
        themes = escape_html(
            &c.themes
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        min_priority = c.min_priority_score,
        max_priority = c.max_priority_score,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Liquidity;
    use chrono::Duration;

    fn event(now: DateTime<Utc>) -> TokenEvent {
        let mut event = TokenEvent::new(
            "Mint111",
            "Bonk <Two>",
            "BONK2",
            Source::PumpFun,
            Liquidity::sol(50.0),
            now - Duration::seconds(150),
        )
        .unwrap();
        event.socials.twitter = Some("https://x.com/bonk2".into());
        event.market_cap = 42_500.0;
        event
    }

    #[test]
    fn test_tiers() {
        assert_eq!(AlertTier::from_score(200), AlertTier::Premium);
        assert_eq!(AlertTier::from_score(180), AlertTier::Premium);
        assert_eq!(AlertTier::from_score(170), AlertTier::Hot);
        assert_eq!(AlertTier::from_score(150), AlertTier::Quality);
    }

    #[test]
    fn test_format_alert() {
        let now = Utc::now();
        let msg = format_alert_at(&event(now), 170, 250, now);

        assert!(msg.starts_with("🔥🔥🔥 <b>HOT LAUNCH</b>"));
        assert!(msg.contains("<b>BONK2</b> - Bonk &lt;Two&gt;"));
        assert!(msg.contains("Source: <b>PUMPFUN</b>"));
        assert!(msg.contains("<code>Mint111</code>"));
        assert!(msg.contains("Age: 2m 30s"));
        assert!(msg.contains("Liquidity: 50.0 SOL"));
        assert!(msg.contains("Market Cap: $42.5K"));
        assert!(msg.contains("Priority: 170/250"));
        assert!(msg.contains("<a href='https://x.com/bonk2'>Twitter</a>"));
        assert!(msg.contains("https://pump.fun/Mint111"));
        assert!(!msg.contains("DexScreener</a>"));
        assert!(!msg.contains("Dev</b>"));
    }

    #[test]
    fn test_format_alert_dev_badge_and_pool() {
        let now = Utc::now();
        let mut event = event(now);
        event.reputation = Some(Reputation::Elite);
        event.source = Source::Raydium;
        event.pool_id = Some("Pool111".into());

        let msg = format_alert_at(&event, 190, 250, now);
        assert!(msg.contains("PREMIUM LAUNCH"));
        assert!(msg.contains("ELITE DEVELOPER"));
        assert!(msg.contains("https://dexscreener.com/solana/Pool111"));
        assert!(!msg.contains("pump.fun/"));
    }

    #[test]
    fn test_market_cap_formatting() {
        assert_eq!(format_market_cap(950.0), "$950");
        assert_eq!(format_market_cap(12_345.0), "$12.3K");
        assert_eq!(format_market_cap(2_500_000.0), "$2.50M");
    }

    #[test]
    fn test_banner_lists_enabled_sources() {
        let mut config = Config::default();
        config.poll.birdeye.enabled = false;
        let banner = format_banner(&config);

        assert!(banner.contains("Pump.fun (WebSocket)"));
        assert!(banner.contains("DexScreener"));
        assert!(!banner.contains("Birdeye API"));
        assert!(banner.contains("Min Priority: 150/250"));
        assert!(banner.contains("First 10 minutes"));
    }
}
