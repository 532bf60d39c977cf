//! Notification sinks
//!
//! Alerts go to Telegram in production and to the log in dry-run mode.

pub mod alert;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::config::{NotifierConfig, TelegramCredentials};
use crate::error::{Error, Result};

pub use alert::{format_alert, format_banner};

/// Delivers rendered alert text
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, disable_preview: bool) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API `sendMessage` client
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_url: String,
    credentials: TelegramCredentials,
}

impl TelegramNotifier {
    pub fn new(config: &NotifierConfig, credentials: TelegramCredentials) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.credentials.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str, disable_preview: bool) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: &self.credentials.chat_id,
            text: message,
            parse_mode: "HTML",
            disable_web_page_preview: disable_preview,
        };

        // reqwest errors embed the URL, which carries the bot token
        let resp = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Notifier(format!("HTTP request failed: {}", e.without_url())))?;

        let status = resp.status();
        let body: TelegramResponse = resp.json().await.map_err(|e| {
            Error::Notifier(format!("HTTP {}: unreadable response: {}", status, e.without_url()))
        })?;

        if !body.ok {
            return Err(Error::Notifier(format!(
                "HTTP {}: {}",
                status,
                body.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        Ok(())
    }
}

/// Writes alerts to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str, _disable_preview: bool) -> Result<()> {
        info!("[dry-run] alert:\n{}", message);
        Ok(())
    }
}
