//! PumpPortal WebSocket adapter for token detection
//!
//! PumpPortal provides a free WebSocket API for real-time pump.fun data.
//!
//! WebSocket endpoint: wss://pumpportal.fun/api/data
//! Documentation: https://pumpportal.fun/data-api/real-time

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::stream::reconnect::{ReconnectMachine, StreamState, StreamTransition};
use crate::token::{timestamp_from_millis, Liquidity, Socials, Source, TokenEvent};

/// PumpPortal WebSocket URL
pub const PUMPPORTAL_WS_URL: &str = "wss://pumpportal.fun/api/data";

/// Subscription request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionMessage {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

impl SubscriptionMessage {
    /// Subscribe to new token creation events
    pub fn subscribe_new_tokens() -> Self {
        Self {
            method: "subscribeNewToken".to_string(),
            keys: None,
        }
    }
}

/// Inbound frame from PumpPortal
///
/// Every field is optional: subscription acknowledgements and trade frames
/// share the socket with creation events.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PumpPortalMessage {
    pub signature: Option<String>,
    pub mint: Option<String>,
    pub trader_public_key: Option<String>,
    pub tx_type: Option<String>,
    pub initial_buy: Option<f64>,
    pub bonding_curve_key: Option<String>,
    pub v_sol_in_bonding_curve: Option<f64>,
    pub market_cap_sol: Option<f64>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub uri: Option<String>,
    pub timestamp: Option<i64>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
}

impl PumpPortalMessage {
    /// Creation events carry `txType == "create"` or a `mint` field
    pub fn is_creation(&self) -> bool {
        self.tx_type.as_deref() == Some("create") || self.mint.is_some()
    }

    /// Normalize into a [`TokenEvent`]
    pub fn into_token_event(self) -> Result<TokenEvent> {
        let liquidity = [self.initial_buy, self.v_sol_in_bonding_curve]
            .into_iter()
            .flatten()
            .find(|v| *v != 0.0)
            .unwrap_or(0.0);

        let mut event = TokenEvent::new(
            self.mint.unwrap_or_default(),
            self.name.unwrap_or_else(|| "Unknown".to_string()),
            self.symbol.unwrap_or_else(|| "UNKNOWN".to_string()),
            Source::PumpFun,
            Liquidity::sol(liquidity),
            timestamp_from_millis(self.timestamp),
        )?;

        event.creator = self.trader_public_key.unwrap_or_default();
        event.bonding_curve = non_empty(self.bonding_curve_key);
        event.market_cap = self.market_cap_sol.unwrap_or(0.0);
        event.image_uri = non_empty(self.uri);
        event.socials = Socials {
            telegram: non_empty(self.telegram),
            twitter: non_empty(self.twitter),
            website: non_empty(self.website),
        };
        Ok(event)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse one text frame
///
/// Returns `Ok(None)` for frames that are valid JSON but not creation events.
pub fn parse_message(text: &str) -> Result<Option<TokenEvent>> {
    let message: PumpPortalMessage = serde_json::from_str(text)
        .map_err(|e| Error::MalformedEvent(format!("invalid JSON frame: {}", e)))?;

    if !message.is_creation() {
        return Ok(None);
    }
    message.into_token_event().map(Some)
}

/// How a websocket session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Cancelled,
    SinkClosed,
}

/// PumpPortal stream adapter
pub struct PumpPortalStream {
    config: StreamConfig,
}

impl PumpPortalStream {
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Run until cancelled, reconnecting with backoff on every failure
    pub async fn run(self, sink: mpsc::Sender<TokenEvent>, cancel: CancellationToken) {
        info!("Starting PumpPortal stream: {}", self.config.ws_url);

        let mut machine = ReconnectMachine::new(
            Duration::from_secs(self.config.reconnect_base_secs),
            Duration::from_secs(self.config.reconnect_max_secs),
        );
        machine.apply(StreamTransition::Connect);

        loop {
            match self.session(&mut machine, &sink, &cancel).await {
                Ok(SessionEnd::Cancelled) => break,
                Ok(SessionEnd::SinkClosed) => {
                    warn!("Event channel closed, stopping stream");
                    break;
                }
                Err(e) => {
                    let delay = match machine.apply(StreamTransition::Failed) {
                        StreamState::Backoff(delay) => delay,
                        _ => Duration::from_secs(self.config.reconnect_base_secs),
                    };
                    warn!(
                        error = %e,
                        failures = machine.consecutive_failures(),
                        "PumpPortal stream failed, reconnecting in {:?}",
                        delay
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                    machine.apply(StreamTransition::BackoffElapsed);
                }
            }
        }

        info!("PumpPortal stream stopped");
    }

    /// One connection: connect, subscribe, then read until failure or cancel
    async fn session(
        &self,
        machine: &mut ReconnectMachine,
        sink: &mpsc::Sender<TokenEvent>,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd> {
        debug!("Connecting to PumpPortal WebSocket...");

        let url = url::Url::parse(&self.config.ws_url)
            .map_err(|e| Error::Config(format!("Invalid WebSocket URL: {}", e)))?;

        let connect = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            result = connect_async(url.as_str()) => result,
        };
        let (ws_stream, _) = connect
            .map_err(|e| Error::StreamConnection(format!("WebSocket connect failed: {}", e)))?;

        let (mut write, mut read) = ws_stream.split();

        let json = serde_json::to_string(&SubscriptionMessage::subscribe_new_tokens())?;
        write
            .send(Message::Text(json))
            .await
            .map_err(|e| Error::StreamConnection(format!("Failed to subscribe: {}", e)))?;

        machine.apply(StreamTransition::Subscribed);
        info!("Subscribed to new token events");

        let ping_interval = Duration::from_secs(self.config.ping_interval_secs.max(1));
        let mut ping_timer = tokio::time::interval(ping_interval);
        // interval fires immediately; skip that tick
        ping_timer.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!("Close frame not sent: {}", e);
                    }
                    return Ok(SessionEnd::Cancelled);
                }

                _ = ping_timer.tick() => {
                    write.send(Message::Ping(vec![])).await?;
                    debug!("Sent ping");
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            machine.apply(StreamTransition::MessageReceived);
                            match parse_message(&text) {
                                Ok(Some(event)) => {
                                    debug!(
                                        "New token: {} ({}) - {}",
                                        event.name, event.symbol, event.address()
                                    );
                                    if sink.send(event).await.is_err() {
                                        return Ok(SessionEnd::SinkClosed);
                                    }
                                }
                                Ok(None) => {
                                    debug!("Ignoring frame: {}", preview(&text));
                                }
                                Err(e) => {
                                    warn!("Skipping malformed frame: {}", e);
                                }
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            write.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("Received pong");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            return Err(Error::StreamDisconnected(format!(
                                "closed by server: {:?}",
                                frame
                            )));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            return Err(e.into());
                        }
                        None => {
                            return Err(Error::StreamDisconnected("stream ended".to_string()));
                        }
                    }
                }
            }
        }
    }
}

fn preview(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(100)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}
