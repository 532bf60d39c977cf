//! Stream module - push-based token ingestion
//!
//! A single long-lived PumpPortal WebSocket subscription, kept alive by an
//! explicit reconnect state machine.

pub mod pumpportal;
pub mod reconnect;

pub use pumpportal::{parse_message, PumpPortalStream, PUMPPORTAL_WS_URL};
pub use reconnect::{ExponentialBackoff, ReconnectMachine, StreamState, StreamTransition};
