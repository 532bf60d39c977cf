//! Multi-launchpad token launch scanner
//!
//! Ingests new-token events from a PumpPortal websocket and several REST
//! pollers, deduplicates them, gates them on creator reputation and
//! eligibility criteria, scores the survivors and sends one alert per token.

pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod notify;
pub mod poll;
pub mod reputation;
pub mod scanner;
pub mod stream;
pub mod token;

// Re-export commonly used types
pub use config::Config;
pub use dedup::DedupStore;
pub use error::{Error, Result};
pub use reputation::ReputationTracker;
pub use scanner::{EventOutcome, Scanner};
pub use token::{Liquidity, Reputation, Source, TokenEvent};
