//! Error types for the launch scanner

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the launch scanner
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),

    // Stream errors
    #[error("Stream connection failed: {0}")]
    StreamConnection(String),

    #[error("Stream disconnected: {0}")]
    StreamDisconnected(String),

    // Poll source errors
    #[error("{source_name} request failed: {message}")]
    PollTransport { source_name: String, message: String },

    #[error("{source_name} returned HTTP {status}")]
    PollStatus { source_name: String, status: u16 },

    // Token normalization errors
    #[error("Malformed token event: {0}")]
    MalformedEvent(String),

    // Notifier errors
    #[error("Notifier send failed: {0}")]
    Notifier(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::StreamConnection(_)
                | Error::StreamDisconnected(_)
                | Error::PollTransport { .. }
                | Error::PollStatus { .. }
                | Error::Notifier(_)
        )
    }

    /// Startup errors that no retry can fix
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::MissingEnvVar(_) | Error::InvalidRegex(_)
        )
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from websocket errors
impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::StreamDisconnected(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::StreamConnection("refused".into()).is_retryable());
        assert!(Error::PollStatus {
            source_name: "birdeye".into(),
            status: 429
        }
        .is_retryable());
        assert!(!Error::Config("bad".into()).is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()).is_fatal());
        assert!(!Error::Notifier("timeout".into()).is_fatal());
    }

    #[test]
    fn test_poll_status_display() {
        let err = Error::PollStatus {
            source_name: "dexscreener".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "dexscreener returned HTTP 503");
    }
}
