use std::fmt;
use std::time::Duration;

/// Why a panel refresh did not produce a payload.
///
/// Every variant is recoverable: the panel keeps its last good data and shows
/// the `Display` text in a banner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {message}")]
    Transport { message: String },

    #[error("Request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Invalid JSON from backend: {message}")]
    Parse { message: String },

    #[error("Unexpected response: {message}")]
    Contract { message: String },

    /// The backend answered `ok:false`; the message is its own `error` text.
    #[error("{message}")]
    Backend { message: String },

    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn transport(msg: impl fmt::Display) -> Self {
        Self::Transport {
            message: msg.to_string(),
        }
    }

    pub fn parse(msg: impl fmt::Display) -> Self {
        Self::Parse {
            message: msg.to_string(),
        }
    }

    pub fn contract(msg: impl fmt::Display) -> Self {
        Self::Contract {
            message: msg.to_string(),
        }
    }

    pub fn backend(msg: impl fmt::Display) -> Self {
        Self::Backend {
            message: msg.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short label used in logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "status",
            Self::Parse { .. } => "parse",
            Self::Contract { .. } => "contract",
            Self::Backend { .. } => "backend",
            Self::Cancelled => "cancelled",
        }
    }
}
