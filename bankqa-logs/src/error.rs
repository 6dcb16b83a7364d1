use thiserror::Error;

use crate::source::LogSource;

/// A failed fetch, scoped to the feed it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP {status}: Failed to fetch {feed}")]
    Status { feed: LogSource, status: u16 },
    #[error("timed out after {timeout_ms} ms fetching {feed}")]
    Timeout { feed: LogSource, timeout_ms: u64 },
    #[error("request for {feed} failed: {message}")]
    Transport { feed: LogSource, message: String },
    #[error("could not decode {feed} response: {message}")]
    Decode { feed: LogSource, message: String },
}

impl FetchError {
    #[must_use]
    pub const fn feed(&self) -> LogSource {
        match self {
            Self::Status { feed, .. }
            | Self::Timeout { feed, .. }
            | Self::Transport { feed, .. }
            | Self::Decode { feed, .. } => *feed,
        }
    }

    /// Whether retrying unchanged can succeed (not for 4xx or decode failures).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Decode { .. } => false,
        }
    }
}
