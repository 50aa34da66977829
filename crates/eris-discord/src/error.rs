use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("webhook {0} has no usable token")]
    MissingToken(String),
}

impl DestinationError {
    /// Whether the same request may succeed if sent again later.
    /// Permanent rejections (4xx other than 429) are not transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimited { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::Decode(_) | Self::MissingToken(_) => false,
        }
    }

    /// Minimum wait the server asked for, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
