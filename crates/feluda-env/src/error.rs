//! Environmental data error types.

use thiserror::Error;

/// Errors that can occur while acquiring an environmental snapshot.
///
/// Every variant means "data unavailable" to the estimation pipeline, which
/// degrades to defaults instead of failing.
#[derive(Debug, Error)]
pub enum EnvError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The provider returned a 429 Too Many Requests response.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Failed to parse a provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// A single attempt exceeded its deadline.
    #[error("timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u128 },

    /// The provider answered but had no samples for the window.
    #[error("provider returned no samples")]
    Empty,

    /// No provider is configured.
    #[error("environmental provider disabled")]
    Disabled,

    /// All attempts failed.
    #[error("data unavailable after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl EnvError {
    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } | Self::Timeout { .. } | Self::Empty => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Parse(_) | Self::Disabled | Self::Exhausted { .. } => false,
        }
    }
}
