//! Error types for REST transport operations.
//!
//! Only failures that happen *below* HTTP are errors here: an API response
//! with a 4xx/5xx status is a normal [`Response`](crate::Response) and is
//! classified by the caller's outcome tables, not by this crate.

use std::fmt;

/// Result type alias for restkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, DNS, TLS or timeout failures.
    Network,
    /// Response could not be decoded.
    Format,
    /// Invalid client configuration (URL, credentials).
    Config,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Format => "Invalid response format",
            Self::Config => "Invalid client configuration",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that the server URL is reachable and the certificate is valid",
            Self::Format => "Check that the server URL points at the REST API",
            Self::Config => "Check server_url, site and credentials in your configuration",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced an HTTP response.
    #[error("transport error: {message}")]
    Transport {
        /// Error message from the HTTP client.
        message: String,
    },

    /// The request timed out before a response arrived.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The configured server URL is unusable.
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    /// Credentials are missing or malformed.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Response body was not the expected JSON.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// A version string could not be parsed.
    #[error("invalid version string: {0:?}")]
    InvalidVersion(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport { .. } | Error::Timeout(_) => ErrorCategory::Network,
            Error::InvalidResponse(_) | Error::InvalidVersion(_) => ErrorCategory::Format,
            Error::InvalidUrl(_) | Error::InvalidCredentials(_) => ErrorCategory::Config,
            Error::Other(_) => ErrorCategory::Other,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            err @ ureq::Error::Timeout(_) => Self::Timeout(err.to_string()),
            ureq::Error::BadUri(uri) => Self::InvalidUrl(uri),
            other => Self::transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
