use thiserror::Error;

/// Errors that can occur when talking to the BSK Connect cloud
#[derive(Error, Debug)]
pub enum ZephyrError {
    /// The cloud rejected the credentials or the session token
    #[error("Invalid authentication: {0}")]
    InvalidAuth(String),

    /// The cloud answered with an unexpected HTTP status
    #[error("Unexpected HTTP status {status}")]
    Http {
        /// HTTP status code returned by the cloud
        status: u16,
    },

    /// Transport level failure (DNS, TLS, connect, timeout, body read)
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Json(#[from] serde_json::Error),

    /// `login` was called without a username and password
    #[error("No credentials configured - cannot sign in")]
    MissingCredentials,

    /// An authenticated call was made before a token was obtained
    #[error("Not authenticated - call login() or provide a token first")]
    NotAuthenticated,

    /// Invalid parameters supplied by the caller
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The configured base URL cannot be used to build an endpoint
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type for BSK Connect operations
pub type Result<T> = std::result::Result<T, ZephyrError>;

impl ZephyrError {
    /// Check if this error means the session must be re-established
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAuth(_) | Self::MissingCredentials | Self::NotAuthenticated
        )
    }

    /// Check if retrying the same call later may succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::Http { status } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status code associated with this error, when there is one
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
