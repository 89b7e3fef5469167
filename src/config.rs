use crate::{error::Result, types::SpeedTable};
use std::{fmt, time::Duration};

/// Production BSK Connect endpoint
pub const DEFAULT_BASE_URL: &str = "https://connect.bskhvac.com.tr";

/// Client configuration
///
/// ```
/// use bskzephyr::{ClientConfig, SpeedTable};
///
/// let config = ClientConfig {
///     speeds: SpeedTable::new(35, 45, 65, 100)?,
///     refresh_on_unauthorized: true,
///     ..Default::default()
/// };
/// assert_eq!(config.base_url, "https://connect.bskhvac.com.tr");
/// # Ok::<(), bskzephyr::ZephyrError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the cloud API, without a trailing path
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after a connect or timeout failure
    pub max_retry_attempts: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
    /// Fan speed preset values of the installed firmware
    pub speeds: SpeedTable,
    /// Sign in again once and repeat the call when the token is rejected
    pub refresh_on_unauthorized: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
            max_retry_attempts: 2,
            retry_delay_ms: 500,
            speeds: SpeedTable::default(),
            refresh_on_unauthorized: false,
        }
    }
}

impl ClientConfig {
    /// Build an HTTP client honoring this configuration's timeout
    ///
    /// # Errors
    ///
    /// Returns [`crate::ZephyrError::Request`] if the TLS backend cannot be
    /// initialized.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .user_agent(concat!("bskzephyr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}

/// Account credentials for BSK Connect
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account e-mail address
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.max_retry_attempts, 2);
        assert_eq!(config.retry_delay_ms, 500);
        assert_eq!(config.speeds, SpeedTable::default());
        assert!(!config.refresh_on_unauthorized);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("user@example.com", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_http_client_builds() {
        assert!(ClientConfig::default().http_client().is_ok());
    }
}
