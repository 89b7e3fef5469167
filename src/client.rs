use crate::{
    config::{ClientConfig, Credentials},
    error::{Result, ZephyrError},
    protocol::{
        auth_failure_message, control_url, decode_device, decode_device_users, endpoint,
        ControlBody, SignInRequest, SignInResponse, DEVICE_USER_PATH, SIGN_IN_PATH,
    },
    types::{ControlRequest, DeviceUser, FanMode, FanSpeed, Zephyr},
};
use futures::future::try_join_all;
use reqwest::{header::AUTHORIZATION, RequestBuilder, Response, StatusCode};
use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Client for the BSK Connect cloud API
///
/// `ZephyrClient` signs in to BSK Connect, keeps the session token and exposes
/// the device listing and control calls of the cloud. Clones share the HTTP
/// connection pool and the token, so one client can be handed to several tasks.
///
/// # Examples
///
/// ```no_run
/// use bskzephyr::{ControlRequest, Credentials, FanSpeed, ZephyrClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ZephyrClient::new(
///         reqwest::Client::new(),
///         Credentials::new("me@example.com", "secret"),
///     );
///     client.login().await?;
///
///     for binding in client.list_devices().await? {
///         println!("{}: {}", binding.title, binding.device.device_status);
///         client
///             .control_device(
///                 &binding.device.group_id,
///                 ControlRequest::new().fan_speed(FanSpeed::Low),
///             )
///             .await?;
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ZephyrClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    credentials: Option<Arc<Credentials>>,
    token: Arc<RwLock<Option<String>>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl ZephyrClient {
    /// Create a client that signs in with the given credentials
    #[must_use]
    pub fn new(http: reqwest::Client, credentials: Credentials) -> Self {
        Self::with_config(http, Some(credentials), None, ClientConfig::default())
    }

    /// Create a client from a previously obtained token
    #[must_use]
    pub fn with_token(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self::with_config(http, None, Some(token.into()), ClientConfig::default())
    }

    /// Create a client with full control over credentials, token and configuration
    #[must_use]
    pub fn with_config(
        http: reqwest::Client,
        credentials: Option<Credentials>,
        token: Option<String>,
        config: ClientConfig,
    ) -> Self {
        Self {
            http,
            config: Arc::new(config),
            credentials: credentials.map(Arc::new),
            token: Arc::new(RwLock::new(token)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the client configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current session token, if any
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Replace the session token
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    /// Check whether a session token is held
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Sign in and store the returned session token
    ///
    /// # Errors
    ///
    /// Returns [`ZephyrError::MissingCredentials`] if the client has no
    /// credentials, [`ZephyrError::InvalidAuth`] if the cloud rejects them,
    /// [`ZephyrError::Http`] for any other unexpected status, or a transport
    /// error.
    pub async fn login(&self) -> Result<String> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ZephyrError::MissingCredentials)?;
        info!("Signing in to BSK Connect as {}", credentials.username);

        let url = endpoint(&self.config.base_url, SIGN_IN_PATH)?;
        let body = SignInRequest {
            email: &credentials.username,
            password: &credentials.password,
        };
        let response = self
            .send_with_retry(|| self.http.post(url.clone()).json(&body))
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let bytes = response.bytes().await?;
                let SignInResponse { access_token } = serde_json::from_slice(&bytes)?;
                *self.token.write().await = Some(access_token.clone());
                info!("Signed in to BSK Connect");
                Ok(access_token)
            }
            StatusCode::FORBIDDEN | StatusCode::INTERNAL_SERVER_ERROR => {
                let bytes = response.bytes().await?;
                match auth_failure_message(&bytes) {
                    Ok(message) => {
                        warn!("Sign-in rejected: {}", message);
                        Err(ZephyrError::InvalidAuth(message))
                    }
                    Err(_) => Err(ZephyrError::Http {
                        status: status.as_u16(),
                    }),
                }
            }
            _ => Err(ZephyrError::Http {
                status: status.as_u16(),
            }),
        }
    }

    /// List the devices bound to the account
    ///
    /// Every device's fan speed is resolved through the configured speed table.
    ///
    /// # Errors
    ///
    /// Returns [`ZephyrError::NotAuthenticated`] without a token,
    /// [`ZephyrError::InvalidAuth`] if the token is rejected,
    /// [`ZephyrError::Http`] for other unexpected statuses, or a decoding or
    /// transport error.
    pub async fn list_devices(&self) -> Result<Vec<DeviceUser>> {
        let url = endpoint(&self.config.base_url, DEVICE_USER_PATH)?;
        let response = self
            .send_authorized(|token| self.http.get(url.clone()).header(AUTHORIZATION, token))
            .await?;
        let bytes = check_status(response)?.bytes().await?;

        let devices = decode_device_users(&bytes, &self.config.speeds)?;
        debug!("Listed {} device(s)", devices.len());
        Ok(devices)
    }

    /// Find the device bound to a group id
    ///
    /// # Errors
    ///
    /// Same as [`Self::list_devices`].
    pub async fn device(&self, group_id: &str) -> Result<Option<DeviceUser>> {
        let devices = self.list_devices().await?;
        Ok(devices
            .into_iter()
            .find(|binding| binding.device.group_id == group_id))
    }

    /// Send a control request to a device group
    ///
    /// An empty request is not sent and yields `Ok(None)`. Otherwise the
    /// updated device state returned by the cloud is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ZephyrError::NotAuthenticated`] without a token,
    /// [`ZephyrError::InvalidAuth`] if the token is rejected,
    /// [`ZephyrError::Http`] for other unexpected statuses, or a decoding or
    /// transport error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use bskzephyr::{ControlRequest, FanMode, ZephyrClient};
    /// # async fn run(client: ZephyrClient) -> bskzephyr::Result<()> {
    /// let request = ControlRequest::new().power(true).fan_mode(FanMode::Cycle);
    /// if let Some(device) = client.control_device("group-id", request).await? {
    ///     println!("now {} in {} mode", device.device_status, device.fan_mode);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn control_device(
        &self,
        group_id: &str,
        request: ControlRequest,
    ) -> Result<Option<Zephyr>> {
        if request.is_empty() {
            debug!("Empty control request for group {}, nothing sent", group_id);
            return Ok(None);
        }

        info!("Sending control request to group {}: {:?}", group_id, request);
        let url = control_url(&self.config.base_url, group_id)?;
        let body = ControlBody::new(&request, &self.config.speeds);
        let response = self
            .send_authorized(|token| {
                self.http
                    .put(url.clone())
                    .header(AUTHORIZATION, token)
                    .json(&body)
            })
            .await?;
        let bytes = check_status(response)?.bytes().await?;

        let device = decode_device(&bytes, &self.config.speeds)?;
        Ok(Some(device))
    }

    /// Apply the same control request to several groups concurrently
    ///
    /// Results are returned in the order of `group_ids`.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered by any of the requests.
    pub async fn control_many<I, S>(
        &self,
        group_ids: I,
        request: ControlRequest,
    ) -> Result<Vec<Option<Zephyr>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        try_join_all(
            group_ids
                .into_iter()
                .map(|group_id| async move { self.control_device(group_id.as_ref(), request).await }),
        )
        .await
    }

    /// Switch a device group on or off
    ///
    /// # Errors
    ///
    /// Same as [`Self::control_device`].
    pub async fn set_power(&self, group_id: &str, on: bool) -> Result<Option<Zephyr>> {
        self.control_device(group_id, ControlRequest::new().power(on))
            .await
    }

    /// Change the airflow mode of a device group
    ///
    /// # Errors
    ///
    /// Same as [`Self::control_device`].
    pub async fn set_fan_mode(&self, group_id: &str, mode: FanMode) -> Result<Option<Zephyr>> {
        self.control_device(group_id, ControlRequest::new().fan_mode(mode))
            .await
    }

    /// Change the fan speed preset of a device group
    ///
    /// # Errors
    ///
    /// Same as [`Self::control_device`].
    pub async fn set_fan_speed(&self, group_id: &str, speed: FanSpeed) -> Result<Option<Zephyr>> {
        self.control_device(group_id, ControlRequest::new().fan_speed(speed))
            .await
    }

    /// Change the humidity boost threshold of a device group
    ///
    /// # Errors
    ///
    /// Same as [`Self::control_device`].
    pub async fn set_humidity_boost(&self, group_id: &str, value: i64) -> Result<Option<Zephyr>> {
        self.control_device(group_id, ControlRequest::new().humidity_boost(value))
            .await
    }

    /// Token to authorize a call with, signing in first when allowed
    async fn session_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        if self.can_refresh() {
            debug!("No session token yet, signing in");
            return self.refresh_session(None).await;
        }

        Err(ZephyrError::NotAuthenticated)
    }

    fn can_refresh(&self) -> bool {
        self.config.refresh_on_unauthorized && self.credentials.is_some()
    }

    /// Sign in again unless another task already replaced `rejected`
    ///
    /// Only one refresh runs at a time across clones; callers queued behind it
    /// pick up the token it stored instead of signing in themselves.
    async fn refresh_session(&self, rejected: Option<&str>) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.token.read().await.clone() {
            if rejected != Some(current.as_str()) {
                debug!("Session already refreshed by another task");
                return Ok(current);
            }
        }

        self.login().await
    }

    /// Send an authorized request, signing in again once on `401` when configured
    async fn send_authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.session_token().await?;
        let response = self.send_with_retry(|| build(&token)).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.can_refresh() {
            warn!("Session token rejected, signing in again");
            let token = self.refresh_session(Some(&token)).await?;
            return self.send_with_retry(|| build(&token)).await;
        }

        Ok(response)
    }

    /// Send a request, retrying connect and timeout failures
    async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_retries = self.config.max_retry_attempts;
        let mut attempt = 0;

        loop {
            match build().send().await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < max_retries && (e.is_connect() || e.is_timeout()) => {
                    attempt += 1;
                    warn!(
                        "Request failed on attempt {}/{}, retrying in {}ms: {}",
                        attempt,
                        max_retries + 1,
                        self.config.retry_delay_ms,
                        e
                    );
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Err(e) => {
                    if attempt > 0 {
                        error!("Request failed after {} attempts", attempt + 1);
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

impl fmt::Debug for ZephyrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZephyrClient")
            .field("base_url", &self.config.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Map an authorized call's status onto the error type
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ZephyrError::InvalidAuth(format!(
            "session token rejected ({status})"
        )));
    }
    if !status.is_success() {
        return Err(ZephyrError::Http {
            status: status.as_u16(),
        });
    }
    Ok(response)
}
