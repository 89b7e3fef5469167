#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

//! # bskzephyr
//!
//! A Rust library for controlling BSK Zephyr heat-recovery ventilation units
//! through the BSK Connect cloud API.
//!
//! The Zephyr is a decentralized ventilator with a ceramic heat exchanger.
//! The vendor app talks to it through BSK Connect, a small REST service:
//!
//! - **Sign in**: e-mail and password exchanged for an access token
//! - **Device listing**: every unit bound to the account with its live state
//!   (mode, fan speed, temperature, humidity, filter timer)
//! - **Control**: partial updates addressed to a device group (power, fan
//!   mode, fan speed preset, humidity boost)
//!
//! Fan speed travels as a raw percentage. [`SpeedTable`] maps the named
//! presets to the values of the installed firmware; the default table matches
//! older firmware.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bskzephyr::{Credentials, FanMode, FanSpeed, ZephyrClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ZephyrClient::new(
//!         reqwest::Client::new(),
//!         Credentials::new("me@example.com", "secret"),
//!     );
//!     client.login().await?;
//!
//!     let devices = client.list_devices().await?;
//!     if let Some(binding) = devices.first() {
//!         let group = &binding.device.group_id;
//!         client.set_power(group, true).await?;
//!         client.set_fan_mode(group, FanMode::Cycle).await?;
//!         client.set_fan_speed(group, FanSpeed::Medium).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

/// Cloud API client
pub mod client;
/// Client configuration and credentials
pub mod config;
/// Error types and handling
pub mod error;
/// Wire format of the BSK Connect API
pub mod protocol;
/// Device models and control types
pub mod types;

pub use client::ZephyrClient;
pub use config::{ClientConfig, Credentials, DEFAULT_BASE_URL};
pub use error::{Result, ZephyrError};
pub use types::{ControlRequest, DeviceState, DeviceUser, FanMode, FanSpeed, SpeedTable, Zephyr};

pub use reqwest;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
