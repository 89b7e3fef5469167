use crate::error::{Result, ZephyrError};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Airflow mode of a Zephyr unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    /// Alternates between extract and supply, recovering heat in the ceramic core
    Cycle,
    /// Extracts stale air only
    Extract,
    /// Supplies fresh air only
    Supply,
}

impl FanMode {
    /// Wire value used by BSK Connect
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cycle => "cycle",
            Self::Extract => "extract",
            Self::Supply => "supply",
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FanMode {
    type Err = ZephyrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cycle" => Ok(Self::Cycle),
            "extract" => Ok(Self::Extract),
            "supply" => Ok(Self::Supply),
            _ => Err(ZephyrError::InvalidParameters(format!(
                "unknown fan mode '{s}' (expected cycle, extract or supply)"
            ))),
        }
    }
}

/// Named fan speed preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanSpeed {
    /// Quietest setting
    Night,
    /// Low airflow
    Low,
    /// Medium airflow
    Medium,
    /// High airflow
    High,
}

impl FanSpeed {
    /// All presets, slowest first
    pub const ALL: [Self; 4] = [Self::Night, Self::Low, Self::Medium, Self::High];

    /// Preset name used in logs and user input
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Night => "night",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FanSpeed {
    type Err = ZephyrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "night" => Ok(Self::Night),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ZephyrError::InvalidParameters(format!(
                "unknown fan speed '{s}' (expected night, low, medium or high)"
            ))),
        }
    }
}

/// Power state reported in `deviceStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// Unit is running
    On,
    /// Unit is switched off
    Off,
    /// Value not known to this library
    #[serde(other)]
    Unknown,
}

impl From<bool> for DeviceState {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Raw fan speed percentages for each preset
///
/// The cloud reports and accepts fan speed as a raw percentage. Firmware
/// revisions differ in the values they use, so the table is configurable.
/// Values must lie in `0..=100` and be distinct so the reverse lookup stays
/// unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedTable {
    night: u8,
    low: u8,
    medium: u8,
    high: u8,
}

impl SpeedTable {
    /// Build a custom speed table
    ///
    /// # Errors
    ///
    /// Returns [`ZephyrError::InvalidParameters`] if a value is above 100 or if
    /// two presets share the same value.
    pub fn new(night: u8, low: u8, medium: u8, high: u8) -> Result<Self> {
        let table = Self {
            night,
            low,
            medium,
            high,
        };

        for (i, speed) in FanSpeed::ALL.iter().enumerate() {
            let value = table.raw(*speed);
            if value > 100 {
                return Err(ZephyrError::InvalidParameters(format!(
                    "speed {speed} value {value} is out of range (0 - 100)"
                )));
            }
            if let Some(other) = FanSpeed::ALL[i + 1..]
                .iter()
                .find(|other| table.raw(**other) == value)
            {
                return Err(ZephyrError::InvalidParameters(format!(
                    "speeds {speed} and {other} share the value {value}"
                )));
            }
        }

        Ok(table)
    }

    /// Raw percentage sent to the cloud for a preset
    #[must_use]
    pub const fn raw(&self, speed: FanSpeed) -> u8 {
        match speed {
            FanSpeed::Night => self.night,
            FanSpeed::Low => self.low,
            FanSpeed::Medium => self.medium,
            FanSpeed::High => self.high,
        }
    }

    /// Preset matching a raw value reported by the cloud
    #[must_use]
    pub fn speed_for(&self, raw: i64) -> Option<FanSpeed> {
        FanSpeed::ALL
            .into_iter()
            .find(|speed| i64::from(self.raw(*speed)) == raw)
    }
}

impl Default for SpeedTable {
    /// Values used by older firmware
    fn default() -> Self {
        Self {
            night: 22,
            low: 30,
            medium: 55,
            high: 80,
        }
    }
}

/// State of a Zephyr ventilation unit as reported by BSK Connect
///
/// (De)serializes in the cloud's wire format. `fan_speed` is not part of the
/// wire document; it is resolved from `fan_speed_raw` with a [`SpeedTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zephyr {
    /// Cloud document id
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Boost duration
    pub boost_time: i64,
    /// Buzzer enable flag
    pub buzzer_enable: i64,
    /// Current cycle direction
    pub cycle_direction: String,
    /// Cycle duration
    pub cycle_time: i64,
    /// Hardware device id
    #[serde(rename = "deviceID")]
    pub device_id: String,
    /// Device model name
    pub device_model: String,
    /// Power state
    pub device_status: DeviceState,
    /// Preset resolved from the raw fan speed, if it matches one
    #[serde(skip)]
    pub fan_speed: Option<FanSpeed>,
    /// Raw fan speed percentage
    #[serde(rename = "fanSpeed", default)]
    pub fan_speed_raw: Option<i64>,
    /// Airflow mode
    pub fan_mode: FanMode,
    /// Filter timer
    pub filter_timer: i64,
    /// Group id used to address control commands
    #[serde(rename = "groupID")]
    pub group_id: String,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Humidity boost threshold
    pub humidity_boost: i64,
    /// Whether the humidity boost is currently active
    pub humidity_boost_state: bool,
    /// Hygiene status
    pub hygiene_status: i64,
    /// Temperature (Celsius)
    pub temperature: f64,
    /// Device type
    #[serde(rename = "type")]
    pub device_type: String,
    /// Last update timestamp as reported by the cloud
    pub updated_at: String,
    /// Firmware version
    pub version: String,
}

impl Zephyr {
    /// Fill `fan_speed` from `fan_speed_raw` using the given table
    pub fn resolve_fan_speed(&mut self, speeds: &SpeedTable) {
        self.fan_speed = self.fan_speed_raw.and_then(|raw| speeds.speed_for(raw));
    }

    /// Whether the unit reports itself as running
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.device_status == DeviceState::On
    }
}

/// A Zephyr unit bound to the signed-in account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUser {
    /// Cloud document id
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Kind of binding between user and device
    #[serde(rename = "DeviceUserType")]
    pub device_user_type: String,
    /// Creation timestamp
    pub created_at: String,
    /// Device state
    pub device: Zephyr,
    /// Device model name
    pub device_model: String,
    /// Title of the group the device belongs to
    pub group_title: String,
    /// User-given device title
    pub title: String,
    /// Last update timestamp
    pub updated_at: String,
    /// Owning user id
    pub user: String,
}

/// Partial update sent to a device group
///
/// Only the fields that were set are sent.
///
/// ```
/// use bskzephyr::{ControlRequest, FanMode, FanSpeed};
///
/// let request = ControlRequest::new()
///     .power(true)
///     .fan_mode(FanMode::Cycle)
///     .fan_speed(FanSpeed::Low);
/// assert!(!request.is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlRequest {
    device_status: Option<DeviceState>,
    fan_mode: Option<FanMode>,
    fan_speed: Option<FanSpeed>,
    humidity_boost: Option<i64>,
}

impl ControlRequest {
    /// Empty request
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the unit on or off
    #[must_use]
    pub fn power(self, on: bool) -> Self {
        self.device_status(DeviceState::from(on))
    }

    /// Set the raw power state
    #[must_use]
    pub const fn device_status(mut self, state: DeviceState) -> Self {
        self.device_status = Some(state);
        self
    }

    /// Set the airflow mode
    #[must_use]
    pub const fn fan_mode(mut self, mode: FanMode) -> Self {
        self.fan_mode = Some(mode);
        self
    }

    /// Set the fan speed preset
    #[must_use]
    pub const fn fan_speed(mut self, speed: FanSpeed) -> Self {
        self.fan_speed = Some(speed);
        self
    }

    /// Set the humidity boost threshold; `0` is a valid value
    #[must_use]
    pub const fn humidity_boost(mut self, value: i64) -> Self {
        self.humidity_boost = Some(value);
        self
    }

    /// Requested power state
    #[must_use]
    pub const fn requested_status(&self) -> Option<DeviceState> {
        self.device_status
    }

    /// Requested airflow mode
    #[must_use]
    pub const fn requested_fan_mode(&self) -> Option<FanMode> {
        self.fan_mode
    }

    /// Requested fan speed preset
    #[must_use]
    pub const fn requested_fan_speed(&self) -> Option<FanSpeed> {
        self.fan_speed
    }

    /// Requested humidity boost threshold
    #[must_use]
    pub const fn requested_humidity_boost(&self) -> Option<i64> {
        self.humidity_boost
    }

    /// True when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.device_status.is_none()
            && self.fan_mode.is_none()
            && self.fan_speed.is_none()
            && self.humidity_boost.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_speed_table() {
        let table = SpeedTable::default();
        assert_eq!(table.raw(FanSpeed::Night), 22);
        assert_eq!(table.raw(FanSpeed::Low), 30);
        assert_eq!(table.raw(FanSpeed::Medium), 55);
        assert_eq!(table.raw(FanSpeed::High), 80);
    }

    #[test]
    fn test_speed_reverse_lookup() {
        let table = SpeedTable::default();
        assert_eq!(table.speed_for(22), Some(FanSpeed::Night));
        assert_eq!(table.speed_for(80), Some(FanSpeed::High));
        assert_eq!(table.speed_for(35), None);
        assert_eq!(table.speed_for(-1), None);

        let custom = SpeedTable::new(35, 45, 65, 100).unwrap();
        assert_eq!(custom.speed_for(35), Some(FanSpeed::Night));
        assert_eq!(custom.speed_for(22), None);
    }

    #[test]
    fn test_speed_table_validation() {
        let duplicate = SpeedTable::new(20, 30, 30, 80);
        assert!(matches!(duplicate, Err(ZephyrError::InvalidParameters(_))));

        let out_of_range = SpeedTable::new(20, 30, 55, 101);
        assert!(matches!(
            out_of_range,
            Err(ZephyrError::InvalidParameters(_))
        ));

        assert!(SpeedTable::new(0, 1, 2, 100).is_ok());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Cycle".parse::<FanMode>().unwrap(), FanMode::Cycle);
        assert_eq!("SUPPLY".parse::<FanMode>().unwrap(), FanMode::Supply);
        assert!("exhaust".parse::<FanMode>().is_err());

        assert_eq!("night".parse::<FanSpeed>().unwrap(), FanSpeed::Night);
        assert!("turbo".parse::<FanSpeed>().is_err());
    }

    #[test]
    fn test_enum_parse_error_keeps_input() {
        let error = "Exhaust".parse::<FanMode>().unwrap_err();
        assert!(error.to_string().contains("'Exhaust'"));

        let error = "TURBO".parse::<FanSpeed>().unwrap_err();
        assert!(error.to_string().contains("'TURBO'"));
    }

    #[test]
    fn test_enum_wire_values() {
        assert_eq!(serde_json::to_string(&FanMode::Extract).unwrap(), "\"extract\"");
        assert_eq!(serde_json::to_string(&FanSpeed::Medium).unwrap(), "\"medium\"");
        assert_eq!(serde_json::to_string(&DeviceState::Off).unwrap(), "\"off\"");

        let state: DeviceState = serde_json::from_str("\"standby\"").unwrap();
        assert_eq!(state, DeviceState::Unknown);
    }

    #[test]
    fn test_control_request_builder() {
        assert!(ControlRequest::new().is_empty());

        let request = ControlRequest::new().power(false).humidity_boost(0);
        assert!(!request.is_empty());
        assert_eq!(request.requested_status(), Some(DeviceState::Off));
        assert_eq!(request.requested_humidity_boost(), Some(0));
        assert_eq!(request.requested_fan_mode(), None);
        assert_eq!(request.requested_fan_speed(), None);
    }

    #[test]
    fn test_zephyr_resolves_fan_speed() {
        let json = serde_json::json!({
            "_id": "65f0",
            "boostTime": 30,
            "buzzerEnable": 1,
            "cycleDirection": "in",
            "cycleTime": 70,
            "deviceID": "ZP-001",
            "deviceModel": "Zephyr",
            "deviceStatus": "on",
            "fanSpeed": 55,
            "fanMode": "cycle",
            "filterTimer": 1200,
            "groupID": "g-1",
            "humidity": 48.5,
            "humidityBoost": 70,
            "humidityBoostState": false,
            "hygieneStatus": 0,
            "temperature": 21.4,
            "type": "zephyr",
            "updatedAt": "2024-03-12T10:00:00.000Z",
            "version": "1.4.2"
        });

        let mut device: Zephyr = serde_json::from_value(json).unwrap();
        assert_eq!(device.id.as_deref(), Some("65f0"));
        assert_eq!(device.fan_speed, None);
        assert_eq!(device.fan_speed_raw, Some(55));

        device.resolve_fan_speed(&SpeedTable::default());
        assert_eq!(device.fan_speed, Some(FanSpeed::Medium));
        assert!(device.is_on());
        assert_eq!(device.device_type, "zephyr");

        let custom = SpeedTable::new(35, 45, 65, 100).unwrap();
        device.resolve_fan_speed(&custom);
        assert_eq!(device.fan_speed, None);
    }
}
