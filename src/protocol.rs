use crate::{
    error::{Result, ZephyrError},
    types::{ControlRequest, DeviceState, DeviceUser, FanMode, SpeedTable, Zephyr},
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Sign-in endpoint path
pub const SIGN_IN_PATH: &str = "/auth/sign-in";

/// Device listing endpoint path
pub const DEVICE_USER_PATH: &str = "/device-user";

/// Device control endpoint path
pub const DEVICE_PATH: &str = "/device";

/// Query parameter addressing the device group on [`DEVICE_PATH`]
pub const GROUP_ID_PARAM: &str = "groupID";

/// Message used when an auth failure body carries none
pub const DEFAULT_AUTH_MESSAGE: &str = "authentication rejected";

/// Join an API path onto the configured base URL
///
/// # Errors
///
/// Returns [`ZephyrError::InvalidUrl`] if the result is not a valid URL.
pub fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let raw = format!("{}{path}", base_url.trim_end_matches('/'));
    Url::parse(&raw).map_err(|e| ZephyrError::InvalidUrl(format!("{raw}: {e}")))
}

/// URL of the control endpoint for one device group
///
/// # Errors
///
/// Returns [`ZephyrError::InvalidUrl`] if the base URL is invalid.
pub fn control_url(base_url: &str, group_id: &str) -> Result<Url> {
    let mut url = endpoint(base_url, DEVICE_PATH)?;
    url.query_pairs_mut().append_pair(GROUP_ID_PARAM, group_id);
    Ok(url)
}

/// Body of the sign-in request
#[derive(Debug, Serialize)]
pub struct SignInRequest<'a> {
    /// Account e-mail
    pub email: &'a str,
    /// Account password
    pub password: &'a str,
}

/// Body of a successful sign-in response
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    /// Session token sent back in the `Authorization` header
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// Error body returned by the cloud
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    /// Reason given by the cloud, usually a string
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

/// Body of a control request with only the set fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    device_status: Option<DeviceState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fan_mode: Option<FanMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fan_speed: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    humidity_boost: Option<i64>,
}

impl ControlBody {
    /// Translate a request into its wire form, mapping the speed preset to
    /// its raw value
    #[must_use]
    pub fn new(request: &ControlRequest, speeds: &SpeedTable) -> Self {
        Self {
            device_status: request.requested_status(),
            fan_mode: request.requested_fan_mode(),
            fan_speed: request.requested_fan_speed().map(|s| speeds.raw(s)),
            humidity_boost: request.requested_humidity_boost(),
        }
    }
}

/// Decode the device listing and resolve every fan speed
///
/// # Errors
///
/// Returns [`ZephyrError::Json`] if the body is not a valid listing.
pub fn decode_device_users(body: &[u8], speeds: &SpeedTable) -> Result<Vec<DeviceUser>> {
    let mut users: Vec<DeviceUser> = serde_json::from_slice(body)?;
    for user in &mut users {
        user.device.resolve_fan_speed(speeds);
    }
    Ok(users)
}

/// Decode a device document and resolve its fan speed
///
/// # Errors
///
/// Returns [`ZephyrError::Json`] if the body is not a valid device document.
pub fn decode_device(body: &[u8], speeds: &SpeedTable) -> Result<Zephyr> {
    let mut device: Zephyr = serde_json::from_slice(body)?;
    device.resolve_fan_speed(speeds);
    Ok(device)
}

/// Extract the auth failure message from an error body
///
/// # Errors
///
/// Returns [`ZephyrError::Json`] if the body is not JSON.
pub fn auth_failure_message(body: &[u8]) -> Result<String> {
    let error: ErrorBody = serde_json::from_slice(body)?;
    Ok(match error.message {
        Some(serde_json::Value::String(message)) => message,
        None | Some(serde_json::Value::Null) => DEFAULT_AUTH_MESSAGE.to_string(),
        Some(other) => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FanSpeed;
    use serde_json::json;

    fn device_json(fan_speed: serde_json::Value) -> serde_json::Value {
        json!({
            "boostTime": 30,
            "buzzerEnable": 0,
            "cycleDirection": "out",
            "cycleTime": 70,
            "deviceID": "ZP-7",
            "deviceModel": "Zephyr",
            "deviceStatus": "off",
            "fanSpeed": fan_speed,
            "fanMode": "extract",
            "filterTimer": 900,
            "groupID": "group 7",
            "humidity": 61.0,
            "humidityBoost": 0,
            "humidityBoostState": true,
            "hygieneStatus": 1,
            "temperature": 19.5,
            "type": "zephyr",
            "updatedAt": "2024-05-01T08:00:00.000Z",
            "version": "1.2.0"
        })
    }

    #[test]
    fn test_endpoint_joining() {
        let url = endpoint("https://connect.bskhvac.com.tr/", SIGN_IN_PATH).unwrap();
        assert_eq!(url.as_str(), "https://connect.bskhvac.com.tr/auth/sign-in");

        let url = endpoint("http://127.0.0.1:8080", DEVICE_USER_PATH).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/device-user");

        assert!(matches!(
            endpoint("not a url", DEVICE_PATH),
            Err(ZephyrError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_control_url_encodes_group() {
        let url = control_url("https://connect.bskhvac.com.tr", "living room&1").unwrap();
        assert_eq!(url.path(), "/device");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("groupID".to_string(), "living room&1".to_string())]
        );
    }

    #[test]
    fn test_control_body_only_set_fields() {
        let speeds = SpeedTable::default();

        let body = ControlBody::new(&ControlRequest::new().fan_speed(FanSpeed::Low), &speeds);
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({ "fanSpeed": 30 }));

        let request = ControlRequest::new()
            .power(true)
            .fan_mode(FanMode::Supply)
            .humidity_boost(0);
        let body = ControlBody::new(&request, &speeds);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "deviceStatus": "on", "fanMode": "supply", "humidityBoost": 0 })
        );
    }

    #[test]
    fn test_decode_device_users() {
        let listing = json!([{
            "_id": "u1",
            "DeviceUserType": "owner",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "device": device_json(json!(80)),
            "deviceModel": "Zephyr",
            "groupTitle": "Home",
            "title": "Bedroom",
            "updatedAt": "2024-01-02T00:00:00.000Z",
            "user": "user-1"
        }]);
        let body = serde_json::to_vec(&listing).unwrap();

        let users = decode_device_users(&body, &SpeedTable::default()).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].title, "Bedroom");
        assert_eq!(users[0].device_user_type, "owner");
        assert_eq!(users[0].device.fan_speed, Some(FanSpeed::High));
        assert_eq!(users[0].device.group_id, "group 7");
        assert!(!users[0].device.is_on());
    }

    #[test]
    fn test_decode_device_unmatched_or_missing_speed() {
        let body = serde_json::to_vec(&device_json(json!(35))).unwrap();
        let device = decode_device(&body, &SpeedTable::default()).unwrap();
        assert_eq!(device.fan_speed, None);
        assert_eq!(device.fan_speed_raw, Some(35));

        let body = serde_json::to_vec(&device_json(serde_json::Value::Null)).unwrap();
        let device = decode_device(&body, &SpeedTable::default()).unwrap();
        assert_eq!(device.fan_speed, None);
        assert_eq!(device.fan_speed_raw, None);
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let result = decode_device(br#"{"deviceID":"x"}"#, &SpeedTable::default());
        assert!(matches!(result, Err(ZephyrError::Json(_))));
    }

    #[test]
    fn test_auth_failure_message() {
        assert_eq!(
            auth_failure_message(br#"{"message":"Wrong password"}"#).unwrap(),
            "Wrong password"
        );
        assert_eq!(auth_failure_message(b"{}").unwrap(), DEFAULT_AUTH_MESSAGE);
        assert_eq!(
            auth_failure_message(br#"{"message":null}"#).unwrap(),
            DEFAULT_AUTH_MESSAGE
        );
        assert_eq!(auth_failure_message(br#"{"message":5}"#).unwrap(), "5");
        assert_eq!(
            auth_failure_message(br#"{"message":["locked"]}"#).unwrap(),
            r#"["locked"]"#
        );
        assert!(auth_failure_message(b"<html>oops</html>").is_err());
    }
}
