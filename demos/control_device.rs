use bskzephyr::{
    ClientConfig, ControlRequest, Credentials, FanMode, FanSpeed, Result, ZephyrClient,
    ZephyrError,
};
use tracing::{error, info, warn};

/// Usage: `control_device <group-id> [on|off] [cycle|extract|supply] [night|low|medium|high]`
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("🌬️ bskzephyr Control Example");

    let mut args = std::env::args().skip(1);
    let group_id = args.next().ok_or_else(|| {
        ZephyrError::InvalidParameters("usage: control_device <group-id> [settings...]".into())
    })?;

    let mut request = ControlRequest::new();
    for arg in args {
        request = match arg.as_str() {
            "on" => request.power(true),
            "off" => request.power(false),
            other => {
                if let Ok(mode) = other.parse::<FanMode>() {
                    request.fan_mode(mode)
                } else {
                    request.fan_speed(other.parse::<FanSpeed>()?)
                }
            }
        };
    }

    if request.is_empty() {
        warn!("Nothing to change for group {}", group_id);
        return Ok(());
    }

    let username = std::env::var("BSK_USERNAME").map_err(|_| ZephyrError::MissingCredentials)?;
    let password = std::env::var("BSK_PASSWORD").map_err(|_| ZephyrError::MissingCredentials)?;

    let config = ClientConfig {
        refresh_on_unauthorized: true,
        ..Default::default()
    };
    let client = ZephyrClient::with_config(
        config.http_client()?,
        Some(Credentials::new(username, password)),
        None,
        config,
    );

    match client.control_device(&group_id, request).await {
        Ok(Some(device)) => {
            info!("✅ Group {} updated", group_id);
            info!("  Power: {}", device.device_status);
            info!("  Mode:  {}", device.fan_mode);
            if let Some(speed) = device.fan_speed {
                info!("  Speed: {}", speed);
            }
        }
        Ok(None) => warn!("Nothing was sent"),
        Err(e) => {
            error!("❌ Control request failed: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
