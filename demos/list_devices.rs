use bskzephyr::{ClientConfig, Credentials, Result, ZephyrClient, ZephyrError};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("🌬️ bskzephyr Device Listing Example");

    let username = std::env::var("BSK_USERNAME").map_err(|_| ZephyrError::MissingCredentials)?;
    let password = std::env::var("BSK_PASSWORD").map_err(|_| ZephyrError::MissingCredentials)?;

    let config = ClientConfig::default();
    let client = ZephyrClient::with_config(
        config.http_client()?,
        Some(Credentials::new(username, password)),
        None,
        config,
    );

    if let Err(e) = client.login().await {
        error!("❌ Sign-in failed: {}", e);
        return Err(e);
    }
    info!("✅ Signed in");

    let devices = client.list_devices().await?;
    info!("Found {} device(s)", devices.len());

    for binding in devices {
        let device = &binding.device;
        println!("\n{} ({} / {})", binding.title, binding.group_title, binding.device_model);
        println!("  Group ID:    {}", device.group_id);
        println!("  Device ID:   {}", device.device_id);
        println!("  Firmware:    {}", device.version);
        println!("  Power:       {}", device.device_status);
        println!("  Mode:        {}", device.fan_mode);
        match (device.fan_speed, device.fan_speed_raw) {
            (Some(speed), Some(raw)) => println!("  Fan speed:   {speed} ({raw}%)"),
            (None, Some(raw)) => println!("  Fan speed:   {raw}% (no matching preset)"),
            _ => println!("  Fan speed:   unknown"),
        }
        println!("  Temperature: {:.1}°C", device.temperature);
        println!("  Humidity:    {:.1}%", device.humidity);
        println!("  Filter:      {}", device.filter_timer);
    }

    Ok(())
}
