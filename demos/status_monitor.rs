use bskzephyr::{ClientConfig, Credentials, Result, ZephyrClient, ZephyrError};
use std::{collections::HashMap, time::Duration};
use tokio::time::{interval, Instant};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("📊 bskzephyr Status Monitor Example");

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

    info!("🔍 Polling BSK Connect every 30 seconds");
    info!("Press Ctrl+C to stop monitoring");

    let mut poll_interval = interval(Duration::from_secs(30));
    let start_time = Instant::now();
    let mut last_humidity: HashMap<String, f64> = HashMap::new();

    loop {
        poll_interval.tick().await;

        let devices = match client.list_devices().await {
            Ok(devices) => devices,
            Err(e) if e.is_recoverable() => {
                warn!("Polling failed, will retry: {}", e);
                continue;
            }
            Err(e) => {
                error!("❌ Polling failed: {}", e);
                return Err(e);
            }
        };

        let elapsed = start_time.elapsed();
        let minutes = elapsed.as_secs() / 60;
        let seconds = elapsed.as_secs() % 60;
        println!("\n📊 Status Update ({minutes:02}:{seconds:02})");

        for binding in &devices {
            let device = &binding.device;
            let speed = device
                .fan_speed
                .map_or_else(|| "?".to_string(), |s| s.to_string());
            println!(
                "  {:<16} {:>3} {:<8} {:<7} {:5.1}°C {:5.1}%",
                binding.title,
                device.device_status,
                device.fan_mode,
                speed,
                device.temperature,
                device.humidity
            );

            if let Some(previous) = last_humidity.insert(device.group_id.clone(), device.humidity) {
                let delta = device.humidity - previous;
                if delta.abs() >= 5.0 {
                    println!("    💧 humidity changed by {delta:+.1}%");
                }
            }

            if device.humidity_boost_state {
                println!("    ⚡ humidity boost active");
            }
        }
    }
}
