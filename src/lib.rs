pub mod alert;
pub mod client;
pub mod collectors;
pub mod config;
pub mod models;
pub mod uploader;

mod utils;

use crate::client::auth::{CredentialProvider, ServiceAccount};
use crate::client::sheets::{SheetService, SheetsClient};
use crate::collectors::w1;
use crate::config::AppConfig;
use crate::models::{Device, Reading, Settings, TimezoneLabel};
use anyhow::Context;
use chrono::Local;
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting application");

    let devices = w1::discover_devices(&config.sensors).unwrap_or_else(|e| {
        error!("Device discovery failed: {}", e);
        Vec::new()
    });

    let http = reqwest::Client::new();
    let mut credentials = ServiceAccount::from_file(&config.sheet.key_file, http.clone())
        .context("Unable to authenticate using service account key")?;
    credentials
        .access_token()
        .await
        .context("Unable to authenticate using service account key")?;

    let mut sheet = SheetsClient::new(
        http,
        &config.sheet.api_base,
        &config.sheet.spreadsheet_id,
        credentials,
    );
    let mut settings = Settings::from(&config.defaults);
    let timezone = TimezoneLabel::resolve(config.sheet.timezone.as_deref());
    info!("Labelling samples with {:?}", timezone);

    uploader::upload_legend(&mut sheet, &config.sheet, &devices).await;

    tokio::select! {
        _ = main_loop(&config, &timezone, &devices, &mut sheet, &mut settings) => {}
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("Failed to listen for interrupt signal")?;
            info!("Interrupted, stopping");
        }
    }

    Ok(())
}

async fn main_loop<S: SheetService>(
    config: &AppConfig,
    timezone: &TimezoneLabel,
    devices: &[Device],
    sheet: &mut S,
    settings: &mut Settings,
) {
    loop {
        let elapsed = run_cycle(config, timezone, devices, sheet, settings).await;
        let pause = sleep_duration(settings.active_interval(), elapsed);
        debug!(
            "Cycle took {} ms, sleeping {} s ({} mode)",
            elapsed.as_millis(),
            pause.as_secs_f64(),
            if settings.alert_mode { "alert" } else { "normal" }
        );
        tokio::time::sleep(pause).await;
    }
}

/// Read every sensor and upload the result; returns how long the cycle took.
pub async fn run_cycle<S: SheetService>(
    config: &AppConfig,
    timezone: &TimezoneLabel,
    devices: &[Device],
    sheet: &mut S,
    settings: &mut Settings,
) -> Duration {
    let start = Instant::now();
    let time = Local::now();

    match w1::read_temperatures(devices, config.sensors.decimals) {
        Ok(values) => {
            let reading = Reading::new(time, values);
            uploader::upload_time_temp(sheet, &config.sheet, timezone, settings, &reading).await;
        }
        Err(e) => warn!("Skipping upload this cycle: {}", e),
    }

    start.elapsed()
}

/// Time left of `interval` once `elapsed` has been spent, never negative.
pub fn sleep_duration(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::sheets::SheetError;
    use crate::config::SensorsConfig;
    use crate::models::Row;
    use std::fs;

    #[test]
    fn test_sleep_duration_tracks_active_interval() {
        let mut settings = Settings::default();
        let upload = Duration::from_secs(5);

        assert_eq!(sleep_duration(settings.active_interval(), upload), Duration::from_secs(595));
        settings.alert_mode = true;
        assert_eq!(sleep_duration(settings.active_interval(), upload), Duration::from_secs(55));
    }

    #[test]
    fn test_sleep_duration_never_negative() {
        assert_eq!(
            sleep_duration(Duration::from_secs(60), Duration::from_secs(75)),
            Duration::ZERO
        );
    }

    #[derive(Default)]
    struct CountingSheet {
        reads: usize,
    }

    impl SheetService for CountingSheet {
        async fn read_range(&mut self, _range: &str) -> Result<Vec<Row>, SheetError> {
            self.reads += 1;
            Ok(Vec::new())
        }

        async fn write_range(&mut self, _range: &str, _rows: Vec<Row>) -> Result<(), SheetError> {
            Ok(())
        }
    }

    fn config_with_device(contents: &str) -> (tempfile::TempDir, AppConfig, Vec<Device>) {
        let dir = tempfile::tempdir().unwrap();
        let device_dir = dir.path().join("28-000001");
        fs::create_dir_all(&device_dir).unwrap();
        fs::write(device_dir.join("w1_slave"), contents).unwrap();

        let config = AppConfig {
            sensors: SensorsConfig {
                devices_dir: dir.path().to_str().unwrap().to_string(),
                ..SensorsConfig::default()
            },
            ..AppConfig::default()
        };
        let devices = w1::discover_devices(&config.sensors).unwrap();
        (dir, config, devices)
    }

    #[tokio::test]
    async fn test_cycle_uploads_ready_reading() {
        let (_dir, config, devices) = config_with_device("aa : crc=57 YES\naa t=21000\n");
        let mut sheet = CountingSheet::default();
        let mut settings = Settings::default();

        run_cycle(&config, &TimezoneLabel::Offset, &devices, &mut sheet, &mut settings).await;
        assert_eq!(sheet.reads, 1);
    }

    #[tokio::test]
    async fn test_cycle_skips_upload_when_sensor_not_ready() {
        let (_dir, config, devices) = config_with_device("aa : crc=00 NO\naa t=21000\n");
        let mut sheet = CountingSheet::default();
        let mut settings = Settings::default();

        run_cycle(&config, &TimezoneLabel::Offset, &devices, &mut sheet, &mut settings).await;
        assert_eq!(sheet.reads, 0);
    }
}
