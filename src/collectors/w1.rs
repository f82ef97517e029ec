use log::{debug, info, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

use crate::client::sheets::MAX_DEVICES;
use crate::config::SensorsConfig;
use crate::models::Device;
use crate::utils::file::read_lines;

/// Status suffix the w1_therm driver writes once the CRC of a conversion checks out.
const READY_MARKER: &str = "YES";

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("failed to scan {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sensor {0} is not ready")]
    NotReady(String),

    #[error("sensor {0} reported no temperature value")]
    MissingValue(String),
}

fn temperature_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"t=(-?\d+)").expect("temperature pattern is valid"))
}

/// Scan the 1-wire bus directory for temperature sensors of the configured family.
///
/// Devices come back sorted by name so sheet columns stay stable between runs.
pub fn discover_devices(config: &SensorsConfig) -> Result<Vec<Device>, SensorError> {
    let start = Instant::now();
    let root = Path::new(&config.devices_dir);
    let mut devices = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| SensorError::Discovery {
            path: root.to_path_buf(),
            source,
        })?;
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !name.starts_with(&config.family_prefix) {
            continue;
        }
        devices.push(Device::new(name, entry.path().join(&config.data_file)));
    }

    if devices.len() > MAX_DEVICES {
        warn!(
            "Found {} devices, only the first {} fit the sheet layout",
            devices.len(),
            MAX_DEVICES
        );
        devices.truncate(MAX_DEVICES);
    }

    info!(
        "Discovered devices: {:?}",
        devices.iter().map(|d| d.id.as_str()).collect::<Vec<_>>()
    );
    debug!("discover_devices took: {} ms", start.elapsed().as_millis());
    Ok(devices)
}

/// Read every device in order; the first device that is not ready aborts the whole read.
pub fn read_temperatures(devices: &[Device], decimals: u32) -> Result<Vec<f64>, SensorError> {
    let start = Instant::now();
    let mut values = Vec::with_capacity(devices.len());

    for device in devices {
        let lines = read_lines(&device.path).map_err(|source| SensorError::Io {
            path: device.path.clone(),
            source,
        })?;
        let millidegrees = parse_millidegrees(&device.id, &lines)?;
        values.push(round_to(millidegrees as f64 / 1000.0, decimals));
    }

    debug!("read_temperatures took: {} ms", start.elapsed().as_millis());
    Ok(values)
}

/// Parse the two-line w1_slave format:
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
fn parse_millidegrees(id: &str, lines: &[String]) -> Result<i64, SensorError> {
    let ready = lines
        .first()
        .is_some_and(|status| status.trim().ends_with(READY_MARKER));
    if !ready {
        return Err(SensorError::NotReady(id.to_string()));
    }

    lines
        .get(1)
        .and_then(|line| temperature_re().captures(line))
        .and_then(|captures| captures[1].parse().ok())
        .ok_or_else(|| SensorError::MissingValue(id.to_string()))
}

pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
