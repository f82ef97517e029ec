use anyhow::{Context, Result};
use config::{Config, File, FileFormat};
use log::{debug, LevelFilter};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SheetConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub key_file: String,
    pub api_base: String,
    /// First row of the combined settings/sample read range.
    pub first_row: u32,
    pub legend_row: u32,
    pub sample_row: u32,
    /// Number of rows following the marker row that make up the settings block.
    pub settings_rows: usize,
    pub settings_marker: String,
    pub reset_marker: String,
    /// Zone for sample timestamps: an IANA name, or a literal label. Unset means the host zone.
    pub timezone: Option<String>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: "Sheet1".to_string(),
            key_file: "service-account.json".to_string(),
            api_base: "https://sheets.googleapis.com".to_string(),
            first_row: 32,
            legend_row: 49,
            sample_row: 50,
            settings_rows: 15,
            settings_marker: "Settings:".to_string(),
            reset_marker: "reset".to_string(),
            timezone: None,
        }
    }
}

impl SheetConfig {
    /// Offset of the first sample row inside the combined read range.
    pub fn sample_offset(&self) -> usize {
        self.sample_row.saturating_sub(self.first_row) as usize
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorsConfig {
    pub devices_dir: String,
    pub family_prefix: String,
    pub data_file: String,
    pub decimals: u32,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            devices_dir: "/sys/bus/w1/devices".to_string(),
            family_prefix: "28".to_string(),
            data_file: "w1_slave".to_string(),
            decimals: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DefaultsConfig {
    pub units: String,
    pub normal_interval: u64,
    pub alert_interval: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            units: "C".to_string(),
            normal_interval: 600,
            alert_interval: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(rename = "SHEET", alias = "sheet", default)]
    pub sheet: SheetConfig,
    #[serde(rename = "SENSORS", alias = "sensors", default)]
    pub sensors: SensorsConfig,
    #[serde(rename = "DEFAULTS", alias = "defaults", default)]
    pub defaults: DefaultsConfig,
    #[serde(rename = "LOGGING", alias = "logging", default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        Self::from_file("config.ini")
    }

    pub fn get_log_level(&self) -> LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info, // Default to Info if invalid
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        debug!("Loading configuration from {}", config_path.display());

        let config = Config::builder()
            .add_source(File::from(config_path).format(FileFormat::Ini))
            .build()
            .context(format!("Failed to load config from {}", config_path.display()))?;

        let app_config: AppConfig = config.try_deserialize()
            .context("Failed to deserialize config")?;

        Ok(app_config)
    }
}
