use log::{debug, warn};
use std::fmt;
use std::time::Duration;

use super::Cell;
use crate::config::DefaultsConfig;

pub const UNITS_KEY: &str = "UNITS";
pub const ALERT_TEMPS_KEY: &str = "ALERT_TEMPS";
pub const NORMAL_INTERVAL_KEY: &str = "NORMAL_INTERVAL";
pub const ALERT_INTERVAL_KEY: &str = "ALERT_INTERVAL";
pub const ALERT_EMAILS_KEY: &str = "ALERT_EMAILS";
pub const ALERT_MODE_KEY: &str = "ALERT_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Celsius,
    Fahrenheit,
}

impl Units {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "C" => Some(Units::Celsius),
            "F" => Some(Units::Fahrenheit),
            _ => None,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Celsius => write!(f, "C"),
            Units::Fahrenheit => write!(f, "F"),
        }
    }
}

/// Runtime settings, seeded from the local config and refreshed from the sheet every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub units: Units,
    /// Per-device thresholds in `units`; `None` where the sheet cell is not a number.
    pub alert_temps: Vec<Option<f64>>,
    pub normal_interval: Duration,
    pub alert_interval: Duration,
    pub alert_emails: Vec<String>,
    pub alert_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&DefaultsConfig::default())
    }
}

impl From<&DefaultsConfig> for Settings {
    fn from(defaults: &DefaultsConfig) -> Self {
        let units = Units::parse(&defaults.units).unwrap_or_else(|| {
            warn!("Unknown default units {:?}, using Celsius", defaults.units);
            Units::Celsius
        });
        Self {
            units,
            alert_temps: Vec::new(),
            normal_interval: Duration::from_secs(defaults.normal_interval),
            alert_interval: Duration::from_secs(defaults.alert_interval),
            alert_emails: Vec::new(),
            alert_mode: false,
        }
    }
}

/// A settings-block row decoded from the untyped cell grid.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsRow {
    KeyValue { key: String, value: Cell },
    /// A wide row: the key cell, a label cell, then one value per device.
    Thresholds { key: String, values: Vec<Cell> },
}

impl SettingsRow {
    pub fn decode(row: &[Cell]) -> Option<Self> {
        let key = cell_text(row.first()?)?;
        match row.len() {
            2 => Some(SettingsRow::KeyValue {
                key,
                value: row[1].clone(),
            }),
            n if n > 2 => Some(SettingsRow::Thresholds {
                key,
                values: row[2..].to_vec(),
            }),
            _ => None,
        }
    }
}

impl Settings {
    /// The polling interval for the current mode.
    pub fn active_interval(&self) -> Duration {
        if self.alert_mode {
            self.alert_interval
        } else {
            self.normal_interval
        }
    }

    /// Overwrite every field named in `rows`; fields the block does not mention keep their value.
    pub fn apply_rows(&mut self, rows: &[Vec<Cell>]) {
        for row in rows.iter().filter_map(|row| SettingsRow::decode(row)) {
            self.apply(row);
        }
    }

    pub fn apply(&mut self, row: SettingsRow) {
        match row {
            SettingsRow::KeyValue { key, value } => self.apply_key_value(&key, &value),
            SettingsRow::Thresholds { key, values } if key == ALERT_TEMPS_KEY => {
                self.alert_temps = values.iter().map(cell_number).collect();
            }
            SettingsRow::Thresholds { key, .. } => debug!("Ignoring wide settings row {}", key),
        }
    }

    fn apply_key_value(&mut self, key: &str, value: &Cell) {
        match key {
            ALERT_EMAILS_KEY => {
                self.alert_emails = cell_text(value)
                    .unwrap_or_default()
                    .split(',')
                    .map(|address| address.trim().to_string())
                    .filter(|address| !address.is_empty())
                    .collect();
            }
            UNITS_KEY => match cell_text(value).as_deref().and_then(Units::parse) {
                Some(units) => self.units = units,
                None => warn!("Invalid {} value {}", key, value),
            },
            NORMAL_INTERVAL_KEY => {
                if let Some(interval) = cell_interval(key, value) {
                    self.normal_interval = interval;
                }
            }
            ALERT_INTERVAL_KEY => {
                if let Some(interval) = cell_interval(key, value) {
                    self.alert_interval = interval;
                }
            }
            ALERT_MODE_KEY => match cell_bool(value) {
                Some(mode) => self.alert_mode = mode,
                None => warn!("Invalid {} value {}", key, value),
            },
            ALERT_TEMPS_KEY => debug!("{} expects a wide row, ignoring key/value form", key),
            _ => debug!("Ignoring unknown settings key {}", key),
        }
    }
}

fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::String(text) => Some(text.trim().to_string()),
        Cell::Number(number) => Some(number.to_string()),
        Cell::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

pub(crate) fn cell_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(number) => number.as_f64(),
        Cell::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn cell_bool(cell: &Cell) -> Option<bool> {
    match cell {
        Cell::Bool(flag) => Some(*flag),
        Cell::String(text) => match text.trim().to_uppercase().as_str() {
            "TRUE" => Some(true),
            "FALSE" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn cell_interval(key: &str, cell: &Cell) -> Option<Duration> {
    match cell_number(cell) {
        Some(seconds) if seconds >= 0.0 => match Duration::try_from_secs_f64(seconds) {
            Ok(interval) => Some(interval),
            Err(_) => {
                warn!("Out of range {} value {}", key, cell);
                None
            }
        },
        _ => {
            warn!("Invalid {} value {}", key, cell);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block() -> Vec<Vec<Cell>> {
        vec![
            vec![json!("UNITS"), json!("F")],
            vec![json!("ALERT_TEMPS"), json!("Max temp"), json!(86), json!("90.5"), json!("")],
            vec![json!("NORMAL_INTERVAL"), json!(300)],
            vec![json!("ALERT_INTERVAL"), json!("45")],
            vec![json!("ALERT_EMAILS"), json!("a@example.com, b@example.com")],
            vec![json!("COLOUR"), json!("blue")],
            vec![],
            vec![json!("lonely")],
        ]
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.units, Units::Celsius);
        assert!(settings.alert_temps.is_empty());
        assert_eq!(settings.normal_interval, Duration::from_secs(600));
        assert_eq!(settings.alert_interval, Duration::from_secs(60));
        assert!(!settings.alert_mode);
        assert_eq!(settings.active_interval(), Duration::from_secs(600));
    }

    #[test]
    fn test_decode_rows() {
        assert_eq!(
            SettingsRow::decode(&[json!("UNITS"), json!("C")]),
            Some(SettingsRow::KeyValue { key: "UNITS".into(), value: json!("C") })
        );
        assert_eq!(
            SettingsRow::decode(&[json!("ALERT_TEMPS"), json!("label"), json!(30), json!(31)]),
            Some(SettingsRow::Thresholds { key: "ALERT_TEMPS".into(), values: vec![json!(30), json!(31)] })
        );
        assert_eq!(SettingsRow::decode(&[json!("UNITS")]), None);
        assert_eq!(SettingsRow::decode(&[]), None);
        assert_eq!(SettingsRow::decode(&[Cell::Null, json!(1)]), None);
    }

    #[test]
    fn test_apply_block() {
        let mut settings = Settings::default();
        settings.apply_rows(&block());

        assert_eq!(settings.units, Units::Fahrenheit);
        assert_eq!(settings.alert_temps, vec![Some(86.0), Some(90.5), None]);
        assert_eq!(settings.normal_interval, Duration::from_secs(300));
        assert_eq!(settings.alert_interval, Duration::from_secs(45));
        assert_eq!(settings.alert_emails, vec!["a@example.com", "b@example.com"]);
        assert!(!settings.alert_mode);
    }

    #[test]
    fn test_absent_keys_keep_previous_values() {
        let mut settings = Settings::default();
        settings.apply_rows(&block());
        settings.apply_rows(&[vec![json!("UNITS"), json!("C")]]);

        assert_eq!(settings.units, Units::Celsius);
        assert_eq!(settings.normal_interval, Duration::from_secs(300));
        assert_eq!(settings.alert_temps.len(), 3);
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_rows(&[
            vec![json!("UNITS"), json!("K")],
            vec![json!("NORMAL_INTERVAL"), json!("soon")],
            vec![json!("ALERT_INTERVAL"), json!(-5)],
            vec![json!("ALERT_MODE"), json!("maybe")],
        ]);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_out_of_range_intervals_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_rows(&[
            vec![json!("NORMAL_INTERVAL"), json!("1e30")],
            vec![json!("ALERT_INTERVAL"), json!(1e300)],
            vec![json!("NORMAL_INTERVAL"), json!("inf")],
            vec![json!("ALERT_INTERVAL"), json!("NaN")],
        ]);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_alert_emails_drop_blank_entries() {
        let mut settings = Settings::default();
        settings.apply_rows(&[vec![json!("ALERT_EMAILS"), json!(" a@example.com, ,b@example.com,")]]);
        assert_eq!(settings.alert_emails, vec!["a@example.com", "b@example.com"]);

        settings.apply_rows(&[vec![json!("ALERT_EMAILS"), json!("")]]);
        assert!(settings.alert_emails.is_empty());
    }

    #[test]
    fn test_alert_mode_key() {
        let mut settings = Settings::default();
        settings.apply_rows(&[vec![json!("ALERT_MODE"), json!(true)]]);
        assert!(settings.alert_mode);
        settings.apply_rows(&[vec![json!("ALERT_MODE"), json!("FALSE")]]);
        assert!(!settings.alert_mode);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let mut once = Settings::default();
        once.apply_rows(&block());
        let mut twice = once.clone();
        twice.apply_rows(&block());
        assert_eq!(once, twice);
    }
}
