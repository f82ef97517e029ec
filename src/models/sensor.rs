use chrono::{DateTime, Local};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Device {
    /// Directory name under the 1-wire bus, e.g. `28-000001`.
    pub id: String,
    /// Path of the data file read on every cycle.
    pub path: PathBuf,
}

impl Device {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// Temperatures in degrees Celsius, position-aligned with the device list.
#[derive(Debug, Clone)]
pub struct Reading {
    pub time: DateTime<Local>,
    pub values: Vec<f64>,
}

impl Reading {
    pub fn new(time: DateTime<Local>, values: Vec<f64>) -> Self {
        Self { time, values }
    }
}
