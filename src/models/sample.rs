use chrono::{DateTime, TimeZone};
use log::{debug, warn};
use serde_json::json;
use std::fmt::Display;

use super::{Cell, Reading, Row};

pub const TIME_FORMAT: &str = "%Y/%m/%d %I:%M:%S %p ";

/// One line of the rolling sample window: epoch seconds, local time, then temperatures.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub time_raw: i64,
    pub time_display: String,
    pub values: Vec<f64>,
}

impl SampleRow {
    pub fn new(reading: &Reading, timezone: &TimezoneLabel) -> Self {
        Self {
            time_raw: rounded_epoch_seconds(&reading.time),
            time_display: timezone.format_time(&reading.time),
            values: reading.values.clone(),
        }
    }

    pub fn into_row(self) -> Row {
        let mut row: Row = Vec::with_capacity(self.values.len() + 2);
        row.push(json!(self.time_raw));
        row.push(Cell::String(self.time_display));
        row.extend(self.values.into_iter().map(|value| json!(value)));
        row
    }
}

/// Push `newest` onto a most-recent-first window, dropping the oldest row.
///
/// The window keeps its length; an empty window becomes a single row.
pub fn push_window(newest: Row, window: &[Row]) -> Vec<Row> {
    let keep = window.len().saturating_sub(1);
    std::iter::once(newest)
        .chain(window[..keep].iter().cloned())
        .collect()
}

/// Long names shrink to their word initials ("Eastern Standard Time" -> "EST").
pub fn abbreviate_timezone(name: &str) -> String {
    if name.chars().count() > 3 {
        name.split(' ')
            .filter_map(|word| word.chars().next())
            .collect()
    } else {
        name.to_string()
    }
}

/// Where the zone name printed after each local timestamp comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TimezoneLabel {
    /// A named zone; both the wall clock and the abbreviation follow its rules at each instant.
    Zone(chrono_tz::Tz),
    /// A literal label, for names that are not in the tz database.
    Fixed(String),
    /// The numeric offset of the timestamp, when the host zone cannot be resolved.
    Offset,
}

impl TimezoneLabel {
    /// Use `override_name` when set (an IANA name or a literal label), else the host zone.
    pub fn resolve(override_name: Option<&str>) -> Self {
        if let Some(name) = override_name.map(str::trim).filter(|name| !name.is_empty()) {
            return match name.parse::<chrono_tz::Tz>() {
                Ok(zone) => TimezoneLabel::Zone(zone),
                Err(_) => TimezoneLabel::Fixed(name.to_string()),
            };
        }

        match iana_time_zone::get_timezone() {
            Ok(name) => match name.parse::<chrono_tz::Tz>() {
                Ok(zone) => {
                    debug!("Host timezone is {}", name);
                    TimezoneLabel::Zone(zone)
                }
                Err(_) => {
                    warn!("Host timezone {} is not in the tz database, labelling samples with offsets", name);
                    TimezoneLabel::Offset
                }
            },
            Err(e) => {
                warn!("Unable to determine host timezone ({}), labelling samples with offsets", e);
                TimezoneLabel::Offset
            }
        }
    }

    /// `TIME_FORMAT` wall-clock time followed by the zone abbreviation in effect at `time`.
    pub fn format_time<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> String
    where
        Tz::Offset: Display,
    {
        match self {
            TimezoneLabel::Zone(zone) => {
                let zoned = time.with_timezone(zone);
                let name = zoned.format("%Z").to_string();
                format!("{}{}", zoned.format(TIME_FORMAT), abbreviate_timezone(&name))
            }
            TimezoneLabel::Fixed(name) => {
                format!("{}{}", time.format(TIME_FORMAT), abbreviate_timezone(name))
            }
            TimezoneLabel::Offset => format!("{}{}", time.format(TIME_FORMAT), time.format("%:z")),
        }
    }
}

fn rounded_epoch_seconds<Tz: TimeZone>(time: &DateTime<Tz>) -> i64 {
    (time.timestamp_millis() + 500).div_euclid(1000)
}
