use log::{info, warn};

use crate::models::{Settings, Units};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    EnteredAlert,
    ReturnedToNormal,
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    5.0 / 9.0 * (fahrenheit - 32.0)
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Thresholds expressed in Celsius, whatever unit the sheet uses.
pub fn thresholds_celsius(settings: &Settings) -> Vec<Option<f64>> {
    match settings.units {
        Units::Celsius => settings.alert_temps.clone(),
        Units::Fahrenheit => settings
            .alert_temps
            .iter()
            .map(|threshold| threshold.map(fahrenheit_to_celsius))
            .collect(),
    }
}

/// True when any reading is strictly above the threshold at the same position.
///
/// Only the overlapping prefix of readings and thresholds is compared.
pub fn exceeds_thresholds(readings: &[f64], thresholds: &[Option<f64>]) -> bool {
    readings
        .iter()
        .zip(thresholds)
        .any(|(reading, threshold)| threshold.is_some_and(|limit| *reading > limit))
}

/// Update the alert flag from `readings` (Celsius) and report a flip, if any.
pub fn evaluate(settings: &mut Settings, readings: &[f64]) -> Option<Transition> {
    let alert = exceeds_thresholds(readings, &thresholds_celsius(settings));
    let transition = match (settings.alert_mode, alert) {
        (false, true) => {
            warn!("Setting Alert Mode");
            if !settings.alert_emails.is_empty() {
                info!("Alert recipients: {}", settings.alert_emails.join(", "));
            }
            Some(Transition::EnteredAlert)
        }
        (true, false) => {
            info!("Setting Normal Mode");
            Some(Transition::ReturnedToNormal)
        }
        _ => None,
    };
    settings.alert_mode = alert;
    transition
}
