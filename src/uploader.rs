use log::{error, info, warn};
use serde_json::Value;

use crate::alert;
use crate::client::sheets::{a1_range, end_column, SheetService};
use crate::config::SheetConfig;
use crate::models::sample::{push_window, TimezoneLabel};
use crate::models::{Cell, Device, Reading, Row, SampleRow, Settings};

/// Replace every legend cell holding the reset marker with the matching device id.
///
/// The two timestamp headers are kept as they are; device cells are paired with
/// devices by position and anything past the shorter of the two is dropped.
pub fn reset_legend(legend: &[Cell], devices: &[Device], reset_marker: &str) -> Row {
    let headers = legend.iter().take(2).cloned();
    let device_cells = devices
        .iter()
        .zip(legend.iter().skip(2))
        .map(|(device, cell)| match cell {
            Value::String(name) if name == reset_marker => Value::String(device.id.clone()),
            other => other.clone(),
        });
    headers.chain(device_cells).collect()
}

/// Refresh the legend row from the live device list. Failures are logged and swallowed.
pub async fn upload_legend<S: SheetService>(sheet: &mut S, config: &SheetConfig, devices: &[Device]) {
    let range = a1_range(
        &config.sheet_name,
        config.legend_row,
        end_column(devices.len()),
        Some(config.legend_row),
    );

    let legend = match sheet.read_range(&range).await {
        Ok(rows) => match rows.into_iter().next() {
            Some(row) => row,
            None => {
                warn!("Legend row {} is empty, leaving it alone", range);
                return;
            }
        },
        Err(e) => {
            error!("Failed to read legend: {}", e);
            return;
        }
    };

    let legend = reset_legend(&legend, devices, &config.reset_marker);
    info!("Legend: {:?}", legend);

    if let Err(e) = sheet.write_range(&range, vec![legend]).await {
        error!("Failed to write legend: {}", e);
    }
}

fn is_settings_block(rows: &[Row], marker: &str) -> bool {
    rows.first()
        .and_then(|row| row.first())
        .and_then(Value::as_str)
        .is_some_and(|cell| cell == marker)
}

/// One upload cycle: refresh settings from the sheet, re-evaluate alert mode,
/// then push `reading` onto the rolling sample window.
///
/// Remote failures are logged; the alert evaluation still runs on whatever
/// settings are current.
pub async fn upload_time_temp<S: SheetService>(
    sheet: &mut S,
    config: &SheetConfig,
    timezone: &TimezoneLabel,
    settings: &mut Settings,
    reading: &Reading,
) {
    let end = end_column(reading.values.len());
    let full_range = a1_range(&config.sheet_name, config.first_row, end, None);

    let rows = match sheet.read_range(&full_range).await {
        Ok(rows) => Some(rows),
        Err(e) => {
            error!("Failed to read {}: {}", full_range, e);
            None
        }
    };

    if let Some(rows) = rows.as_deref() {
        if is_settings_block(rows, &config.settings_marker) {
            let block_end = rows.len().min(1 + config.settings_rows);
            settings.apply_rows(&rows[1..block_end]);
        }
    }

    alert::evaluate(settings, &reading.values);

    let rows = match rows {
        Some(rows) if !rows.is_empty() => rows,
        Some(_) => {
            warn!("{} returned no values, skipping upload", full_range);
            return;
        }
        None => return,
    };

    let window = rows.get(config.sample_offset()..).unwrap_or(&[]);
    let newest = SampleRow::new(reading, timezone).into_row();
    let window = push_window(newest, window);

    let sample_range = a1_range(&config.sheet_name, config.sample_row, end, None);
    if let Err(e) = sheet.write_range(&sample_range, window).await {
        error!("Failed to write samples to {}: {}", sample_range, e);
    }
}
