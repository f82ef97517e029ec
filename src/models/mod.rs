pub mod sample;
pub mod sensor;
pub mod settings;

pub use sample::{SampleRow, TimezoneLabel};
pub use sensor::{Device, Reading};
pub use settings::{Settings, SettingsRow, Units};

/// A single cell as delivered by the Sheets API with unformatted values.
pub type Cell = serde_json::Value;

/// A sheet row; trailing empty cells are omitted by the API so rows vary in length.
pub type Row = Vec<Cell>;
