use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

use super::auth::{AuthError, CredentialProvider};
use crate::models::Row;

/// Most devices the sample table can hold.
///
/// The range ends at column `B + device_count`, and the layout stops at F. The
/// five columns B..F minus the two timestamp columns (A raw seconds, B local time)
/// leave four device columns, C..F. The original five-device limit would need a
/// column G the sheet does not have.
pub const MAX_DEVICES: usize = 4;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Remote key-range read/write service.
#[allow(async_fn_in_trait)]
pub trait SheetService {
    async fn read_range(&mut self, range: &str) -> Result<Vec<Row>, SheetError>;
    async fn write_range(&mut self, range: &str, rows: Vec<Row>) -> Result<(), SheetError>;
}

/// Last column used for `device_count` devices: B plus one column per device.
pub fn end_column(device_count: usize) -> char {
    (b'B' + device_count.min(MAX_DEVICES) as u8) as char
}

/// A1 notation from column A of `start_row`, open-ended downwards when `end_row` is `None`.
pub fn a1_range(sheet: &str, start_row: u32, end_column: char, end_row: Option<u32>) -> String {
    match end_row {
        Some(end_row) => format!("{}!A{}:{}{}", sheet, start_row, end_column, end_row),
        None => format!("{}!A{}:{}", sheet, start_row, end_column),
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Row>,
}

/// Google Sheets v4 `spreadsheets.values` client.
pub struct SheetsClient<C> {
    http: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    credentials: C,
}

impl<C: CredentialProvider> SheetsClient<C> {
    pub fn new(http: reqwest::Client, api_base: &str, spreadsheet_id: &str, credentials: C) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            credentials,
        }
    }

    fn values_url(&self, range: &str) -> Result<reqwest::Url, SheetError> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| SheetError::InvalidUrl(format!("{}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetError::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SheetError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SheetError::Status { status, body })
        }
    }
}

impl<C: CredentialProvider> SheetService for SheetsClient<C> {
    async fn read_range(&mut self, range: &str) -> Result<Vec<Row>, SheetError> {
        let start = Instant::now();
        let url = self.values_url(range)?;
        let token = self.credentials.access_token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")])
            .send()
            .await?;
        let value_range: ValueRange = Self::check(response).await?.json().await?;

        debug!("read_range({}) took: {} ms", range, start.elapsed().as_millis());
        Ok(value_range.values)
    }

    async fn write_range(&mut self, range: &str, rows: Vec<Row>) -> Result<(), SheetError> {
        let start = Instant::now();
        let url = self.values_url(range)?;
        let token = self.credentials.access_token().await?;
        let body = ValueRange {
            range: Some(range.to_string()),
            major_dimension: Some("ROWS".to_string()),
            values: rows,
        };

        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;

        debug!("write_range({}) took: {} ms", range, start.elapsed().as_millis());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoToken;

    impl CredentialProvider for NoToken {
        async fn access_token(&mut self) -> Result<String, AuthError> {
            Ok("token".to_string())
        }
    }

    #[test]
    fn test_end_column() {
        assert_eq!(end_column(0), 'B');
        assert_eq!(end_column(1), 'C');
        assert_eq!(end_column(2), 'D');
        assert_eq!(end_column(4), 'F');
        assert_eq!(end_column(9), 'F');
    }

    #[test]
    fn test_a1_range() {
        assert_eq!(a1_range("Sheet1", 49, 'D', Some(49)), "Sheet1!A49:D49");
        assert_eq!(a1_range("Sheet1", 32, 'D', None), "Sheet1!A32:D");
    }

    #[test]
    fn test_values_url() {
        let client = SheetsClient::new(reqwest::Client::new(), "https://sheets.googleapis.com/", "abc", NoToken);
        let url = client.values_url("My Sheet!A32:D").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/My%20Sheet!A32:D"
        );
    }

    #[test]
    fn test_value_range_without_values() {
        let value_range: ValueRange =
            serde_json::from_value(json!({"range": "Sheet1!A32:D100", "majorDimension": "ROWS"})).unwrap();
        assert!(value_range.values.is_empty());
    }

    #[test]
    fn test_value_range_body() {
        let body = ValueRange {
            range: Some("Sheet1!A50:D".to_string()),
            major_dimension: Some("ROWS".to_string()),
            values: vec![vec![json!(1), json!("t"), json!(20.5)]],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"range": "Sheet1!A50:D", "majorDimension": "ROWS", "values": [[1, "t", 20.5]]})
        );
    }
}
