//! Google Sheets v4 values API over plain reqwest.

use std::sync::Arc;
use std::time::Duration;

use engine_logging::engine_debug;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::credentials::{CredentialError, CredentialProvider};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("spreadsheet rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("invalid spreadsheet address: {0}")]
    InvalidTarget(String),
    #[error("credentials unavailable: {0}")]
    Credential(#[from] CredentialError),
}

/// The spreadsheet and the two ranges overwritten every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub header_range: String,
    pub body_range: String,
}

impl Default for SheetTarget {
    fn default() -> Self {
        Self {
            spreadsheet_id: "1ubILHw8TfZLIMMjvy0POPWsu2UsgGs70dn6EvCocW38".to_string(),
            header_range: "Page1!A1:B".to_string(),
            body_range: "Page1!A2:B".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSummary {
    pub updated_range: String,
    pub updated_rows: u64,
    pub updated_columns: u64,
    pub updated_cells: u64,
}

/// Range-level access to one spreadsheet.
#[async_trait::async_trait]
pub trait SpreadsheetClient: Send + Sync {
    /// Overwrite `range` with literal `values` (no formula interpretation) in one request.
    async fn update_values(
        &self,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<UpdateSummary, PublishError>;

    /// Read `range` back as formatted strings, row by row.
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, PublishError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

pub struct GoogleSheetsClient {
    http: reqwest::Client,
    api_base: Url,
    spreadsheet_id: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl GoogleSheetsClient {
    pub fn new(
        api_base: &str,
        spreadsheet_id: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let api_base =
            Url::parse(api_base).map_err(|err| PublishError::InvalidTarget(err.to_string()))?;
        if api_base.cannot_be_a_base() {
            return Err(PublishError::InvalidTarget(format!(
                "{api_base} cannot be a base url"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PublishError::Network(err.to_string()))?;
        Ok(Self {
            http,
            api_base,
            spreadsheet_id: spreadsheet_id.into(),
            credentials,
        })
    }

    fn values_url(&self, range: &str) -> Result<Url, PublishError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| PublishError::InvalidTarget(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, PublishError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| PublishError::Network(err.to_string()))?;
        if status.is_success() {
            return Ok(bytes.to_vec());
        }
        let message = match serde_json::from_slice::<ApiErrorBody>(&bytes) {
            Ok(ApiErrorBody { error }) if error.status.is_empty() => error.message,
            Ok(ApiErrorBody { error }) => format!("{}: {}", error.status, error.message),
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        };
        Err(PublishError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait::async_trait]
impl SpreadsheetClient for GoogleSheetsClient {
    async fn update_values(
        &self,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<UpdateSummary, PublishError> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let payload = serde_json::to_vec(&ValueRange {
            range,
            major_dimension: "ROWS",
            values,
        })
        .map_err(|err| PublishError::InvalidResponse(err.to_string()))?;
        let token = self.credentials.access_token().await?;

        engine_debug!("PUT {} ({} bytes)", url, payload.len());
        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|err| PublishError::Network(err.to_string()))?;

        let body = Self::read_body(response).await?;
        serde_json::from_slice(&body).map_err(|err| PublishError::InvalidResponse(err.to_string()))
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, PublishError> {
        let url = self.values_url(range)?;
        let token = self.credentials.access_token().await?;

        engine_debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| PublishError::Network(err.to_string()))?;

        let body = Self::read_body(response).await?;
        let parsed: ValueRangeResponse = serde_json::from_slice(&body)
            .map_err(|err| PublishError::InvalidResponse(err.to_string()))?;
        Ok(parsed.values)
    }
}
