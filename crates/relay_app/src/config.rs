//! Optional RON configuration. Every field falls back to the built-in value,
//! so an empty `()` file and a missing file behave the same.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use relay_core::{ExtractionSettings, RowWidth};
use relay_engine::{EngineConfig, FetchSettings, SheetTarget};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "table_relay.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub source_url: String,
    pub container_open: String,
    pub container_close: String,
    pub row_width: usize,
    pub spreadsheet_id: String,
    pub header_range: String,
    pub body_range: String,
    pub interval_secs: u64,
    pub client_secret_path: PathBuf,
    pub token_path: PathBuf,
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub max_page_bytes: u64,
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            source_url: engine.source_url,
            container_open: engine.extraction.container_open,
            container_close: engine.extraction.container_close,
            row_width: engine.extraction.row_width.get(),
            spreadsheet_id: engine.target.spreadsheet_id,
            header_range: engine.target.header_range,
            body_range: engine.target.body_range,
            interval_secs: engine.interval.as_secs(),
            client_secret_path: engine.client_secret_path,
            token_path: engine.token_path,
            api_base: engine.api_base,
            request_timeout_secs: engine.fetch.request_timeout.as_secs(),
            max_page_bytes: engine.fetch.max_bytes,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read config {:?}", path))
            }
        };
        ron::from_str(&text).with_context(|| format!("failed to parse config {:?}", path))
    }

    pub fn log_level(&self) -> Result<log::LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| anyhow!("unknown log level {:?}", self.log_level))
    }

    pub fn into_engine_config(self) -> Result<EngineConfig> {
        let row_width = RowWidth::new(self.row_width)
            .with_context(|| format!("row_width {} is not usable", self.row_width))?;
        let defaults = EngineConfig::default();
        let request_timeout = Duration::from_secs(self.request_timeout_secs);

        Ok(EngineConfig {
            source_url: self.source_url,
            fetch: FetchSettings {
                request_timeout,
                max_bytes: self.max_page_bytes,
            },
            extraction: ExtractionSettings {
                container_open: self.container_open,
                container_close: self.container_close,
                row_width,
            },
            interval: Duration::from_secs(self.interval_secs),
            target: SheetTarget {
                spreadsheet_id: self.spreadsheet_id,
                header_range: self.header_range,
                body_range: self.body_range,
            },
            api_base: self.api_base,
            api_timeout: request_timeout,
            client_secret_path: self.client_secret_path,
            token_path: self.token_path,
            scopes: defaults.scopes,
        })
    }
}
