use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::engine_info;
use relay_core::{ExtractionSettings, DEFAULT_INTERVAL};
use thiserror::Error;

use crate::credentials::{ClientSecret, CredentialError, FileTokenStore, OAuthCredentialProvider};
use crate::fetch::{FetchSettings, ReqwestFetcher};
use crate::oauth::{CodeSource, InstalledAppFlow, SPREADSHEETS_SCOPE};
use crate::scheduler::{RunSummary, Scheduler, Supervisor};
use crate::sheets::{GoogleSheetsClient, PublishError, SheetTarget, DEFAULT_API_BASE};
use crate::sync::{SyncCycle, SyncError};
use crate::types::FetchError;

pub const DEFAULT_SOURCE_URL: &str =
    "https://confluence.hflabs.ru/pages/viewpage.action?pageId=1181220999";

/// Everything needed to wire a running relay.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub source_url: String,
    pub fetch: FetchSettings,
    pub extraction: ExtractionSettings,
    pub interval: Duration,
    pub target: SheetTarget,
    pub api_base: String,
    pub api_timeout: Duration,
    pub client_secret_path: PathBuf,
    pub token_path: PathBuf,
    pub scopes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            fetch: FetchSettings::default(),
            extraction: ExtractionSettings::default(),
            interval: DEFAULT_INTERVAL,
            target: SheetTarget::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_timeout: Duration::from_secs(30),
            client_secret_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            scopes: vec![SPREADSHEETS_SCOPE.to_string()],
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot start async runtime: {0}")]
    Runtime(#[from] io::Error),
    #[error("credential setup failed: {0}")]
    Credential(#[from] CredentialError),
    #[error("fetcher setup failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("spreadsheet client setup failed: {0}")]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

pub struct RelayEngine {
    cycle: SyncCycle,
}

impl RelayEngine {
    /// Reads the client secret and builds the fetcher, credential provider
    /// and spreadsheet client. No network traffic happens here.
    pub fn new(config: EngineConfig, code_source: Arc<dyn CodeSource>) -> Result<Self, EngineError> {
        let secret = ClientSecret::from_file(&config.client_secret_path)?;
        let flow = InstalledAppFlow::new(secret, config.scopes, code_source)?;
        let credentials = Arc::new(OAuthCredentialProvider::new(
            FileTokenStore::new(config.token_path),
            flow,
        ));
        let sheets = Arc::new(GoogleSheetsClient::new(
            &config.api_base,
            config.target.spreadsheet_id.clone(),
            credentials,
            config.api_timeout,
        )?);
        let fetcher = Arc::new(ReqwestFetcher::new(config.fetch)?);

        engine_info!(
            "relaying {} to spreadsheet {} every {:?}",
            config.source_url,
            config.target.spreadsheet_id,
            config.interval
        );
        let cycle = SyncCycle::new(
            fetcher,
            sheets,
            config.source_url,
            config.target,
            config.extraction,
            config.interval,
        );
        Ok(Self { cycle })
    }

    /// Blocks the calling thread, running `scheduler` on a fresh tokio runtime.
    pub fn run_blocking<S: Supervisor>(
        mut self,
        mut scheduler: Scheduler<S>,
    ) -> Result<RunSummary, EngineError> {
        let runtime = tokio::runtime::Runtime::new()?;
        let summary = runtime.block_on(scheduler.run(&mut self.cycle))?;
        Ok(summary)
    }
}
