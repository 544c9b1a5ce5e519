//! Relay engine: source fetching, spreadsheet publishing, credentials and the cycle scheduler.
mod credentials;
mod decode;
mod engine;
mod fetch;
mod oauth;
mod persist;
mod scheduler;
mod sheets;
mod sync;
mod types;

pub use credentials::{
    ClientSecret, CredentialError, CredentialProvider, FileTokenStore, OAuthCredentialProvider,
    OAuthToken, TokenStore,
};
pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use engine::{EngineConfig, EngineError, RelayEngine, DEFAULT_SOURCE_URL};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use oauth::{Authorizer, CodeSource, InstalledAppFlow, StdinCodeSource, SPREADSHEETS_SCOPE};
pub use persist::{write_atomically, PersistError};
pub use scheduler::{Decision, FailFast, RunSummary, Scheduler, Supervisor};
pub use sheets::{
    GoogleSheetsClient, PublishError, SheetTarget, SpreadsheetClient, UpdateSummary,
    DEFAULT_API_BASE,
};
pub use sync::{CycleReport, SyncCycle, SyncError};
pub use types::{FailureKind, FetchError, FetchMetadata, RawDocument};
