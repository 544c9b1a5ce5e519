use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use engine_logging::{engine_debug, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oauth::Authorizer;
use crate::persist::{write_atomically, PersistError};

/// Tokens this close to expiry are treated as already expired.
fn expiry_skew() -> ChronoDuration {
    ChronoDuration::seconds(10)
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("cannot read client secret {path:?}: {source}")]
    ClientSecretIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid client secret: {0}")]
    InvalidClientSecret(String),
    #[error("token file io error: {0}")]
    TokenIo(#[from] io::Error),
    #[error("malformed token json: {0}")]
    TokenJson(#[from] serde_json::Error),
    #[error("cannot persist token: {0}")]
    Persist(#[from] PersistError),
    #[error("authorization code unavailable: {0}")]
    AuthorizationCode(String),
    #[error("token endpoint rejected the request ({status}): {message}")]
    TokenEndpoint { status: u16, message: String },
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("network error: {0}")]
    Network(String),
}

/// Access/refresh token pair, stored in the same JSON shape Google client
/// libraries use for `token.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthToken {
    /// Expiry, ignoring the zero timestamp some writers use for "never".
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry.filter(|at| at.year() > 1)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at()
            .is_some_and(|at| at - expiry_skew() <= now)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// OAuth client registration, read from a Google client credentials file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ClientSecret {
    pub fn from_json(text: &str) -> Result<Self, CredentialError> {
        let file: ClientSecretFile = serde_json::from_str(text)
            .map_err(|err| CredentialError::InvalidClientSecret(err.to_string()))?;
        match (file.installed, file.web) {
            (Some(secret), None) | (None, Some(secret)) => Ok(secret),
            (None, None) => Err(CredentialError::InvalidClientSecret(
                "expected an \"installed\" or \"web\" client".into(),
            )),
            (Some(_), Some(_)) => Err(CredentialError::InvalidClientSecret(
                "both \"installed\" and \"web\" clients present".into(),
            )),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let text = fs::read_to_string(path).map_err(|source| CredentialError::ClientSecretIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or("urn:ietf:wg:oauth:2.0:oob")
    }
}

/// Where the token lives between runs.
pub trait TokenStore: Send + Sync {
    /// `Ok(None)` when no token has been stored yet.
    fn load(&self) -> Result<Option<OAuthToken>, CredentialError>;
    fn save(&self, token: &OAuthToken) -> Result<(), CredentialError>;
}

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<OAuthToken>, CredentialError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn save(&self, token: &OAuthToken) -> Result<(), CredentialError> {
        let content = serde_json::to_string(token)?;
        write_atomically(&self.path, &content)?;
        engine_info!("saved credential file to {:?}", self.path);
        Ok(())
    }
}

/// Supplies bearer tokens for spreadsheet requests.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, CredentialError>;
}

/// Loads the stored token once, refreshes it when it expires and falls back
/// to interactive authorization when nothing usable is stored.
pub struct OAuthCredentialProvider<S, A> {
    store: S,
    authorizer: A,
    cached: Mutex<Option<OAuthToken>>,
}

impl<S: TokenStore, A: Authorizer> OAuthCredentialProvider<S, A> {
    pub fn new(store: S, authorizer: A) -> Self {
        Self {
            store,
            authorizer,
            cached: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<OAuthToken> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remember(&self, token: OAuthToken) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    async fn authorize_and_save(&self) -> Result<OAuthToken, CredentialError> {
        let token = self.authorizer.authorize().await?;
        self.store.save(&token)?;
        Ok(token)
    }

    async fn load_or_authorize(&self) -> Result<OAuthToken, CredentialError> {
        match self.store.load() {
            Ok(Some(token)) => {
                engine_debug!("loaded stored token");
                return Ok(token);
            }
            Ok(None) => engine_info!("no stored token; starting interactive authorization"),
            Err(err) => {
                engine_warn!("stored token unusable ({}); starting interactive authorization", err)
            }
        }
        self.authorize_and_save().await
    }
}

#[async_trait::async_trait]
impl<S: TokenStore, A: Authorizer> CredentialProvider for OAuthCredentialProvider<S, A> {
    async fn access_token(&self) -> Result<String, CredentialError> {
        let token = match self.cached() {
            Some(token) => token,
            None => self.load_or_authorize().await?,
        };

        let token = if !token.is_expired(Utc::now()) {
            token
        } else if token.refresh_token().is_some() {
            let refreshed = self.authorizer.refresh(&token).await?;
            self.store.save(&refreshed)?;
            engine_info!("refreshed access token");
            refreshed
        } else {
            engine_info!("token expired and cannot be refreshed; re-authorizing");
            self.authorize_and_save().await?
        };

        let access = token.access_token.clone();
        self.remember(token);
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{ClientSecret, OAuthToken};

    #[test]
    fn reads_go_style_token_json() {
        let json = r#"{"access_token":"ya29","token_type":"Bearer","refresh_token":"1//r","expiry":"2024-05-01T10:00:00.123456+03:00"}"#;
        let token: OAuthToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.refresh_token(), Some("1//r"));
        assert_eq!(
            token.expires_at(),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap() + Duration::microseconds(123456))
        );
    }

    #[test]
    fn zero_expiry_never_expires() {
        let json = r#"{"access_token":"a","expiry":"0001-01-01T00:00:00Z"}"#;
        let token: OAuthToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert!(!token.is_expired(Utc::now()));
    }

    #[test]
    fn expiry_includes_skew() {
        let now = Utc::now();
        let token = OAuthToken {
            access_token: "a".into(),
            token_type: "Bearer".into(),
            refresh_token: Some(String::new()),
            expiry: Some(now + Duration::seconds(5)),
        };
        assert!(token.is_expired(now));
        assert_eq!(token.refresh_token(), None);
    }

    #[test]
    fn client_secret_accepts_installed_or_web() {
        let installed = r#"{"installed":{"client_id":"id","client_secret":"s","redirect_uris":["http://localhost"]}}"#;
        let secret = ClientSecret::from_json(installed).unwrap();
        assert_eq!(secret.redirect_uri(), "http://localhost");
        assert_eq!(secret.token_uri, "https://oauth2.googleapis.com/token");

        let web = r#"{"web":{"client_id":"id","client_secret":"s","token_uri":"http://t"}}"#;
        let secret = ClientSecret::from_json(web).unwrap();
        assert_eq!(secret.token_uri, "http://t");
        assert_eq!(secret.redirect_uri(), "urn:ietf:wg:oauth:2.0:oob");

        assert!(ClientSecret::from_json("{}").is_err());
    }
}
