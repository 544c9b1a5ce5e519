//! OAuth 2.0 installed-application flow against Google's endpoints.
//!
//! The consent URL is shown to the operator, who pastes back the
//! authorization code; the code is exchanged for an access/refresh token
//! pair at the token endpoint. Refreshing reuses the same endpoint.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use url::Url;

use crate::credentials::{ClientSecret, CredentialError, OAuthToken};

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Obtains tokens from the authorization server.
#[async_trait::async_trait]
pub trait Authorizer: Send + Sync {
    /// Run the interactive flow and return a fresh token.
    async fn authorize(&self) -> Result<OAuthToken, CredentialError>;
    /// Trade the refresh token of `token` for a new access token.
    async fn refresh(&self, token: &OAuthToken) -> Result<OAuthToken, CredentialError>;
}

/// Source of the authorization code the operator copies from the browser.
pub trait CodeSource: Send + Sync {
    fn authorization_code(&self, auth_url: &str) -> Result<String, CredentialError>;
}

/// Prints the consent URL to stdout and reads the code from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinCodeSource;

impl CodeSource for StdinCodeSource {
    fn authorization_code(&self, auth_url: &str) -> Result<String, CredentialError> {
        let mut stdout = io::stdout();
        writeln!(
            stdout,
            "Go to the following link in your browser then type the authorization code:\n{auth_url}"
        )
        .and_then(|_| stdout.flush())
        .map_err(|err| CredentialError::AuthorizationCode(err.to_string()))?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|err| CredentialError::AuthorizationCode(err.to_string()))?;
        let code = line.trim();
        if code.is_empty() {
            return Err(CredentialError::AuthorizationCode(
                "no authorization code entered".into(),
            ));
        }
        Ok(code.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<&str>, now: DateTime<Utc>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expiry: self
                .expires_in
                .map(|secs| now + ChronoDuration::seconds(secs)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct InstalledAppFlow {
    secret: ClientSecret,
    scopes: Vec<String>,
    http: reqwest::Client,
    code_source: Arc<dyn CodeSource>,
}

impl InstalledAppFlow {
    pub fn new(
        secret: ClientSecret,
        scopes: Vec<String>,
        code_source: Arc<dyn CodeSource>,
    ) -> Result<Self, CredentialError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| CredentialError::Network(err.to_string()))?;
        Ok(Self {
            secret,
            scopes,
            http,
            code_source,
        })
    }

    /// Consent page URL requesting offline access, so a refresh token is issued.
    pub fn authorization_url(&self) -> Result<Url, CredentialError> {
        let mut url = Url::parse(&self.secret.auth_uri)
            .map_err(|err| CredentialError::InvalidClientSecret(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("access_type", "offline")
            .append_pair("client_id", &self.secret.client_id)
            .append_pair("redirect_uri", self.secret.redirect_uri())
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", "state-token");
        Ok(url)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, CredentialError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        let response = self
            .http
            .post(&self.secret.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|err| CredentialError::Network(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| CredentialError::Network(err.to_string()))?;
        if !status.is_success() {
            let message = match serde_json::from_slice::<TokenErrorResponse>(&bytes) {
                Ok(TokenErrorResponse {
                    error,
                    error_description: Some(description),
                }) => format!("{error}: {description}"),
                Ok(TokenErrorResponse { error, .. }) => error,
                Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(CredentialError::TokenEndpoint {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait::async_trait]
impl Authorizer for InstalledAppFlow {
    async fn authorize(&self) -> Result<OAuthToken, CredentialError> {
        let auth_url = self.authorization_url()?.to_string();
        let source = Arc::clone(&self.code_source);
        // Reading the terminal blocks; keep it off the async workers.
        let code = tokio::task::spawn_blocking(move || source.authorization_code(&auth_url))
            .await
            .map_err(|err| CredentialError::AuthorizationCode(err.to_string()))??;

        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("redirect_uri", self.secret.redirect_uri()),
            ])
            .await?;
        Ok(response.into_token(None, Utc::now()))
    }

    async fn refresh(&self, token: &OAuthToken) -> Result<OAuthToken, CredentialError> {
        let refresh_token = token.refresh_token().ok_or(CredentialError::NoRefreshToken)?;
        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
            ])
            .await?;
        Ok(response.into_token(Some(refresh_token), Utc::now()))
    }
}
