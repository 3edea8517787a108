//! Service-account sign-in for the Google APIs (Sheets user list, BigQuery).
//!
//! A signed RS256 assertion is exchanged for a short-lived access token at the
//! key's `token_uri`. The token is cached and renewed shortly before it expires,
//! so a long-running process keeps working without restarts.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::shared::config::{resolve_path, Config, UserSourceKind, WarehouseKind};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Read-only access to spreadsheets plus BigQuery jobs
pub const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets.readonly https://www.googleapis.com/auth/bigquery";

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A cached token is renewed once it is this close to expiry
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GoogleAuthError {
    #[error("Google token exchange failed: {0}")]
    TokenExchange(String),
}

/// Fields of a service-account JSON key that the exchange needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Shared by every Google client in the process
pub struct GoogleTokenProvider {
    client: reqwest::Client,
    key: ServiceAccountKey,
    encoding: EncodingKey,
    cache: Mutex<Option<CachedToken>>,
}

impl GoogleTokenProvider {
    pub fn from_key_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("cannot read service-account key {}: {}", path.display(), e)
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("invalid service-account key {}: {}", path.display(), e))?;
        Self::from_key(key)
    }

    pub fn from_key(key: ServiceAccountKey) -> anyhow::Result<Self> {
        let encoding = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            key,
            encoding,
            cache: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Current bearer token, exchanging a new assertion when the cached one is stale
    pub async fn access_token(&self) -> Result<String, GoogleAuthError> {
        // Held across the exchange so concurrent callers wait for one refresh
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
        }

        let token = self.exchange().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(REFRESH_MARGIN);
        tracing::info!(
            "Google access token for {} refreshed, valid {}s",
            self.key.client_email,
            token.expires_in
        );

        let access_token = token.access_token;
        *cache = Some(CachedToken {
            access_token: access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(access_token)
    }

    fn assertion(&self) -> Result<String, GoogleAuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: SCOPES.to_string(),
            aud: self.key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding)
            .map_err(|e| GoogleAuthError::TokenExchange(format!("cannot sign assertion: {}", e)))
    }

    async fn exchange(&self) -> Result<TokenResponse, GoogleAuthError> {
        let assertion = self.assertion()?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| GoogleAuthError::TokenExchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleAuthError::TokenExchange(format!(
                "{} returned {}: {}",
                self.key.token_uri,
                status.as_u16(),
                body.chars().take(300).collect::<String>()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| GoogleAuthError::TokenExchange(format!("unexpected token response: {}", e)))
    }
}

/// One provider for the process when a Google-backed source or warehouse is configured
pub fn provider_from_config(config: &Config) -> anyhow::Result<Option<Arc<GoogleTokenProvider>>> {
    let needed = config.auth.source == UserSourceKind::Sheets
        || config.warehouse.backend == WarehouseKind::Bigquery;
    if !needed {
        return Ok(None);
    }

    let path = config
        .google
        .as_ref()
        .and_then(|g| g.credentials_path.as_deref())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "[google] credentials_path (or GOOGLE_APPLICATION_CREDENTIALS) is required for Sheets/BigQuery"
            )
        })?;

    let provider = GoogleTokenProvider::from_key_file(&resolve_path(path))?;
    tracing::info!("Google service account: {}", provider.client_email());
    Ok(Some(Arc::new(provider)))
}
