//! Authentication module for Firebase Cloud Messaging
//!
//! Access tokens are minted from a service account key with `yup-oauth2` and
//! cached until shortly before they expire. A static token can be configured
//! instead, which is what emulators and the tests use.

use std::path::Path;
use std::time::{Duration, Instant};

use jivbook_config::FirebaseConfig;
use tokio::sync::Mutex;
use tracing::{debug, info};
use yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator};

use crate::client::FirebaseError;

/// Scope required by both the FCM v1 API and the Instance ID API.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Google issues one-hour tokens; refresh ten minutes early.
const TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    fetched_at: Instant,
}

#[derive(Debug)]
enum Source {
    Static(String),
    ServiceAccount { key_path: String },
}

/// Hands out bearer tokens for the Firebase APIs.
#[derive(Debug)]
pub struct AccessTokenProvider {
    source: Source,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenProvider {
    /// A provider that always returns `token`.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: Source::Static(token.into()),
            cached: Mutex::new(None),
        }
    }

    /// A provider backed by the service account key at `key_path`.
    pub fn service_account(key_path: impl Into<String>) -> Self {
        Self {
            source: Source::ServiceAccount {
                key_path: key_path.into(),
            },
            cached: Mutex::new(None),
        }
    }

    /// Picks the token source from the configuration
    ///
    /// # Errors
    ///
    /// Returns `FirebaseError::ConfigError` when neither `access_token` nor
    /// `key_path` is set.
    pub fn from_config(config: &FirebaseConfig) -> Result<Self, FirebaseError> {
        if let Some(token) = config.access_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Self::fixed(token));
        }
        match config.key_path.as_deref().filter(|p| !p.is_empty()) {
            Some(key_path) => Ok(Self::service_account(key_path)),
            None => Err(FirebaseError::ConfigError(
                "Missing key_path in FirebaseConfig".to_string(),
            )),
        }
    }

    /// Returns a valid bearer token, minting a new one when the cached token is stale.
    pub async fn token(&self) -> Result<String, FirebaseError> {
        let key_path = match &self.source {
            Source::Static(token) => return Ok(token.clone()),
            Source::ServiceAccount { key_path } => key_path,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.fetched_at.elapsed() < TOKEN_TTL {
                return Ok(token.value.clone());
            }
            debug!("Cached Firebase access token is stale, refreshing");
        }

        let value = fetch_service_account_token(key_path).await?;
        info!("Obtained new Firebase access token");
        *cached = Some(CachedToken {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }
}

async fn fetch_service_account_token(key_path: &str) -> Result<String, FirebaseError> {
    let sa_key = read_service_account_key(Path::new(key_path))
        .await
        .map_err(|e| FirebaseError::AuthError(format!("Cannot read service account key: {}", e)))?;

    let auth = ServiceAccountAuthenticator::builder(sa_key)
        .build()
        .await
        .map_err(|e| FirebaseError::AuthError(e.to_string()))?;

    let auth_token = auth
        .token(&[FCM_SCOPE])
        .await
        .map_err(|e| FirebaseError::AuthError(e.to_string()))?;

    auth_token
        .token()
        .map(str::to_string)
        .ok_or_else(|| FirebaseError::AuthError("No token available".to_string()))
}
